// Core domain: errors, models, token and password crypto

pub mod crypto;
pub mod errors;
pub mod models;
pub mod password;
