// Library root for the finplan identity boundary

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod downstream;
pub mod identity;
pub mod proxy;
pub mod store;
