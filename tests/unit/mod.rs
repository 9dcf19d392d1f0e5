#[path = "../common/mod.rs"]
mod common;

pub mod api;
