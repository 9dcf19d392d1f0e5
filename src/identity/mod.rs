// Identity service: business rules and RPC surface

pub mod handlers;
pub mod service;

pub use handlers::create_identity_router;
pub use service::IdentityService;
