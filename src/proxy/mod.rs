// Outbound clients used by the gateway

pub mod downstream_client;
pub mod identity_client;

pub use downstream_client::{
    DownstreamClient, DownstreamService, ForwardRequest, ForwardResponse, HttpDownstreamClient,
};
pub use identity_client::{HttpIdentityClient, IdentityClient, LocalIdentityClient};
