// Identity as seen by services behind the gateway
//
// Services here do not verify tokens. They accept the subject the gateway
// forwarded, which is only sound on a trusted network path between the two.

use crate::api::responses::ApiError;
use crate::core::errors::EdgeRejection;
use crate::core::models::UserId;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use tracing::warn;

/// Header carrying the verified subject from the gateway to downstream services
pub const FORWARDED_USER_HEADER: &str = "x-finplan-user-id";

/// The caller's user id, as asserted by the gateway
///
/// Use as a handler argument in a downstream service:
///
/// ```ignore
/// async fn balance(TrustedIdentity(user_id): TrustedIdentity) -> String {
///     user_id.to_string()
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedIdentity(pub UserId);

impl TrustedIdentity {
    pub fn user_id(&self) -> UserId {
        self.0
    }

    /// Read the forwarded subject from a header map
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(FORWARDED_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::parse(s.trim()))
            .map(TrustedIdentity)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TrustedIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        TrustedIdentity::from_headers(&parts.headers).ok_or_else(|| {
            warn!(path = %parts.uri.path(), "Request arrived without a forwarded identity");
            ApiError::from(EdgeRejection::MissingAuthHeader)
        })
    }
}
