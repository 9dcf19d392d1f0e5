// Gateway-side client for the identity service

use crate::api::responses::ErrorResponse;
use crate::auth::verifier::TokenVerifier;
use crate::core::errors::{AuthError, FinplanError, PublicError, TokenError};
use crate::core::models::{
    LoginRequest, RegisterRequest, TokenResponse, UserId, VerifyTokenRequest, VerifyTokenResponse,
};
use crate::identity::IdentityService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

const SERVICE_NAME: &str = "identity-service";

/// Identity operations as seen from the gateway
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<TokenResponse, PublicError>;

    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, PublicError>;

    async fn verify(&self, token: &str) -> Result<VerifyTokenResponse, PublicError>;
}

/// JSON-over-HTTP client for the identity service RPC surface
///
/// Every call is bounded by the client timeout; a call that does not finish
/// in time is an internal failure, never a success.
pub struct HttpIdentityClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpIdentityClient {
    /// Create a client for `base_url` (e.g. `http://identity:50051`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FinplanError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| {
                FinplanError::ConfigurationError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn call<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, PublicError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Calling identity service");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let err = if e.is_timeout() {
                    FinplanError::Timeout {
                        service: SERVICE_NAME.to_string(),
                        secs: self.timeout.as_secs(),
                    }
                } else {
                    FinplanError::DependencyFailure {
                        service: SERVICE_NAME.to_string(),
                        error: e.to_string(),
                    }
                };
                error!(error = %err, url = %url, "Identity service call failed");
                PublicError::Internal
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<ErrorResponse> = response.json().await.ok();
            let (code, message) = body
                .map(|b| (b.code, b.error))
                .unwrap_or((None, String::new()));
            let err = PublicError::from_wire(code.as_deref(), status.as_u16(), &message);
            if matches!(err, PublicError::Internal) {
                warn!(status = %status, url = %url, "Identity service reported an internal failure");
            }
            return Err(err);
        }

        response.json::<Resp>().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to parse identity service response");
            PublicError::Internal
        })
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn register(&self, request: &RegisterRequest) -> Result<TokenResponse, PublicError> {
        self.call("/rpc/auth/register", request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, PublicError> {
        self.call("/rpc/auth/login", request).await
    }

    async fn verify(&self, token: &str) -> Result<VerifyTokenResponse, PublicError> {
        let request = VerifyTokenRequest {
            token: token.to_string(),
        };
        self.call("/rpc/auth/verify", &request).await
    }
}

#[async_trait]
impl TokenVerifier for HttpIdentityClient {
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let response = self.verify(token).await.map_err(|e| match e {
            PublicError::Unauthenticated => AuthError::InvalidToken(TokenError::Rejected),
            other => AuthError::Internal(format!("{} call failed: {}", SERVICE_NAME, other)),
        })?;
        subject_of(response)
    }
}

/// Identity service running in the same process
pub struct LocalIdentityClient {
    service: IdentityService,
}

impl LocalIdentityClient {
    pub fn new(service: IdentityService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl IdentityClient for LocalIdentityClient {
    async fn register(&self, request: &RegisterRequest) -> Result<TokenResponse, PublicError> {
        self.service
            .register(&request.email, &request.password, &request.name)
            .await
            .map(|token| TokenResponse { token })
            .map_err(|e| e.publicize())
    }

    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, PublicError> {
        self.service
            .login(&request.email, &request.password)
            .await
            .map(|token| TokenResponse { token })
            .map_err(|e| e.publicize())
    }

    async fn verify(&self, token: &str) -> Result<VerifyTokenResponse, PublicError> {
        self.service
            .verify_token(token)
            .map(|subject| VerifyTokenResponse {
                valid: true,
                subject_id: subject.to_string(),
            })
            .map_err(|e| e.publicize())
    }
}

#[async_trait]
impl TokenVerifier for LocalIdentityClient {
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        self.service.verify_token(token)
    }
}

/// A verification answer only counts if it says valid and names a user id
fn subject_of(response: VerifyTokenResponse) -> Result<UserId, AuthError> {
    if !response.valid {
        return Err(AuthError::InvalidToken(TokenError::Rejected));
    }
    UserId::parse(&response.subject_id).ok_or_else(|| AuthError::from(TokenError::MissingSubject))
}
