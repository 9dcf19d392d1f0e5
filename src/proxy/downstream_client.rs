// HTTP forwarding from the gateway to downstream services

use crate::core::errors::FinplanError;
use crate::core::models::UserId;
use crate::downstream::FORWARDED_USER_HEADER;
use async_trait::async_trait;
use axum::http::{header, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

/// Services that sit behind the edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamService {
    Users,
    Transactions,
}

impl DownstreamService {
    pub fn name(&self) -> &'static str {
        match self {
            DownstreamService::Users => "user-service",
            DownstreamService::Transactions => "transaction-service",
        }
    }
}

impl fmt::Display for DownstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the gateway passes on from an inbound request
///
/// Only the method, path, body and content type travel; client headers do not.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub path_and_query: String,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Downstream answer relayed back to the client as-is
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Calls a downstream service on behalf of a verified user
#[async_trait]
pub trait DownstreamClient: Send + Sync {
    async fn forward(
        &self,
        service: DownstreamService,
        request: ForwardRequest,
        subject: &UserId,
    ) -> Result<ForwardResponse, FinplanError>;
}

/// reqwest-backed forwarder with one base URL per service
pub struct HttpDownstreamClient {
    http_client: Client,
    users_url: String,
    transactions_url: String,
    timeout: Duration,
}

impl HttpDownstreamClient {
    pub fn new(users_url: &str, transactions_url: &str, timeout: Duration) -> Result<Self, FinplanError> {
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
            users_url: users_url.trim_end_matches('/').to_string(),
            transactions_url: transactions_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn base_url(&self, service: DownstreamService) -> &str {
        match service {
            DownstreamService::Users => &self.users_url,
            DownstreamService::Transactions => &self.transactions_url,
        }
    }
}

#[async_trait]
impl DownstreamClient for HttpDownstreamClient {
    async fn forward(
        &self,
        service: DownstreamService,
        request: ForwardRequest,
        subject: &UserId,
    ) -> Result<ForwardResponse, FinplanError> {
        let url = format!("{}{}", self.base_url(service), request.path_and_query);
        debug!(
            service = %service,
            method = %request.method,
            url = %url,
            user_id = %subject,
            "Forwarding request downstream"
        );

        let mut builder = self
            .http_client
            .request(request.method, &url)
            .header(FORWARDED_USER_HEADER, subject.to_string())
            .body(request.body);
        if let Some(content_type) = request.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        let response = builder.send().await.map_err(|e| {
            let err = if e.is_timeout() {
                FinplanError::Timeout {
                    service: service.name().to_string(),
                    secs: self.timeout.as_secs(),
                }
            } else {
                FinplanError::DependencyFailure {
                    service: service.name().to_string(),
                    error: e.to_string(),
                }
            };
            error!(error = %err, url = %url, "Downstream call failed");
            err
        })?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read downstream response body");
            FinplanError::DependencyFailure {
                service: service.name().to_string(),
                error: e.to_string(),
            }
        })?;

        Ok(ForwardResponse {
            status,
            content_type,
            body,
        })
    }
}
