// Response types shared by the gateway and the identity service

use crate::core::errors::{AuthError, EdgeRejection, FinplanError, PublicError};
use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `Json` whose rejections use the public error body
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Public error category; absent on edge rejections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
}

/// Body of GET /api/v1/me
#[derive(Debug, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub user_id: String,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<&'static str>,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            code: None,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn from_public_error(err: &PublicError) -> Self {
        Self {
            status: status_from_u16(err.status_code()),
            message: err.user_message(),
            code: Some(err.code()),
            request_id: None,
        }
    }

    pub fn from_edge_rejection(rejection: EdgeRejection) -> Self {
        Self::new(status_from_u16(rejection.status_code()), rejection.user_message())
    }

    pub fn from_finplan_error(err: &FinplanError) -> Self {
        Self::new(status_from_u16(err.status_code()), err.user_message())
    }
}

fn status_from_u16(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code.map(str::to_string),
            request_id: self.request_id,
        });
        (self.status, body).into_response()
    }
}

impl From<PublicError> for ApiError {
    fn from(err: PublicError) -> Self {
        ApiError::from_public_error(&err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::from_public_error(&err.publicize())
    }
}

impl From<EdgeRejection> for ApiError {
    fn from(rejection: EdgeRejection) -> Self {
        ApiError::from_edge_rejection(rejection)
    }
}

impl From<FinplanError> for ApiError {
    fn from(err: FinplanError) -> Self {
        ApiError::from_finplan_error(&err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string());
        }
        ApiError::from_public_error(&PublicError::InvalidInput(rejection.body_text()))
    }
}
