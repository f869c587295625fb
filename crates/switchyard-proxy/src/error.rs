//! HTTP error mapping.
//!
//! Every error the proxy itself produces is rendered as `{"error": "..."}`.
//! Internal failures are logged with their detail and rendered with a fixed
//! message so nothing internal leaks to the client.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use switchyard_core::TargetError;
use thiserror::Error;
use tracing::error;

use crate::forward::ForwardError;

/// Message returned for every internal failure.
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Proxy-level HTTP error.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad request (invalid input).
    #[error("{0}")]
    BadRequest(String),

    /// No route matched.
    #[error("Not found")]
    NotFound,

    /// The method is not one the proxy forwards.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Internal failure; the detail is logged only.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            Self::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
            Self::Internal(detail) => {
                error!(error = %detail, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE)
            }
        };

        let mut response = (status, axum::Json(ErrorBody { error: message })).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response.headers_mut().insert(
                header::ALLOW,
                HeaderValue::from_static("GET, POST, PUT, DELETE"),
            );
        }
        response
    }
}

impl From<TargetError> for HttpError {
    fn from(err: TargetError) -> Self {
        match err {
            TargetError::UnknownTarget(_) => Self::BadRequest(err.to_string()),
            TargetError::Activation(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<ForwardError> for HttpError {
    fn from(err: ForwardError) -> Self {
        Self::Internal(err.to_string())
    }
}
