//! API error taxonomy
//!
//! One enum covering every failure a request can surface, with its HTTP
//! mapping. Handlers convert module errors into this type and reject;
//! the rejection handler renders the JSON body.

use serde_json::json;
use thiserror::Error;
use warp::http::StatusCode;
use warp::Reply;

use crate::completion::CompletionError;
use crate::csv::CsvError;
use crate::dataset::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or empty upload, missing required fields
    #[error("{0}")]
    InvalidInput(String),

    /// Unknown dataset or sample identifier
    #[error("{0} not found")]
    NotFound(String),

    /// Client exceeded the per-IP query window
    #[error("rate limit exceeded")]
    RateLimited { retry_after: u64 },

    /// The completion service exhausted retries or returned no text
    #[error("completion service failed: {message}")]
    Upstream { message: String, retryable: bool },

    /// Anything unexpected; details stay in the logs
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::InvalidInput(message) => json!({
                "error": message,
                "kind": "invalidInput",
            }),
            ApiError::NotFound(what) => json!({
                "error": format!("{} not found", what),
                "kind": "notFound",
            }),
            ApiError::RateLimited { retry_after } => json!({
                "error": "Rate limit exceeded. Please wait before making another request.",
                "kind": "rateLimited",
                "retryAfter": retry_after,
            }),
            ApiError::Upstream { message, retryable } => json!({
                "error": message,
                "kind": "upstreamFailure",
                "retryable": retryable,
            }),
            ApiError::Internal(_) => json!({
                "error": "internal server error",
                "kind": "internal",
            }),
        }
    }

    pub fn to_response(&self) -> warp::reply::Response {
        let mut response =
            warp::reply::with_status(warp::reply::json(&self.body()), self.status())
                .into_response();
        if let ApiError::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(warp::http::header::RETRY_AFTER, (*retry_after).into());
        }
        response
    }
}

impl From<CsvError> for ApiError {
    fn from(error: CsvError) -> Self {
        ApiError::InvalidInput(error.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        // Capacity exhaustion is a deployment problem, not a client one
        ApiError::Internal(error.to_string())
    }
}

impl From<CompletionError> for ApiError {
    fn from(error: CompletionError) -> Self {
        let retryable = error.is_transient();
        ApiError::Upstream {
            message: error.to_string(),
            retryable,
        }
    }
}

/// Wrapper carrying an `ApiError` through warp's rejection machinery.
#[derive(Debug)]
pub struct ApiReject(pub ApiError);

impl warp::reject::Reject for ApiReject {}

pub fn reject(error: ApiError) -> warp::Rejection {
    warp::reject::custom(ApiReject(error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::RateLimited { retry_after: 60 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Upstream {
                message: "x".into(),
                retryable: true
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_body_is_generic() {
        let body = ApiError::Internal("secret detail".into()).body();
        assert_eq!(body["error"], "internal server error");
    }

    #[test]
    fn test_rate_limited_body_carries_hint() {
        let body = ApiError::RateLimited { retry_after: 42 }.body();
        assert_eq!(body["retryAfter"], 42);
    }
}
