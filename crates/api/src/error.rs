//! API error type and its HTTP rendering
//!
//! Every variant maps to a fixed status and a fixed client message. Detail
//! carried by `Internal` is logged server-side and never serialized.

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },

    /// Missing cookie, malformed token, bad signature, expired token or
    /// invalid claims. Deliberately one kind on the wire.
    #[error("Authentication required")]
    Unauthenticated,

    /// Valid token whose account no longer exists
    #[error("Account not found")]
    IdentityNotFound,

    /// Login failure: unknown email or wrong password
    #[error("Invalid email or password")]
    CredentialMismatch,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string())
            }
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            ApiError::IdentityNotFound => (StatusCode::NOT_FOUND, "Account not found".to_string()),
            ApiError::CredentialMismatch => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        let mut response = (status, body).into_response();

        if let ApiError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(format!("Store error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn error_response(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_internal_hides_details() {
        let (status, body) = error_response(ApiError::Internal(
            "connection refused at 10.0.0.5:5432".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body["error"].as_str().unwrap().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let (status, body) = error_response(ApiError::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
        assert_eq!(body["code"], 401);
    }

    #[tokio::test]
    async fn test_credential_mismatch_is_generic() {
        let (status, body) = error_response(ApiError::CredentialMismatch).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_identity_not_found() {
        let (status, _) = error_response(ApiError::IdentityNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after: Duration::from_secs(42),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_from_store_error() {
        let err = ApiError::from(StoreError::Unavailable("pool timed out".to_string()));
        match err {
            ApiError::Internal(msg) => assert!(msg.contains("Store error")),
            _ => panic!("Expected Internal variant"),
        }
    }
}
