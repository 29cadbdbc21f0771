use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bucketwatch_core::{ConfigStoreError, KeyError};
use bucketwatch_s3::StoreError;
use serde_json::json;

/// The error envelope every handler returns:
/// `{ "error": { "code": ..., "message": ... } }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidRequest", message)
    }

    pub fn not_found(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn unconfigured() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Unconfigured",
            StoreError::Unconfigured.to_string(),
        )
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NoSuchBucket(_) => {
                Self::new(StatusCode::NOT_FOUND, "NoSuchBucket", message)
            }
            StoreError::NoSuchKey(_) => Self::new(StatusCode::NOT_FOUND, "NoSuchKey", message),
            StoreError::BucketNotEmpty => {
                Self::new(StatusCode::CONFLICT, "BucketNotEmpty", message)
            }
            StoreError::Unconfigured => Self::unconfigured(),
            StoreError::InvalidAccessKey => {
                Self::new(StatusCode::BAD_GATEWAY, "InvalidAccessKeyId", message)
            }
            StoreError::SignatureMismatch => {
                Self::new(StatusCode::BAD_GATEWAY, "SignatureDoesNotMatch", message)
            }
            StoreError::Connection(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "ConnectionFailed", message)
            }
            StoreError::Timeout(_) => Self::new(StatusCode::BAD_GATEWAY, "Timeout", message),
            StoreError::Network(_) => Self::new(StatusCode::BAD_GATEWAY, "NetworkError", message),
            StoreError::Parse(_) => Self::new(StatusCode::BAD_GATEWAY, "InvalidResponse", message),
            StoreError::Api { code, .. } => Self::new(StatusCode::BAD_GATEWAY, &code, message),
        }
    }
}

impl From<ConfigStoreError> for ApiError {
    fn from(err: ConfigStoreError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ConfigError",
            err.to_string(),
        )
    }
}

impl From<KeyError> for ApiError {
    fn from(err: KeyError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidKey", err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}
