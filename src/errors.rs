use crate::services::resource_service::ResourceError;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for 401 Unauthorized
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<ResourceError> for AppError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Validation(err) => AppError::bad_request(err.to_string()),
            ResourceError::NotFound(msg) => AppError::new(StatusCode::NOT_FOUND, msg),
            ResourceError::AlreadyExists(msg) => AppError::new(StatusCode::CONFLICT, msg),
            ResourceError::Storage(err) => {
                tracing::error!("storage failure: {}", err);
                AppError::internal("storage backend failure")
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{paths::validator::ValidationError, storage::client::StorageError};

    #[test]
    fn test_resource_errors_map_to_statuses() {
        let cases = [
            (
                ResourceError::Validation(ValidationError::new("path", "must not be blank")),
                StatusCode::BAD_REQUEST,
            ),
            (ResourceError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ResourceError::AlreadyExists("dup".into()), StatusCode::CONFLICT),
            (
                ResourceError::Storage(StorageError::BucketNotFound("user-files".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn test_validation_message_is_kept() {
        let err = AppError::from(ResourceError::Validation(ValidationError::new(
            "path",
            "must not be blank",
        )));
        assert_eq!(err.message, "path must not be blank");
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let err = AppError::from(ResourceError::Storage(StorageError::InvalidObjectKey(
            "user-x-files/secret".into(),
        )));
        assert!(!err.message.contains("secret"));
    }
}
