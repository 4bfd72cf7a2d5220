use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beacon_core::CoreError;
use beacon_events::NotifyError;
use serde_json::json;

/// Caller-facing error type of the proxy layer.
///
/// Domain failures are classified from [`CoreError`] through the `From`
/// impl. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Payload larger than declared or than the store can hold.
    #[error("{0}")]
    EntityTooLarge(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The backing store refused the write.
    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),

    /// Emitting the audit notification itself failed.
    #[error(transparent)]
    Notification(#[from] NotifyError),
}

/// Convenience type alias for proxy return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::SizeMismatch { .. } | CoreError::StorageFull(_) => {
                Self::EntityTooLarge(message)
            }
            CoreError::Duplicate(_) | CoreError::InvalidTransition { .. } => Self::Conflict(message),
            CoreError::Forbidden(_) => Self::Forbidden(message),
            CoreError::NotFound { .. } => Self::NotFound(message),
            CoreError::StorageWriteDenied(_) => Self::ServiceUnavailable(message),
            CoreError::Invalid(_) => Self::BadRequest(message),
            CoreError::NotImplemented(_) | CoreError::Internal(_) => Self::Internal(message),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EntityTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EntityTooLarge(_) => "ENTITY_TOO_LARGE",
            Self::Conflict(_) => "CONFLICT",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) | Self::Notification(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
            Self::Notification(err) => {
                tracing::error!(error = %err, "Notification error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "code": self.code(),
        });

        (self.status_code(), axum::Json(body)).into_response()
    }
}
