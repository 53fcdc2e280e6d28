/// Unified error types for the planning portal
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the portal
///
/// The first group of variants are the structured kinds callers see. The
/// second group are store and runtime faults; they always surface as
/// `internal` on the wire.
#[derive(Error, Debug)]
pub enum PortalError {
    /// Photographer-only operation called without a signed-in user
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Missing or malformed input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Project, token, section or step does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Wrong token, disabled token, locked section, foreign project
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Portal link past its expiry
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    ResourceExhausted { retry_after: std::time::Duration },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Externally visible error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    InvalidArgument,
    NotFound,
    PermissionDenied,
    DeadlineExceeded,
    ResourceExhausted,
    Internal,
}

impl ErrorKind {
    /// Wire code, in the style the client shell already parses
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::NotFound => "not-found",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::DeadlineExceeded => "deadline-exceeded",
            ErrorKind::ResourceExhausted => "resource-exhausted",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::DeadlineExceeded => StatusCode::GONE,
            ErrorKind::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl PortalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            PortalError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PortalError::NotFound(_) => ErrorKind::NotFound,
            PortalError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            PortalError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            PortalError::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            PortalError::Database(_)
            | PortalError::Migration(_)
            | PortalError::Serialization(_)
            | PortalError::Io(_)
            | PortalError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when SQLite reported a lock conflict and the whole transaction
    /// can be run again.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortalError::Database(sqlx::Error::Database(db_err)) => {
                let code_busy = db_err
                    .code()
                    .map(|code| matches!(code.as_ref(), "5" | "6" | "261" | "262" | "517"))
                    .unwrap_or(false);
                let message = db_err.message().to_lowercase();
                code_busy
                    || message.contains("database is locked")
                    || message.contains("database table is locked")
            }
            PortalError::Database(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            ErrorKind::ResourceExhausted => "Too many requests, slow down".to_string(),
            _ => match self {
                PortalError::Unauthenticated(msg)
                | PortalError::InvalidArgument(msg)
                | PortalError::NotFound(msg)
                | PortalError::PermissionDenied(msg)
                | PortalError::DeadlineExceeded(msg) => msg.clone(),
                _ => self.to_string(),
            },
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for PortalError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        PortalError::InvalidArgument(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for PortalError {
    fn from(errors: validator::ValidationErrors) -> Self {
        PortalError::InvalidArgument(errors.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert PortalError to HTTP response
impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match kind {
            ErrorKind::Internal => tracing::error!(error = %self, "request failed"),
            _ => tracing::warn!(code = kind.code(), error = %self, "request rejected"),
        }

        let mut response = (
            kind.status(),
            Json(ErrorResponse {
                error: kind.code().to_string(),
                message: self.public_message(),
            }),
        )
            .into_response();

        if let PortalError::ResourceExhausted { retry_after } = self {
            if let Ok(value) = retry_after.as_secs().max(1).to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
        }

        response
    }
}

/// Result type alias for portal operations
pub type PortalResult<T> = Result<T, PortalError>;
