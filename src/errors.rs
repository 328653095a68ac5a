use actix_web::{
    HttpResponse, ResponseError,
    error::BlockingError,
    http::{StatusCode, header},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    /// Any kind of IO errors
    #[error("{0}\ncaused by: {1}")]
    IoError(String, std::io::Error),

    /// The listener could not be bound to the requested address
    #[error("Failed to bind server to {0}\ncaused by: {1}")]
    BindError(String, std::io::Error),

    /// Configuration validation errors with detailed context
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(ConfigValidationError),
}

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    /// Invalid root directory or access issues
    #[error("Path '{path}' is invalid: {reason}.\nSuggestion: {suggestion}")]
    PathError {
        path: String,
        reason: String,
        suggestion: String,
    },

    /// Upload/body size limits that cannot work
    #[error("Upload configuration error: {reason}.\nSuggestion: {suggestion}")]
    UploadError { reason: String, suggestion: String },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Bad path syntax, missing parameters, invalid base64 and similar
    #[error("{0}")]
    MalformedRequest(String),

    /// Path escapes the root or targets something that must not be touched
    #[error("{0}")]
    AccessDenied(String),

    /// Operating on a path that does not exist
    #[error("{0}")]
    NotFound(String),

    /// HTTP method with no matching action
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Request body exceeds the configured ceiling
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Might occur during file upload, when processing the multipart request fails
    #[error("Failed to process multipart upload request: {0}")]
    MultipartError(String),

    /// Unexpected I/O failure while performing an operation
    #[error("I/O operation failed: {operation}\nPath: {path}\nCaused by: {source}")]
    IoError {
        operation: String,
        path: String,
        source: std::io::Error,
    },
}

impl RuntimeError {
    pub fn io(
        operation: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        source: std::io::Error,
    ) -> Self {
        Self::IoError {
            operation: operation.into(),
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Message safe to hand back to the client.
    ///
    /// Internal failures only expose the operation that failed, never the local path or cause.
    pub fn public_message(&self) -> String {
        match self {
            Self::IoError { operation, .. } => format!("Error {operation}"),
            other => other.to_string(),
        }
    }
}

impl From<BlockingError> for RuntimeError {
    fn from(e: BlockingError) -> Self {
        Self::IoError {
            operation: "running filesystem task".to_string(),
            path: String::new(),
            source: std::io::Error::other(e.to_string()),
        }
    }
}

impl ResponseError for RuntimeError {
    fn status_code(&self) -> StatusCode {
        use RuntimeError as E;
        use StatusCode as S;
        match self {
            E::MalformedRequest(_) => S::BAD_REQUEST,
            E::AccessDenied(_) => S::FORBIDDEN,
            E::NotFound(_) => S::NOT_FOUND,
            E::MethodNotAllowed => S::METHOD_NOT_ALLOWED,
            E::PayloadTooLarge(_) => S::PAYLOAD_TOO_LARGE,
            E::MultipartError(_) => S::BAD_REQUEST,
            E::IoError { .. } => S::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        log_error_chain(self);

        HttpResponse::build(self.status_code())
            .insert_header((header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref()))
            .body(self.public_message())
    }
}

/// Logs a runtime error at a level matching its class.
///
/// Internal errors carry a multi-line cause, each line is logged on its own.
pub fn log_error_chain(error: &RuntimeError) {
    match error {
        RuntimeError::IoError { .. } => {
            for cause in error.to_string().lines() {
                log::error!("{cause}");
            }
        }
        RuntimeError::AccessDenied(msg) => log::warn!("Access denied: {msg}"),
        other => log::debug!("Request rejected: {other}"),
    }
}

/// Log configuration validation failures with structured context
pub fn log_validation_failure(error: &ConfigValidationError, context: &str) {
    match error {
        ConfigValidationError::PathError { path, reason, .. } => {
            log::error!(
                "Configuration validation failed in {context}: Path error for '{path}' - {reason}"
            );
        }
        ConfigValidationError::UploadError { reason, .. } => {
            log::error!("Configuration validation failed in {context}: Upload error - {reason}");
        }
    }
}
