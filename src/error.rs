//! Unified error type.

use std::time::Duration;

use http::StatusCode;

/// Boxed error carried by request bodies of any origin.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by tsu-bridge's fallible operations.
///
/// Handlers return `Result<(), Error>`. When an error reaches the end of the
/// handler chain the router turns it into a response: [`Error::Status`]
/// keeps its status code, every other variant becomes `500`.
///
/// Contract violations (unwrapping a foreign context, registering an invalid
/// route) are not represented here. They panic.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("body: {0}")]
    Body(BoxError),

    #[error("multipart: {0}")]
    Multipart(#[from] multer::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP-level failure raised on purpose by a handler.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Shorthand for [`Error::Status`].
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status { status, message: message.into() }
    }

    /// The status code the router answers with when this error ends a chain.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
