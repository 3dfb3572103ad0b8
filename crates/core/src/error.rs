//! Error types for the FileChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// Failures of the completion call. All of them end up as conversational
/// text; the variants only shape the message.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of session-level actions, as seen by the host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {0} is still processing the previous turn")]
    Busy(String),

    #[error("Unsupported file type: {name} (accepted: {accepted})")]
    UnsupportedUpload { name: String, accepted: String },

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}
