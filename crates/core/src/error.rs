//! Session error types

/// Standard result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Errors raised by the token store and session configuration
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Token storage failed: {message}")]
    Storage { message: String },

    #[error("Access token is empty")]
    EmptyToken,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// Outcome of a failed call against the token endpoints
///
/// These never reach application code: the reissue coordinator logs them and
/// reports a plain `false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssueError {
    /// The endpoint answered with a non-success status
    #[error("Token endpoint rejected the request with status {status}")]
    Rejected { status: u16 },

    /// The request never produced a response
    #[error("Token endpoint unreachable: {0}")]
    Transport(String),

    /// A success response without an access token in it
    #[error("Token endpoint response did not contain an access token")]
    MissingToken,
}
