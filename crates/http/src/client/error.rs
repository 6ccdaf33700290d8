//! Client error types

use gather_core::SessionError;
use serde::Deserialize;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed, after any reissue attempt
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict, e.g. joining a full or already-joined gathering
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Cookie jar could not be saved
    #[error("Cookie jar error: {0}")]
    CookieJar(String),

    /// Local session storage failed
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Error envelope returned by the backend: `{"error": {"code", "message"}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Create error from a status and the raw response body
    ///
    /// The backend's error envelope is unwrapped to its message (prefixed with
    /// the error code when present); other bodies are used verbatim.
    pub fn from_response_body(status: reqwest::StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error:
                    ErrorBody {
                        code: Some(code),
                        message: Some(message),
                    },
            }) => format!("{code}: {message}"),
            Ok(ErrorEnvelope {
                error:
                    ErrorBody {
                        message: Some(message),
                        ..
                    },
            }) => message,
            _ if body.trim().is_empty() => status.to_string(),
            _ => body.to_string(),
        };
        Self::from_status(status, message)
    }

    /// Whether the failure means the session is no longer valid
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::ServerError { status, .. } => Some(*status),
            Self::AuthenticationFailed(_) => Some(401),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::Serialization(_)
            | Self::Configuration(_)
            | Self::CookieJar(_)
            | Self::Session(_) => None,
        }
    }
}
