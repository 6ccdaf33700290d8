//! Seam between the session and the backend's token endpoints

use crate::error::IssueError;
use async_trait::async_trait;

/// Remote side of the session: exchanges the ambient refresh credential for a
/// new access token and revokes the server-side session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Ask the backend for a fresh access token
    async fn reissue(&self) -> Result<String, IssueError>;

    /// Invalidate the server-side session
    async fn revoke(&self) -> Result<(), IssueError>;
}
