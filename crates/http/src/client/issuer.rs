//! Token endpoints over HTTP
//!
//! These calls go out raw: no bearer token and no 401 handling. The refresh
//! credential travels as an HTTP-only cookie in the client's cookie jar.

use crate::types::AccessTokenResponse;
use async_trait::async_trait;
use gather_core::{IssueError, TokenIssuer};
use reqwest::Client;
use tracing::debug;

const REISSUE_PATH: &str = "/api/v1/auth/reissue";
const LOGOUT_PATH: &str = "/api/v1/auth/logout";

/// [`TokenIssuer`] backed by the Gather auth endpoints
#[derive(Debug, Clone)]
pub struct HttpTokenIssuer {
    client: Client,
    base_url: String,
}

impl HttpTokenIssuer {
    /// `client` should be the same cookie-carrying client used for API calls
    pub const fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn post(&self, path: &str) -> Result<reqwest::Response, IssueError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| IssueError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            debug!(path, status = status.as_u16(), "Token endpoint rejected request");
            Err(IssueError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn reissue(&self) -> Result<String, IssueError> {
        let response = self.post(REISSUE_PATH).await?;
        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|_| IssueError::MissingToken)?;
        body.access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or(IssueError::MissingToken)
    }

    async fn revoke(&self) -> Result<(), IssueError> {
        self.post(LOGOUT_PATH).await.map(|_| ())
    }
}
