//! Gather HTTP client

pub mod auth;
pub mod categories;
pub mod cookies;
pub mod error;
pub mod gatherings;
pub mod images;
mod interceptor;
pub mod issuer;
pub mod users;

use cookies::CookieJar;
use error::ClientError;
use gather_core::{Session, SessionConfig, TokenStore};
use issuer::HttpTokenIssuer;
use reqwest::{Client, ClientBuilder, Response};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("gather-client/", env!("CARGO_PKG_VERSION"));

/// Gather API client
///
/// Every request made through [`GatherClient::execute`] and friends carries
/// the session's access token, and a 401 triggers one reissue-and-retry.
#[derive(Clone)]
pub struct GatherClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl GatherClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> GatherClientBuilder {
        GatherClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session shared by every request from this client
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Create a request builder for a path under the base URL
    ///
    /// The bearer token is attached when the request is sent, not here, so a
    /// request built before a reissue still goes out with the newest token.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Execute an authenticated request and decode the JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Execute an authenticated request whose response body is ignored
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        let response = self.send(request).await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Execute a request outside the session: no token, no reissue on 401
    pub async fn execute_public<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub(crate) async fn execute_public_empty(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(), ClientError> {
        let response = request.send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_response_body(status, &body))
        }
    }
}

impl std::fmt::Debug for GatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatherClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Builder for GatherClient
#[derive(Default)]
pub struct GatherClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    token_store: Option<TokenStore>,
    session_config: Option<SessionConfig>,
    cookie_jar: Option<CookieJar>,
}

impl GatherClientBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Persist the access token in `store` (in memory otherwise)
    #[must_use]
    pub fn token_store(mut self, store: TokenStore) -> Self {
        self.token_store = Some(store);
        self
    }

    #[must_use]
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = Some(config);
        self
    }

    /// Keep cookies in `jar` instead of a jar private to this client
    #[must_use]
    pub fn cookie_jar(mut self, jar: CookieJar) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<GatherClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url}: {e}")))?;

        let mut client_builder = match &self.cookie_jar {
            Some(jar) => ClientBuilder::new().cookie_provider(jar.provider()),
            None => ClientBuilder::new().cookie_store(true),
        };

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder
            .user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()));

        let client = client_builder.build()?;

        let issuer = Arc::new(HttpTokenIssuer::new(client.clone(), base_url.clone()));
        let mut session = Session::builder(issuer);
        if let Some(store) = self.token_store {
            session = session.store(store);
        }
        if let Some(config) = self.session_config {
            session = session.config(config);
        }

        Ok(GatherClient {
            client,
            base_url,
            session: session.build()?,
        })
    }
}
