//! Session handle: restoration, login and logout
//!
//! [`Session`] is the one object the rest of the client holds to ask "am I
//! signed in" and to act on the answer. It is cheap to clone; every clone
//! shares the same store, state and reissue guard.

use crate::claims::{UserId, user_id_from_token};
use crate::config::SessionConfig;
use crate::coordinator::ReissueCoordinator;
use crate::error::{SessionError, SessionResult};
use crate::issuer::TokenIssuer;
use crate::scheduler::RefreshScheduler;
use crate::state::{SessionSnapshot, SessionState, SessionStatus};
use crate::token::TokenStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of startup restoration
#[derive(Debug)]
pub struct Restoration {
    /// Status right after restoration
    pub status: SessionStatus,
    /// Background verification of an existing token, if one was started
    pub background_reissue: Option<JoinHandle<bool>>,
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    issuer: Arc<dyn TokenIssuer>,
    store: Option<TokenStore>,
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            issuer,
            store: None,
            config: SessionConfig::default(),
        }
    }

    /// Use `store` instead of an in-memory store
    #[must_use]
    pub fn store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> SessionResult<Session> {
        self.config.validate()?;

        let store = self.store.unwrap_or_else(TokenStore::in_memory);
        let state = SessionState::new();
        let coordinator = ReissueCoordinator::new(
            store.clone(),
            state.clone(),
            Arc::clone(&self.issuer),
            self.config.contention,
        );

        Ok(Session {
            store,
            state,
            coordinator,
            issuer: self.issuer,
            config: self.config,
        })
    }
}

/// Shared client session
#[derive(Clone)]
pub struct Session {
    store: TokenStore,
    state: SessionState,
    coordinator: ReissueCoordinator,
    issuer: Arc<dyn TokenIssuer>,
    config: SessionConfig,
}

impl Session {
    pub fn builder(issuer: Arc<dyn TokenIssuer>) -> SessionBuilder {
        SessionBuilder::new(issuer)
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn coordinator(&self) -> &ReissueCoordinator {
        &self.coordinator
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.snapshot().status()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.snapshot().user_id()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Token to attach to the next outgoing request
    pub fn access_token(&self) -> Option<String> {
        self.store.get()
    }

    /// Whether the stored token is within the configured refresh threshold of expiring
    pub fn is_near_expiry(&self) -> bool {
        self.store.is_near_expiry(
            &self.config.expiry_policy(),
            self.config.refresh_threshold(),
        )
    }

    /// Reissue the access token through the shared single-flight guard
    pub async fn reissue(&self, force_logout_on_failure: bool) -> bool {
        self.coordinator.reissue(force_logout_on_failure).await
    }

    /// Restore the session at startup
    ///
    /// A stored token is trusted immediately and verified in the background;
    /// without one, the refresh credential decides the outcome before this
    /// returns.
    pub async fn restore(&self) -> Restoration {
        if let Some(token) = self.store.get() {
            let user_id = user_id_from_token(&token);
            self.state.set_authenticated(user_id);
            debug!(user_id = ?user_id, "Restored session from stored token");

            let coordinator = self.coordinator.clone();
            let background = tokio::spawn(async move { coordinator.reissue(false).await });

            return Restoration {
                status: SessionStatus::Authenticated,
                background_reissue: Some(background),
            };
        }

        if !self.coordinator.reissue(true).await
            && self.status() == SessionStatus::Unknown
        {
            // Dropped under contention without ever reaching the network.
            self.state.set_unauthenticated();
        }

        Restoration {
            status: self.status(),
            background_reissue: None,
        }
    }

    /// Record a token obtained from a login call
    ///
    /// A reissue still in flight from before the login is discarded.
    pub fn login(&self, token: impl Into<String>) -> SessionResult<()> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        self.coordinator.invalidate();
        let record = self.store.set(token)?;
        let user_id = user_id_from_token(&record.access_token);
        self.state.set_authenticated(user_id);
        info!(user_id = ?user_id, "Logged in");
        Ok(())
    }

    /// End the session
    ///
    /// The server-side logout is best effort; local state is cleared whatever
    /// the server says.
    pub async fn logout(&self) {
        self.coordinator.invalidate();
        if let Err(e) = self.issuer.revoke().await {
            warn!("Logout request failed: {}", e);
        }
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear access token: {}", e);
        }
        self.state.set_unauthenticated();
        info!("Logged out");
    }

    /// Start the periodic near-expiry check
    pub fn spawn_refresh_scheduler(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        RefreshScheduler::new(self.clone()).spawn(shutdown)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.snapshot())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
