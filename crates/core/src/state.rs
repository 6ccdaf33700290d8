//! Observable session state
//!
//! The state lives in a `watch` channel so anything that renders or reacts to
//! "am I signed in" can subscribe instead of polling.

use crate::claims::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Whether the client currently holds a usable session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Startup restoration has not finished yet
    Unknown,
    Authenticated,
    Unauthenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of the session
///
/// A user id is only ever present on an authenticated snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    status: SessionStatus,
    user_id: Option<UserId>,
}

impl SessionSnapshot {
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            status: SessionStatus::Unknown,
            user_id: None,
        }
    }

    /// Signed in; `user_id` is `None` when the token subject could not be decoded
    #[must_use]
    pub const fn authenticated(user_id: Option<UserId>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            user_id,
        }
    }

    #[must_use]
    pub const fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            user_id: None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, SessionStatus::Authenticated)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Shared handle to the session state channel
#[derive(Debug, Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionState {
    /// Create state starting at `Unknown`
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::unknown());
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        *self.tx.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn set_authenticated(&self, user_id: Option<UserId>) {
        self.replace(SessionSnapshot::authenticated(user_id));
    }

    pub fn set_unauthenticated(&self) {
        self.replace(SessionSnapshot::unauthenticated());
    }

    fn replace(&self, next: SessionSnapshot) {
        let previous = self.tx.send_replace(next);
        if previous.status != next.status {
            info!(
                from = %previous.status,
                to = %next.status,
                user_id = ?next.user_id,
                "Session status changed"
            );
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unknown() {
        let state = SessionState::new();
        assert_eq!(state.snapshot(), SessionSnapshot::unknown());
        assert_eq!(state.snapshot().user_id(), None);
    }

    #[test]
    fn test_user_id_only_when_authenticated() {
        let state = SessionState::new();
        state.set_authenticated(Some(UserId(3)));
        assert!(state.snapshot().is_authenticated());
        assert_eq!(state.snapshot().user_id(), Some(UserId(3)));

        state.set_unauthenticated();
        assert_eq!(state.snapshot().status(), SessionStatus::Unauthenticated);
        assert_eq!(state.snapshot().user_id(), None);
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let state = SessionState::new();
        let mut rx = state.subscribe();

        state.set_authenticated(None);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().status(), SessionStatus::Authenticated);

        state.set_unauthenticated();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().status(), SessionStatus::Unauthenticated);
    }
}
