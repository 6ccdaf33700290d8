//! Single-flight access-token reissue
//!
//! At most one reissue round trip runs at a time. The round trip executes on
//! its own task, so a caller that gives up waiting cannot leave the in-flight
//! slot occupied; the slot is cleared in the same critical section that
//! applies the result to the store and session state.
//!
//! Login and logout advance the session epoch. A round trip that started in
//! an earlier epoch finishes without touching the store or the state.

use crate::claims::{UserId, user_id_from_token};
use crate::config::ContentionPolicy;
use crate::issuer::TokenIssuer;
use crate::state::SessionState;
use crate::token::TokenStore;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Result of a reissue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReissueOutcome {
    /// A new token was stored
    Reissued { user_id: Option<UserId> },
    /// No token was obtained, or the request was dropped under contention
    Failed,
}

impl ReissueOutcome {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Reissued { .. })
    }
}

type SharedOutcome = Shared<BoxFuture<'static, ReissueOutcome>>;

struct InFlight {
    outcome: SharedOutcome,
    /// Set by any participant that wants a failure to end the session
    force_logout: Arc<AtomicBool>,
}

type Slot = Arc<Mutex<Option<InFlight>>>;

fn lock_slot(slot: &Mutex<Option<InFlight>>) -> MutexGuard<'_, Option<InFlight>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight slot if the reissue task unwinds before finishing
struct SlotRelease {
    slot: Slot,
    armed: bool,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        if self.armed {
            *lock_slot(&self.slot) = None;
        }
    }
}

/// Coordinates access-token reissue against the token store and session state
#[derive(Clone)]
pub struct ReissueCoordinator {
    store: TokenStore,
    state: SessionState,
    issuer: Arc<dyn TokenIssuer>,
    contention: ContentionPolicy,
    in_flight: Slot,
    epoch: Arc<AtomicU64>,
}

impl ReissueCoordinator {
    pub fn new(
        store: TokenStore,
        state: SessionState,
        issuer: Arc<dyn TokenIssuer>,
        contention: ContentionPolicy,
    ) -> Self {
        Self {
            store,
            state,
            issuer,
            contention,
            in_flight: Arc::new(Mutex::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a new session epoch
    ///
    /// Called before the session is replaced by a login or logout, so that a
    /// round trip already in flight discards its result instead of applying
    /// it over the new session.
    pub fn invalidate(&self) {
        let _slot = lock_slot(&self.in_flight);
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether a reissue round trip is currently running
    pub fn is_in_flight(&self) -> bool {
        lock_slot(&self.in_flight).is_some()
    }

    /// Reissue the access token, returning whether a new token was stored
    ///
    /// With `force_logout_on_failure` a failed attempt clears the stored token
    /// and marks the session unauthenticated; otherwise the existing token and
    /// state are left as they are.
    pub async fn reissue(&self, force_logout_on_failure: bool) -> bool {
        self.reissue_outcome(force_logout_on_failure)
            .await
            .is_success()
    }

    /// Like [`reissue`](Self::reissue) but reports the decoded user on success
    pub async fn reissue_outcome(&self, force_logout_on_failure: bool) -> ReissueOutcome {
        let outcome = {
            let mut slot = lock_slot(&self.in_flight);
            match (slot.as_ref(), self.contention) {
                (Some(_), ContentionPolicy::Drop) => {
                    debug!("Token reissue already in flight, dropping request");
                    return ReissueOutcome::Failed;
                }
                (Some(in_flight), ContentionPolicy::Join) => {
                    debug!("Token reissue already in flight, joining");
                    if force_logout_on_failure {
                        in_flight.force_logout.store(true, Ordering::SeqCst);
                    }
                    in_flight.outcome.clone()
                }
                (None, _) => {
                    let force_logout = Arc::new(AtomicBool::new(force_logout_on_failure));
                    let task = tokio::spawn(run_reissue(
                        self.store.clone(),
                        self.state.clone(),
                        Arc::clone(&self.issuer),
                        Arc::clone(&self.in_flight),
                        Arc::clone(&force_logout),
                        Epoch {
                            current: Arc::clone(&self.epoch),
                            started: self.epoch.load(Ordering::SeqCst),
                        },
                    ));
                    let outcome = async move {
                        task.await.unwrap_or_else(|e| {
                            warn!("Token reissue task aborted: {}", e);
                            ReissueOutcome::Failed
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(InFlight {
                        outcome: outcome.clone(),
                        force_logout,
                    });
                    outcome
                }
            }
        };

        outcome.await
    }
}

impl std::fmt::Debug for ReissueCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReissueCoordinator")
            .field("contention", &self.contention)
            .field("in_flight", &self.is_in_flight())
            .finish_non_exhaustive()
    }
}

/// Session epoch observed when a round trip started
struct Epoch {
    current: Arc<AtomicU64>,
    started: u64,
}

impl Epoch {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.started
    }
}

async fn run_reissue(
    store: TokenStore,
    state: SessionState,
    issuer: Arc<dyn TokenIssuer>,
    slot: Slot,
    force_logout: Arc<AtomicBool>,
    epoch: Epoch,
) -> ReissueOutcome {
    let mut release = SlotRelease {
        slot: Arc::clone(&slot),
        armed: true,
    };

    let result = issuer.reissue().await;

    let mut guard = lock_slot(&slot);
    if !epoch.is_current() {
        debug!("Session changed while reissuing, discarding result");
        *guard = None;
        release.armed = false;
        return ReissueOutcome::Failed;
    }

    let outcome = match result {
        Ok(token) if !token.trim().is_empty() => match store.set(token) {
            Ok(record) => {
                let user_id = user_id_from_token(&record.access_token);
                state.set_authenticated(user_id);
                info!(user_id = ?user_id, "Access token reissued");
                ReissueOutcome::Reissued { user_id }
            }
            Err(e) => {
                warn!("Failed to store reissued access token: {}", e);
                ReissueOutcome::Failed
            }
        },
        Ok(_) => {
            warn!("Token reissue response did not contain an access token");
            ReissueOutcome::Failed
        }
        Err(e) => {
            warn!("Token reissue failed: {}", e);
            ReissueOutcome::Failed
        }
    };

    if !outcome.is_success() && force_logout.load(Ordering::SeqCst) {
        if let Err(e) = store.clear() {
            warn!("Failed to clear access token: {}", e);
        }
        state.set_unauthenticated();
    }

    *guard = None;
    release.armed = false;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueError;
    use crate::issuer::MockTokenIssuer;
    use crate::state::{SessionSnapshot, SessionStatus};
    use crate::test_support::{GatedIssuer, settle, token_for};

    fn coordinator_with(
        issuer: Arc<dyn TokenIssuer>,
        contention: ContentionPolicy,
    ) -> (ReissueCoordinator, TokenStore, SessionState) {
        let store = TokenStore::in_memory();
        let state = SessionState::new();
        let coordinator =
            ReissueCoordinator::new(store.clone(), state.clone(), issuer, contention);
        (coordinator, store, state)
    }

    #[tokio::test]
    async fn test_success_stores_token_and_authenticates() {
        let token = token_for(42);
        let mut issuer = MockTokenIssuer::new();
        let issued = token.clone();
        issuer
            .expect_reissue()
            .times(1)
            .returning(move || Ok(issued.clone()));

        let (coordinator, store, state) =
            coordinator_with(Arc::new(issuer), ContentionPolicy::Join);

        let outcome = coordinator.reissue_outcome(false).await;
        assert_eq!(
            outcome,
            ReissueOutcome::Reissued {
                user_id: Some(UserId(42))
            }
        );
        assert_eq!(store.get(), Some(token));
        assert!(store.issued_at().is_some());
        assert_eq!(state.snapshot(), SessionSnapshot::authenticated(Some(UserId(42))));
        assert!(!coordinator.is_in_flight());
    }

    #[tokio::test]
    async fn test_undecodable_token_authenticates_without_identity() {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_reissue()
            .returning(|| Ok("opaque-token".to_string()));

        let (coordinator, _store, state) =
            coordinator_with(Arc::new(issuer), ContentionPolicy::Join);

        assert!(coordinator.reissue(true).await);
        assert_eq!(state.snapshot().status(), SessionStatus::Authenticated);
        assert_eq!(state.snapshot().user_id(), None);
    }

    #[tokio::test]
    async fn test_forced_failure_clears_session() {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_reissue()
            .times(1)
            .returning(|| Err(IssueError::Rejected { status: 401 }));

        let (coordinator, store, state) =
            coordinator_with(Arc::new(issuer), ContentionPolicy::Join);
        store.set(token_for(5)).unwrap();
        state.set_authenticated(Some(UserId(5)));

        assert!(!coordinator.reissue(true).await);
        assert!(store.get().is_none());
        assert!(store.issued_at().is_none());
        assert_eq!(state.snapshot(), SessionSnapshot::unauthenticated());
    }

    #[tokio::test]
    async fn test_unforced_failure_preserves_session() {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_reissue()
            .times(1)
            .returning(|| Err(IssueError::Transport("connection refused".into())));

        let (coordinator, store, state) =
            coordinator_with(Arc::new(issuer), ContentionPolicy::Join);
        let record = store.set(token_for(5)).unwrap();
        state.set_authenticated(Some(UserId(5)));

        assert!(!coordinator.reissue(false).await);
        assert_eq!(store.record(), Some(record));
        assert_eq!(state.snapshot(), SessionSnapshot::authenticated(Some(UserId(5))));
    }

    #[tokio::test]
    async fn test_blank_token_counts_as_failure() {
        let mut issuer = MockTokenIssuer::new();
        issuer.expect_reissue().returning(|| Ok("  ".to_string()));

        let (coordinator, store, state) =
            coordinator_with(Arc::new(issuer), ContentionPolicy::Join);

        assert!(!coordinator.reissue(true).await);
        assert!(store.get().is_none());
        assert_eq!(state.snapshot().status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_concurrent_callers_join_single_call() {
        let issuer = Arc::new(GatedIssuer::succeeding(token_for(9)));
        let (coordinator, store, _state) =
            coordinator_with(issuer.clone(), ContentionPolicy::Join);

        let callers: Vec<_> = (0..4)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.reissue(false).await })
            })
            .collect();

        settle().await;
        assert_eq!(issuer.calls(), 1);
        assert!(coordinator.is_in_flight());

        issuer.open();
        for caller in callers {
            assert!(caller.await.unwrap());
        }
        assert_eq!(issuer.calls(), 1);
        assert_eq!(store.get(), Some(token_for(9)));
        assert!(!coordinator.is_in_flight());

        // Guard released: the next caller gets a fresh round trip.
        assert!(coordinator.reissue(false).await);
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn test_drop_policy_rejects_concurrent_callers() {
        let issuer = Arc::new(GatedIssuer::succeeding(token_for(9)));
        let (coordinator, _store, _state) =
            coordinator_with(issuer.clone(), ContentionPolicy::Drop);

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.reissue(false).await })
        };
        settle().await;
        assert_eq!(issuer.calls(), 1);

        assert!(!coordinator.reissue(true).await);
        assert_eq!(issuer.calls(), 1);

        issuer.open();
        assert!(leader.await.unwrap());
        assert_eq!(issuer.calls(), 1);
    }

    #[tokio::test]
    async fn test_joined_force_request_applies_to_shared_failure() {
        let issuer = Arc::new(GatedIssuer::failing(IssueError::Rejected { status: 401 }));
        let (coordinator, store, state) =
            coordinator_with(issuer.clone(), ContentionPolicy::Join);
        store.set(token_for(1)).unwrap();
        state.set_authenticated(Some(UserId(1)));

        let background = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.reissue(false).await })
        };
        settle().await;
        let forced = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.reissue(true).await })
        };
        settle().await;

        issuer.open();
        assert!(!background.await.unwrap());
        assert!(!forced.await.unwrap());
        assert_eq!(issuer.calls(), 1);
        assert!(store.get().is_none());
        assert_eq!(state.snapshot(), SessionSnapshot::unauthenticated());
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_strand_guard() {
        let issuer = Arc::new(GatedIssuer::succeeding(token_for(2)));
        let (coordinator, store, _state) =
            coordinator_with(issuer.clone(), ContentionPolicy::Drop);

        let abandoned = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.reissue(false).await })
        };
        settle().await;
        abandoned.abort();
        let _ = abandoned.await;

        issuer.open();
        settle().await;
        assert!(!coordinator.is_in_flight());
        assert_eq!(store.get(), Some(token_for(2)));
        assert!(coordinator.reissue(false).await);
        assert_eq!(issuer.calls(), 2);
    }
}
