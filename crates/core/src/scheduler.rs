//! Periodic near-expiry check
//!
//! A single task alternates between two phases: idle while the session is not
//! authenticated, and ticking while it is. Leaving the authenticated state
//! drops the ticker inside the same task, so a stopped ticker and a newly
//! started one can never run side by side.

use crate::session::Session;
use crate::state::SessionSnapshot;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reissues the access token shortly before it expires
pub struct RefreshScheduler {
    session: Session,
}

impl RefreshScheduler {
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Run the scheduler until `shutdown` is cancelled
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) {
        let mut rx = self.session.subscribe();
        let period = self.session.config().check_interval();

        loop {
            let signed_in = tokio::select! {
                () = shutdown.cancelled() => false,
                ready = rx.wait_for(SessionSnapshot::is_authenticated).map(|r| r.is_ok()) => ready,
            };
            if !signed_in {
                break;
            }

            debug!(period_secs = period.as_secs(), "Starting token refresh checks");
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => return,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if !rx.borrow_and_update().is_authenticated() {
                            debug!("Stopping token refresh checks");
                            break;
                        }
                    }
                    _ = ticker.tick() => self.check().await,
                }
            }
        }

        debug!("Token refresh scheduler stopped");
    }

    async fn check(&self) {
        if !self.session.is_near_expiry() {
            return;
        }
        info!("Access token near expiry, reissuing");
        if !self.session.reissue(false).await {
            warn!("Scheduled token reissue did not produce a new token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::UserId;
    use crate::clock::{Clock, ManualClock};
    use crate::error::IssueError;
    use crate::state::SessionStatus;
    use crate::test_support::{GatedIssuer, settle, token_for};
    use crate::token::{MemoryStorage, TokenStore};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    fn session_with(issuer: Arc<GatedIssuer>) -> (Session, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap());
        let store =
            TokenStore::with_clock(Arc::new(MemoryStorage::new()), Arc::new(clock.clone()));
        let session = Session::builder(issuer).store(store).build().unwrap();
        (session, clock)
    }

    async fn advance(secs: u64) {
        time::sleep(Duration::from_secs(secs)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reissues_near_expiry_while_authenticated() {
        let issuer = Arc::new(GatedIssuer::open_with(Ok(token_for(4))));
        let (session, clock) = session_with(issuer.clone());
        session.login(token_for(4)).unwrap();

        let shutdown = CancellationToken::new();
        let handle = session.spawn_refresh_scheduler(shutdown.clone());

        // Fresh token: ticks happen but nothing is near expiry.
        advance(61).await;
        assert_eq!(issuer.calls(), 0);

        clock.advance(chrono::Duration::minutes(14));
        advance(60).await;
        assert_eq!(issuer.calls(), 1);
        assert_eq!(session.store().issued_at(), Some(clock.now()));

        // The reissue restamped the token, so the next tick is quiet.
        advance(60).await;
        assert_eq!(issuer.calls(), 1);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_until_authenticated() {
        let issuer = Arc::new(GatedIssuer::open_with(Ok(token_for(4))));
        let (session, _clock) = session_with(issuer.clone());

        let shutdown = CancellationToken::new();
        let handle = session.spawn_refresh_scheduler(shutdown.clone());

        // No token at all would count as expired, but nobody is signed in.
        advance(300).await;
        assert_eq!(issuer.calls(), 0);
        assert_eq!(session.status(), SessionStatus::Unknown);

        session.state().set_authenticated(Some(UserId(4)));
        advance(61).await;
        assert_eq!(issuer.calls(), 1);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_session_ends() {
        let issuer = Arc::new(GatedIssuer::open_with(Err(IssueError::Rejected {
            status: 401,
        })));
        let (session, clock) = session_with(issuer.clone());
        session.login(token_for(4)).unwrap();

        let shutdown = CancellationToken::new();
        let handle = session.spawn_refresh_scheduler(shutdown.clone());
        settle().await;

        session.state().set_unauthenticated();
        clock.advance(chrono::Duration::minutes(20));
        advance(600).await;
        assert_eq!(issuer.calls(), 0);

        // Signing back in starts a fresh ticker.
        session.state().set_authenticated(Some(UserId(4)));
        advance(30).await;
        assert_eq!(issuer.calls(), 0);
        advance(31).await;
        assert_eq!(issuer.calls(), 1);
        // Unforced failure keeps the session.
        assert_eq!(session.status(), SessionStatus::Authenticated);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_idle() {
        let issuer = Arc::new(GatedIssuer::open_with(Ok(token_for(1))));
        let (session, _clock) = session_with(issuer);

        let shutdown = CancellationToken::new();
        let handle = session.spawn_refresh_scheduler(shutdown.clone());
        settle().await;

        shutdown.cancel();
        handle.await.unwrap();
    }
}
