//! Near-expiry detection for access tokens
//!
//! The backend does not tell the client when a token expires, so expiry is
//! estimated from the locally recorded issuance time and a fixed lifetime.

use chrono::{DateTime, Duration, Utc};

/// Default assumed access-token lifetime, in seconds
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 15 * 60;

/// Fixed-lifetime expiry estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    lifetime: Duration,
}

impl ExpiryPolicy {
    /// Create a policy assuming tokens live for `lifetime`
    #[must_use]
    pub const fn new(lifetime: Duration) -> Self {
        Self { lifetime }
    }

    /// Assumed token lifetime
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Whether a token issued at `issued_at` is expired or within `threshold` of expiring
    ///
    /// An unknown issuance time counts as expired.
    #[must_use]
    pub fn is_near_expiry(
        &self,
        issued_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> bool {
        let Some(issued_at) = issued_at else {
            return true;
        };
        now - issued_at >= self.lifetime - threshold
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
    }
}
