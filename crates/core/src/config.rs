//! Session timing and contention settings

use crate::error::{SessionError, SessionResult};
use crate::expiry::{DEFAULT_TOKEN_LIFETIME_SECS, ExpiryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a reissue request does when another one is already in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentionPolicy {
    /// Wait for the in-flight call and share its result
    #[default]
    Join,
    /// Return `false` immediately without waiting
    Drop,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Assumed lifetime of an access token
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,

    /// Lead time before expiry at which the periodic check reissues
    #[serde(default = "default_refresh_threshold_secs")]
    pub refresh_threshold_secs: u64,

    /// Period of the near-expiry check while signed in
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    #[serde(default)]
    pub contention: ContentionPolicy,
}

fn default_token_lifetime_secs() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS.unsigned_abs()
}

fn default_refresh_threshold_secs() -> u64 {
    60
}

fn default_check_interval_secs() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_lifetime_secs: default_token_lifetime_secs(),
            refresh_threshold_secs: default_refresh_threshold_secs(),
            check_interval_secs: default_check_interval_secs(),
            contention: ContentionPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> SessionResult<()> {
        if self.token_lifetime_secs == 0 {
            return Err(SessionError::invalid_config(
                "token_lifetime_secs must be greater than zero",
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(SessionError::invalid_config(
                "check_interval_secs must be greater than zero",
            ));
        }
        if self.refresh_threshold_secs > self.token_lifetime_secs {
            return Err(SessionError::invalid_config(format!(
                "refresh_threshold_secs ({}) exceeds token_lifetime_secs ({})",
                self.refresh_threshold_secs, self.token_lifetime_secs
            )));
        }
        Ok(())
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(chrono_secs(self.token_lifetime_secs))
    }

    pub fn refresh_threshold(&self) -> chrono::Duration {
        chrono_secs(self.refresh_threshold_secs)
    }

    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

fn chrono_secs(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}
