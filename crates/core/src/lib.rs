//! Gather session core: access-token storage, expiry estimation, single-flight
//! reissue and the observable session state built on top of them.

pub mod claims;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod expiry;
pub mod issuer;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod token;

#[cfg(test)]
mod test_support;

pub use claims::{TokenClaims, UserId, decode_claims, user_id_from_token};
#[cfg(any(test, feature = "tests"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use config::{ContentionPolicy, SessionConfig};
pub use coordinator::{ReissueCoordinator, ReissueOutcome};
pub use error::{IssueError, SessionError, SessionResult};
pub use expiry::ExpiryPolicy;
pub use issuer::TokenIssuer;
pub use scheduler::RefreshScheduler;
pub use session::{Restoration, Session, SessionBuilder};
pub use state::{SessionSnapshot, SessionState, SessionStatus};
pub use token::{FileStorage, MemoryStorage, TokenRecord, TokenStorage, TokenStore};
