//! Fakes shared by the unit tests

use crate::error::IssueError;
use crate::issuer::TokenIssuer;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// A signed-looking token whose subject is `user_id`
pub fn token_for(user_id: i64) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{user_id}"}}"#));
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2lnbmF0dXJl")
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Issuer whose reissue calls block until the gate is opened
pub struct GatedIssuer {
    response: Result<String, IssueError>,
    gate: Semaphore,
    calls: AtomicUsize,
    revokes: AtomicUsize,
}

impl GatedIssuer {
    pub fn succeeding(token: String) -> Self {
        Self::gated(Ok(token))
    }

    pub fn failing(error: IssueError) -> Self {
        Self::gated(Err(error))
    }

    /// Issuer that answers immediately
    pub fn open_with(response: Result<String, IssueError>) -> Self {
        let issuer = Self::gated(response);
        issuer.open();
        issuer
    }

    fn gated(response: Result<String, IssueError>) -> Self {
        Self {
            response,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            revokes: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(1024);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn revokes(&self) -> usize {
        self.revokes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenIssuer for GatedIssuer {
    async fn reissue(&self) -> Result<String, IssueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.response.clone()
    }

    async fn revoke(&self) -> Result<(), IssueError> {
        self.revokes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
