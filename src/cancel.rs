//! Cooperative cancellation.
//!
//! A [`CancelToken`] is shared by every concurrent unit of one run. Cancelling is
//! one-way and idempotent; every clone observes it. Tasks race their suspension
//! points (delays, network calls, channel sends) against [`CancelToken::cancelled`].

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Marks the token cancelled and wakes every waiter.
    pub fn cancel(&self) {
        let already = self.state.send_replace(true);
        if !already {
            tracing::debug!("Cancellation signalled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once the token is cancelled. Resolves immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns on cancellation.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
