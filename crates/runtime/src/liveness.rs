use std::sync::Arc;

use tokio::sync::watch;

/// Liveness flag for one mount of a view.
///
/// Async work captures a clone before suspending and must check
/// [`LivenessToken::is_alive`] (and, where several mounts can exist over time,
/// [`LivenessToken::same_mount`]) before applying results. Revocation is
/// permanent: a fresh mount gets a fresh token.
#[derive(Debug, Clone)]
pub struct LivenessToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for LivenessToken {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn is_alive(&self) -> bool {
        *self.state.borrow()
    }

    /// Marks the mount dead and wakes every task waiting in [`Self::revoked`].
    ///
    /// Returns `true` if this call performed the revocation.
    pub fn revoke(&self) -> bool {
        self.state.send_replace(false)
    }

    /// True if both tokens were issued for the same mount.
    pub fn same_mount(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Resolves once the token has been revoked (immediately if it already is).
    pub async fn revoked(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|alive| !*alive).await;
    }
}
