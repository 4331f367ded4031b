// ABOUTME: Composable cancellation for a single execution
// ABOUTME: Combines request cancel, session cancel, and a deadline into one handle every blocking op observes

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The reason an execution's cancel handle fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's request token was cancelled.
    Request,
    /// `Engine::cancel(execution_id)` was called.
    Session,
    /// The composite deadline elapsed.
    Deadline,
}

/// A single composable cancel handle for one execution.
///
/// Combines a request-scoped token, a session-scoped token (driven by
/// `Engine::cancel`), and an optional deadline timer. Cancelling any one of
/// the three cancels the whole handle; every blocking operation in the
/// pipeline accepts `&CancelHandle` and observes it via [`CancelHandle::cancelled`].
#[derive(Clone)]
pub struct CancelHandle {
    token: CancellationToken,
    session_token: CancellationToken,
    fired_reason: Arc<Mutex<Option<CancelReason>>>,
}

impl CancelHandle {
    /// Build a handle from a caller-supplied request token (or a fresh one
    /// if the caller did not provide cancellation) plus a fresh session
    /// token this handle's `cancel_session` controls, combined with an
    /// optional deadline.
    pub fn new(request_token: CancellationToken, deadline: Option<Duration>) -> Self {
        let session_token = CancellationToken::new();
        let composite = CancellationToken::new();
        let fired_reason = Arc::new(Mutex::new(None));

        spawn_follower(request_token.clone(), composite.clone(), CancelReason::Request, fired_reason.clone());
        spawn_follower(session_token.clone(), composite.clone(), CancelReason::Session, fired_reason.clone());

        if let Some(deadline) = deadline {
            let composite = composite.clone();
            let fired_reason = fired_reason.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(deadline) => {
                        debug!("execution deadline of {:?} elapsed", deadline);
                        fired_reason.lock().unwrap().get_or_insert(CancelReason::Deadline);
                        composite.cancel();
                    }
                    _ = composite.cancelled() => {}
                }
            });
        }

        Self {
            token: composite,
            session_token,
            fired_reason,
        }
    }

    /// Trigger cancellation via the session path (what `Engine::cancel` calls).
    pub fn cancel_session(&self) {
        self.session_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Which source fired first, if the handle has been cancelled. `None`
    /// while still live.
    pub fn reason(&self) -> Option<CancelReason> {
        *self.fired_reason.lock().unwrap()
    }

    /// Resolves once this handle has been cancelled by any source.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// A child token that cascades from this handle, for handing to a
    /// single blocking operation (e.g. a child process wait) that also
    /// wants to be cancelled independently without affecting siblings.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

fn spawn_follower(
    source: CancellationToken,
    target: CancellationToken,
    reason: CancelReason,
    fired_reason: Arc<Mutex<Option<CancelReason>>>,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = source.cancelled() => {
                debug!(?reason, "cancel handle fired");
                fired_reason.lock().unwrap().get_or_insert(reason);
                target.cancel();
            }
            _ = target.cancelled() => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_cancel_fires_the_composite() {
        let handle = CancelHandle::new(CancellationToken::new(), None);
        assert!(!handle.is_cancelled());
        handle.cancel_session();
        handle.cancelled().await;
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn request_cancel_fires_the_composite() {
        let request = CancellationToken::new();
        let handle = CancelHandle::new(request.clone(), None);
        request.cancel();
        handle.cancelled().await;
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn deadline_fires_the_composite() {
        let handle = CancelHandle::new(CancellationToken::new(), Some(Duration::from_millis(20)));
        tokio::time::timeout(Duration::from_secs(2), handle.cancelled())
            .await
            .expect("deadline should have cancelled the handle");
    }
}
