//! The handle a running effect uses to push actions back into its store.

use std::sync::Arc;

use crate::cancel::{CancellationToken, Cancelled};

/// Cancellation-aware callback bound to one running task.
///
/// Holds the forwarding callback and the task's token, never the task
/// body. Once the token is cancelled every `send` is a silent no-op.
pub struct Sender<A> {
    forward: Arc<dyn Fn(A) + Send + Sync>,
    token: CancellationToken,
}

impl<A> Clone for Sender<A> {
    fn clone(&self) -> Self {
        Self {
            forward: Arc::clone(&self.forward),
            token: self.token.clone(),
        }
    }
}

impl<A: Send + 'static> Sender<A> {
    pub fn new<F>(forward: F, token: CancellationToken) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            forward: Arc::new(forward),
            token,
        }
    }

    /// Forward `action` to the store, unless the task has been cancelled.
    ///
    /// Cancellation is checked on every call, not only at suspension points.
    pub fn send(&self, action: A) {
        if self.token.is_cancelled() {
            tracing::trace!("send after cancellation dropped");
            return;
        }
        (self.forward)(action);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the owning task is cancelled. Meant for `tokio::select!`.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// `Err(Cancelled)` once the task is cancelled, so bodies can bail out with `?`.
    pub fn check_cancelled(&self) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Build a sender for another action type that converts through `f`
    /// and shares this sender's cancellation token.
    pub fn map_input<C, F>(&self, f: F) -> Sender<C>
    where
        C: Send + 'static,
        F: Fn(C) -> A + Send + Sync + 'static,
    {
        let forward = Arc::clone(&self.forward);
        Sender {
            forward: Arc::new(move |action| forward(f(action))),
            token: self.token.clone(),
        }
    }
}

impl<A> std::fmt::Debug for Sender<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}
