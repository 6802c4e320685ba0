//! The store: owns state, runs the reducer, drives effects.
//!
//! ```text
//! dispatch(action) ──→ Reducer ──→ State
//!        ↑               │
//!        │            Effect ──→ None | Send | Run(task) | Batch
//!        │                               │
//!        └──────── Sender::send ─────────┘
//! ```
//!
//! All reducer calls happen under one lock, so concurrent dispatches from
//! callers and running tasks are serialized and never interleave.

mod tasks;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::Instrument;

pub use tasks::{TaskId, TaskInfo};

use crate::cancel::CancellationToken;
use crate::config::{FailurePolicy, StoreConfig};
use crate::effect::{Effect, Task, TaskOutcome};
use crate::error::{describe, StoreError, UnhandledFailure};
use crate::reducer::Reducer;
use crate::sender::Sender;
use tasks::TaskRegistry;

/// Shared handle to a running store. Cloning is cheap; all clones drive
/// the same state.
///
/// Dropping the last handle cancels every in-flight task.
pub struct Store<R: Reducer> {
    inner: Arc<StoreInner<R>>,
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StoreInner<R: Reducer> {
    reducer: R,
    state: Mutex<R::State>,
    tasks: TaskRegistry,
    config: StoreConfig,
    runtime: Handle,
    closed: AtomicBool,
}

/// Builder for [`Store`] with a custom config or runtime handle.
pub struct StoreBuilder<R: Reducer> {
    initial: R::State,
    reducer: R,
    config: StoreConfig,
    runtime: Option<Handle>,
}

impl<R: Reducer> StoreBuilder<R> {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn effect tasks on `handle` instead of the ambient runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// # Errors
    /// Returns `NoRuntime` if no handle was given and the caller is not
    /// inside a tokio runtime, or `Config` if the config fails validation.
    pub fn build(self) -> Result<Store<R>, StoreError> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| StoreError::NoRuntime)?,
        };

        tracing::debug!(
            failure_policy = ?self.config.failure_policy,
            "Store created"
        );

        Ok(Store {
            inner: Arc::new(StoreInner {
                reducer: self.reducer,
                state: Mutex::new(self.initial),
                tasks: TaskRegistry::default(),
                config: self.config,
                runtime,
                closed: AtomicBool::new(false),
            }),
        })
    }
}

impl<R: Reducer> Store<R> {
    /// Create a store on the ambient tokio runtime with default config.
    ///
    /// # Errors
    /// Returns `NoRuntime` when called outside a tokio runtime.
    pub fn new(initial: R::State, reducer: R) -> Result<Self, StoreError> {
        Self::builder(initial, reducer).build()
    }

    pub fn builder(initial: R::State, reducer: R) -> StoreBuilder<R> {
        StoreBuilder {
            initial,
            reducer,
            config: StoreConfig::default(),
            runtime: None,
        }
    }

    /// Run the reducer for `action` and handle the effect it returns.
    ///
    /// Callable from any thread or task. Returns once the reducer has run
    /// for `action` and for every immediate `Send` it chained; `Run`
    /// effects are spawned, never awaited. Must not be called from inside
    /// [`Store::with_state`].
    pub fn dispatch(&self, action: R::Action) {
        self.inner.dispatch(action);
    }

    /// Clone of the current state.
    pub fn state(&self) -> R::State
    where
        R::State: Clone,
    {
        self.inner.state.lock().clone()
    }

    /// Read the current state without cloning it.
    pub fn with_state<T>(&self, f: impl FnOnce(&R::State) -> T) -> T {
        f(&self.inner.state.lock())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn in_flight(&self) -> Vec<TaskInfo> {
        self.inner.tasks.snapshot()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Cancel one task. Returns `false` if it already finished or was
    /// already cancelled.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        self.inner.tasks.cancel(id)
    }

    /// Cancel every in-flight task. The store stays open for new dispatches.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.inner.tasks.cancel_all();
        if cancelled > 0 {
            tracing::debug!(cancelled, "Cancelled in-flight effect tasks");
        }
        cancelled
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Drain recorded failures without waiting for the store to go idle.
    ///
    /// For stores that run long-lived tasks and so never settle. Failures
    /// are only recorded under `FailurePolicy::Panic` and `Report`.
    pub fn take_failures(&self) -> Vec<UnhandledFailure> {
        self.inner.tasks.take_failures()
    }

    /// Wait until no task is in flight, then report failures that had no
    /// error handler since the previous call.
    ///
    /// Tasks spawned while waiting are waited for too.
    ///
    /// # Errors
    /// Under `FailurePolicy::Report`, returns `UnhandledFailures`.
    ///
    /// # Panics
    /// Under `FailurePolicy::Panic`, panics if any failure was recorded.
    pub async fn settle(&self) -> Result<(), StoreError> {
        self.inner.tasks.wait_idle().await;

        let failures = self.inner.tasks.take_failures();
        if failures.is_empty() {
            return Ok(());
        }

        match self.inner.config.failure_policy {
            FailurePolicy::Panic => panic!(
                "effect task failed without an error handler: {}",
                describe(&failures)
            ),
            FailurePolicy::Report => Err(StoreError::UnhandledFailures(failures)),
            FailurePolicy::Log => Ok(()),
        }
    }

    /// Tear the store down using the configured shutdown timeout.
    pub async fn shutdown(&self) -> bool {
        self.shutdown_with_timeout(self.inner.config.shutdown_timeout())
            .await
    }

    /// Close the store, cancel all tasks and wait up to `timeout` for them
    /// to exit. Returns `true` if every task finished in time.
    ///
    /// Dispatches after this point are ignored.
    pub async fn shutdown_with_timeout(&self, timeout: Duration) -> bool {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("Store shutdown initiated");
        }
        // A dispatch already holding the lock may still spawn tasks; let it
        // finish so cancel_all sees them. Later dispatches observe `closed`.
        drop(self.inner.state.lock());
        self.cancel_all();

        match tokio::time::timeout(timeout, self.inner.tasks.wait_idle()).await {
            Ok(()) => {
                tracing::info!("Store shutdown complete");
                true
            }
            Err(_) => {
                tracing::warn!(
                    remaining = self.inner.tasks.len(),
                    "Store shutdown timed out with tasks still running"
                );
                false
            }
        }
    }
}

impl<R: Reducer> StoreInner<R> {
    fn dispatch(self: &Arc<Self>, action: R::Action) {
        let mut state = self.state.lock();
        if self.closed.load(Ordering::SeqCst) {
            tracing::warn!(?action, "Dispatch on closed store ignored");
            return;
        }

        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            tracing::debug!(?action, "dispatch");
            let effect = self.reducer.reduce(&mut state, action);
            self.handle(effect, &mut queue);
        }
    }

    fn handle(self: &Arc<Self>, effect: Effect<R::Action>, queue: &mut VecDeque<R::Action>) {
        match effect {
            Effect::None => {}
            Effect::Send(action) => queue.push_back(action),
            Effect::Run(task) => self.spawn(task),
            Effect::Batch(effects) => {
                for effect in effects {
                    self.handle(effect, queue);
                }
            }
        }
    }

    fn spawn(self: &Arc<Self>, task: Task<R::Action>) {
        let id = TaskId::new();
        let priority = task.priority();
        let token = CancellationToken::new();
        self.tasks.register(id, priority, token.clone());

        let sender = Sender::new(forward_to(Arc::downgrade(self)), token);
        let policy = self.config.failure_policy;
        let record = policy != FailurePolicy::Log;
        let yield_first = self.config.yield_low_priority && priority.is_some_and(|p| p.yields_first());
        let registry = self.tasks.clone();
        let span = tracing::debug_span!("effect_task", task_id = %id, priority = ?priority);

        self.runtime.spawn(
            async move {
                // Deregister even if the body panics.
                let registry = scopeguard::guard(registry, move |registry| registry.complete(id));

                if yield_first {
                    tokio::task::yield_now().await;
                }

                match task.execute(sender).await {
                    TaskOutcome::Unhandled(error) => {
                        let message = format!("{:#}", error);
                        tracing::error!(error = %message, "Effect task failed without an error handler");
                        if record {
                            registry.record_failure(UnhandledFailure { task_id: id, error });
                        }
                        if policy == FailurePolicy::Panic {
                            panic!("effect task {} failed without an error handler: {}", id, message);
                        }
                    }
                    outcome => tracing::debug!(?outcome, "Effect task finished"),
                }
            }
            .instrument(span),
        );
    }
}

/// Forwarding callback for a task's sender. Holds the store weakly so a
/// running task never keeps a discarded store alive.
fn forward_to<R: Reducer>(store: Weak<StoreInner<R>>) -> impl Fn(R::Action) + Send + Sync + 'static {
    move |action| match store.upgrade() {
        Some(inner) => inner.dispatch(action),
        None => tracing::trace!(?action, "Store dropped, send ignored"),
    }
}

impl<R: Reducer> Drop for StoreInner<R> {
    fn drop(&mut self) {
        let cancelled = self.tasks.cancel_all();
        if cancelled > 0 {
            tracing::debug!(cancelled, "Store dropped, cancelled in-flight effect tasks");
        }

        let failures = self.tasks.take_failures();
        if failures.is_empty() {
            return;
        }
        tracing::error!(
            count = failures.len(),
            failures = %describe(&failures),
            "Store dropped with unreported effect task failures"
        );
        if self.config.failure_policy == FailurePolicy::Panic && !std::thread::panicking() {
            panic!(
                "store dropped with unreported effect task failures: {}",
                describe(&failures)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::reducer::reducer_fn;

    #[derive(Debug)]
    enum Step {
        Bump,
        Twice,
    }

    impl Action for Step {}

    #[test]
    fn new_outside_runtime_fails() {
        let reducer = reducer_fn(|n: &mut u32, _step: Step| {
            *n += 1;
            Effect::none()
        });
        assert!(matches!(Store::new(0, reducer), Err(StoreError::NoRuntime)));
    }

    #[test]
    fn explicit_runtime_handle_is_used() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let reducer = reducer_fn(|n: &mut u32, step: Step| match step {
            Step::Bump => {
                *n += 1;
                Effect::none()
            }
            Step::Twice => Effect::merge([Effect::send(Step::Bump), Effect::send(Step::Bump)]),
        });
        let store = Store::builder(0, reducer)
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        store.dispatch(Step::Twice);
        assert_eq!(store.state(), 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let reducer = reducer_fn(|_n: &mut u32, _step: Step| Effect::none());
        let config = StoreConfig {
            shutdown_timeout_ms: 0,
            ..StoreConfig::default()
        };
        let result = Store::builder(0, reducer)
            .config(config)
            .runtime(runtime.handle().clone())
            .build();
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
