//! Bookkeeping for in-flight effect tasks.
//!
//! The registry tracks every running task with its cancellation token so
//! the store can cancel them on teardown, and wakes `wait_idle` callers
//! once the last task completes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::effect::Priority;
use crate::error::UnhandledFailure;

/// Identifier of one spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Snapshot of a running task.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    pub priority: Option<Priority>,
    pub running_for: Duration,
    pub cancelled: bool,
}

struct Entry {
    priority: Option<Priority>,
    started_at: Instant,
    token: CancellationToken,
}

#[derive(Clone, Default)]
pub(crate) struct TaskRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    tasks: Mutex<HashMap<TaskId, Entry>>,
    failures: Mutex<Vec<UnhandledFailure>>,
    idle: Notify,
}

impl TaskRegistry {
    pub(crate) fn register(&self, id: TaskId, priority: Option<Priority>, token: CancellationToken) {
        self.inner.tasks.lock().insert(
            id,
            Entry {
                priority,
                started_at: Instant::now(),
                token,
            },
        );
    }

    /// Drop a finished task and wake idle waiters if it was the last one.
    pub(crate) fn complete(&self, id: TaskId) {
        let now_idle = {
            let mut tasks = self.inner.tasks.lock();
            tasks.remove(&id);
            tasks.is_empty()
        };
        if now_idle {
            self.inner.idle.notify_waiters();
        }
    }

    pub(crate) fn cancel(&self, id: TaskId) -> bool {
        match self.inner.tasks.lock().get(&id) {
            Some(entry) => entry.token.cancel(),
            None => false,
        }
    }

    /// Cancel every in-flight task. Returns how many were newly cancelled.
    pub(crate) fn cancel_all(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .values()
            .filter(|entry| entry.token.cancel())
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    pub(crate) fn snapshot(&self) -> Vec<TaskInfo> {
        self.inner
            .tasks
            .lock()
            .iter()
            .map(|(id, entry)| TaskInfo {
                id: *id,
                priority: entry.priority,
                running_for: entry.started_at.elapsed(),
                cancelled: entry.token.is_cancelled(),
            })
            .collect()
    }

    pub(crate) fn record_failure(&self, failure: UnhandledFailure) {
        self.inner.failures.lock().push(failure);
    }

    pub(crate) fn take_failures(&self) -> Vec<UnhandledFailure> {
        std::mem::take(&mut *self.inner.failures.lock())
    }

    /// Resolves when no task is in flight.
    pub(crate) async fn wait_idle(&self) {
        loop {
            // Subscribe before checking, so a completion between the check
            // and the await still wakes us.
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.tasks.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }
}
