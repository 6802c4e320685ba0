//! Asynchronous effect bodies.

use std::future::Future;
use std::sync::Arc;

use futures_core::future::BoxFuture;

use crate::cancel::Cancelled;
use crate::sender::Sender;

type Operation<A> = Box<dyn FnOnce(Sender<A>) -> BoxFuture<'static, anyhow::Result<()>> + Send>;
type ErrorHandler<A> = Box<dyn FnOnce(anyhow::Error, Sender<A>) -> BoxFuture<'static, ()> + Send>;

/// Scheduling hint for a task.
///
/// The tokio scheduler has no priorities, so this is advisory: it is
/// recorded on the task's span and in `TaskInfo`, and `Low`/`Background`
/// tasks yield to the scheduler once before their body starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
    Background,
}

impl Priority {
    pub fn yields_first(self) -> bool {
        matches!(self, Priority::Low | Priority::Background)
    }
}

/// How a task ended.
#[derive(Debug)]
pub enum TaskOutcome {
    /// The body returned `Ok`.
    Completed,
    /// The body stopped because of cancellation. Not an error.
    Cancelled,
    /// The body failed and the error handler ran.
    Handled,
    /// The body failed and there was no error handler.
    Unhandled(anyhow::Error),
}

/// An asynchronous body plus its optional priority and error handler.
pub struct Task<A> {
    priority: Option<Priority>,
    operation: Operation<A>,
    error_handler: Option<ErrorHandler<A>>,
}

impl<A: Send + 'static> Task<A> {
    pub fn new<F, Fut>(operation: F) -> Self
    where
        F: FnOnce(Sender<A>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            priority: None,
            operation: Box::new(move |sender| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(operation(sender))
            }),
            error_handler: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Recover from a non-cancellation failure of the body.
    ///
    /// The handler receives the original error and a sender bound to the
    /// same task, and runs at most once.
    pub fn on_error<H, Fut>(mut self, handler: H) -> Self
    where
        H: FnOnce(anyhow::Error, Sender<A>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.error_handler = Some(Box::new(
            move |error, sender| -> BoxFuture<'static, ()> { Box::pin(handler(error, sender)) },
        ));
        self
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    pub fn has_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }

    /// Run the body to completion against `sender` and classify the result.
    ///
    /// A failure counts as cancellation when it carries [`Cancelled`]
    /// anywhere in its chain, or when the sender's token was already
    /// cancelled by the time the body gave up.
    pub async fn execute(self, sender: Sender<A>) -> TaskOutcome {
        let Task {
            operation,
            error_handler,
            ..
        } = self;

        let error = match operation(sender.clone()).await {
            Ok(()) => return TaskOutcome::Completed,
            Err(error) => error,
        };

        if is_cancellation(&error) || sender.is_cancelled() {
            tracing::debug!(error = %error, "effect task ended by cancellation");
            return TaskOutcome::Cancelled;
        }

        match error_handler {
            Some(handler) => {
                handler(error, sender).await;
                TaskOutcome::Handled
            }
            None => TaskOutcome::Unhandled(error),
        }
    }

    pub(crate) fn map<B>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Task<B>
    where
        B: Send + 'static,
    {
        let Task {
            priority,
            operation,
            error_handler,
        } = self;

        let op_map = Arc::clone(&f);
        let operation: Operation<B> = Box::new(move |sender: Sender<B>| {
            operation(sender.map_input(move |action| op_map(action)))
        });
        let error_handler = error_handler.map(|handler| {
            let mapped: ErrorHandler<B> = Box::new(move |error, sender: Sender<B>| {
                handler(error, sender.map_input(move |action| f(action)))
            });
            mapped
        });

        Task {
            priority,
            operation,
            error_handler,
        }
    }
}

fn is_cancellation(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| cause.is::<Cancelled>())
}

impl<A> std::fmt::Debug for Task<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("priority", &self.priority)
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use anyhow::anyhow;
    use parking_lot::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct DiskError;

    fn harness() -> (Sender<String>, Arc<Mutex<Vec<String>>>, CancellationToken) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = CancellationToken::new();
        let sender = Sender::new(move |s| sink.lock().push(s), token.clone());
        (sender, seen, token)
    }

    #[tokio::test]
    async fn completed_body_sends_in_order() {
        let (sender, seen, _token) = harness();
        let task = Task::new(|sender: Sender<String>| async move {
            sender.send("tick".into());
            tokio::task::yield_now().await;
            sender.send("tock".into());
            Ok(())
        });
        assert!(matches!(task.execute(sender).await, TaskOutcome::Completed));
        assert_eq!(*seen.lock(), vec!["tick", "tock"]);
    }

    #[tokio::test]
    async fn cancelled_error_is_silent_and_skips_handler() {
        let (sender, seen, _token) = harness();
        let task = Task::new(|_sender: Sender<String>| async { Err(Cancelled.into()) })
            .on_error(|_err, sender| async move { sender.send("handler".into()) });
        assert!(matches!(task.execute(sender).await, TaskOutcome::Cancelled));
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn cancelled_with_context_is_still_cancellation() {
        let (sender, _seen, _token) = harness();
        let task = Task::new(|_sender: Sender<String>| async {
            Err(anyhow::Error::new(Cancelled).context("while polling"))
        });
        assert!(matches!(task.execute(sender).await, TaskOutcome::Cancelled));
    }

    #[tokio::test]
    async fn failure_after_token_cancel_counts_as_cancellation() {
        let (sender, _seen, token) = harness();
        let task = Task::new(move |_sender: Sender<String>| async move {
            token.cancel();
            Err(anyhow!("connection reset"))
        });
        assert!(matches!(task.execute(sender).await, TaskOutcome::Cancelled));
    }

    #[tokio::test]
    async fn handler_receives_original_error_once() {
        let (sender, seen, _token) = harness();
        let task = Task::new(|sender: Sender<String>| async move {
            sender.send("before".into());
            Err(DiskError.into())
        })
        .on_error(|err, sender| async move {
            assert!(err.is::<DiskError>());
            sender.send(format!("recovered: {}", err));
        });
        assert!(task.has_error_handler());
        assert!(matches!(task.execute(sender).await, TaskOutcome::Handled));
        assert_eq!(*seen.lock(), vec!["before", "recovered: disk on fire"]);
    }

    #[tokio::test]
    async fn failure_without_handler_is_unhandled() {
        let (sender, _seen, _token) = harness();
        let task = Task::new(|_sender: Sender<String>| async { Err(DiskError.into()) });
        match task.execute(sender).await {
            TaskOutcome::Unhandled(err) => assert!(err.is::<DiskError>()),
            other => panic!("expected Unhandled, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn map_applies_to_body_and_handler() {
        let (sender, seen, _token) = harness();
        let task: Task<u32> = Task::new(|sender: Sender<u32>| async move {
            sender.send(1);
            Err(anyhow!("boom"))
        })
        .with_priority(Priority::Low)
        .on_error(|_err, sender| async move { sender.send(2) });

        let to_label: Arc<dyn Fn(u32) -> String + Send + Sync> = Arc::new(|n| format!("n{}", n));
        let mapped = task.map(to_label);
        assert_eq!(mapped.priority(), Some(Priority::Low));
        assert!(matches!(mapped.execute(sender).await, TaskOutcome::Handled));
        assert_eq!(*seen.lock(), vec!["n1", "n2"]);
    }

    #[test]
    fn only_low_priorities_yield() {
        assert!(!Priority::High.yields_first());
        assert!(!Priority::Medium.yields_first());
        assert!(Priority::Low.yields_first());
        assert!(Priority::Background.yields_first());
    }
}
