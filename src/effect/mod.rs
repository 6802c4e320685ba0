//! Effect descriptions returned by reducers.
//!
//! An [`Effect`] is a value. Building one performs no work; the store
//! decides what to do with it after the reducer returns.
//!
//! # Layout
//!
//! - `mod.rs` - the `Effect` sum type and its combinators
//! - `task.rs` - asynchronous task bodies, priorities, error handlers

mod task;

use std::sync::Arc;

pub use task::{Priority, Task, TaskOutcome};

use crate::sender::Sender;

/// Work a reducer asks the store to perform.
pub enum Effect<A> {
    /// No work.
    None,
    /// Deliver exactly one action through the normal dispatch channel,
    /// after the reducer call that produced it has finished.
    Send(A),
    /// Run an asynchronous body that may send any number of actions.
    Run(Task<A>),
    /// Several effects, handled in order.
    Batch(Vec<Effect<A>>),
}

impl<A: Send + 'static> Effect<A> {
    pub fn none() -> Self {
        Effect::None
    }

    pub fn send(action: A) -> Self {
        Effect::Send(action)
    }

    /// Wrap an asynchronous body with no priority and no error handler.
    ///
    /// Use [`Task::new`] to attach either before converting into an effect.
    pub fn run<F, Fut>(operation: F) -> Self
    where
        F: FnOnce(Sender<A>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Effect::Run(Task::new(operation))
    }

    /// Combine effects into one. Empty input collapses to `None`, a single
    /// effect is returned unchanged.
    pub fn merge<I>(effects: I) -> Self
    where
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut effects: Vec<_> = effects.into_iter().filter(|e| !e.is_none()).collect();
        match effects.len() {
            0 => Effect::None,
            1 => effects.remove(0),
            _ => Effect::Batch(effects),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }

    /// Lift this effect into a parent action type.
    ///
    /// Task bodies keep running unchanged; every action they send passes
    /// through `f` first.
    pub fn map<B, F>(self, f: F) -> Effect<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.map_shared(Arc::new(f))
    }

    fn map_shared<B>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Effect<B>
    where
        B: Send + 'static,
    {
        match self {
            Effect::None => Effect::None,
            Effect::Send(action) => Effect::Send(f(action)),
            Effect::Run(task) => Effect::Run(task.map(f)),
            Effect::Batch(effects) => Effect::Batch(
                effects
                    .into_iter()
                    .map(|effect| effect.map_shared(Arc::clone(&f)))
                    .collect(),
            ),
        }
    }
}

impl<A> From<Task<A>> for Effect<A> {
    fn from(task: Task<A>) -> Self {
        Effect::Run(task)
    }
}

impl<A: std::fmt::Debug> std::fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => f.write_str("None"),
            Effect::Send(action) => f.debug_tuple("Send").field(action).finish(),
            Effect::Run(task) => f.debug_tuple("Run").field(task).finish(),
            Effect::Batch(effects) => f.debug_tuple("Batch").field(effects).finish(),
        }
    }
}
