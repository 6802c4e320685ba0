//! Store-level errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::TaskId;

/// A task failure that had no error handler.
#[derive(Debug)]
pub struct UnhandledFailure {
    pub task_id: TaskId,
    pub error: anyhow::Error,
}

impl std::fmt::Display for UnhandledFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task {}: {:#}", self.task_id, self.error)
    }
}

/// Errors surfaced by store construction and `Store::settle`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No tokio runtime was available to run effect tasks on.
    #[error("No tokio runtime available: build the store inside a runtime or pass a handle")]
    NoRuntime,

    /// Tasks failed without an error handler since the last settle.
    #[error("{} effect task(s) failed without an error handler: {}", .0.len(), describe(.0))]
    UnhandledFailures(Vec<UnhandledFailure>),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub(crate) fn describe(failures: &[UnhandledFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
