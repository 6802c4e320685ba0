use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// What to do with a task failure that has no error handler.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// How long `Store::shutdown` waits for cancelled tasks to exit (default: 5000).
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Let `Low`/`Background` tasks yield once before starting (default: true).
    #[serde(default = "default_yield_low_priority")]
    pub yield_low_priority: bool,
}

/// Reaction to a task that fails without an error handler.
///
/// Every policy logs the failure at error level and records it for
/// `Store::settle`; they differ in how loudly it surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Panic inside the failing task and again in `settle`.
    Panic,
    /// `settle` returns `StoreError::UnhandledFailures`.
    Report,
    /// Log and continue.
    Log,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            FailurePolicy::Panic
        } else {
            FailurePolicy::Report
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "panic" => Ok(FailurePolicy::Panic),
            "report" => Ok(FailurePolicy::Report),
            "log" => Ok(FailurePolicy::Log),
            other => Err(format!(
                "unknown failure policy '{}' (expected panic, report or log)",
                other
            )),
        }
    }
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}

fn default_yield_low_priority() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            yield_low_priority: default_yield_low_priority(),
        }
    }
}

impl StoreConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
