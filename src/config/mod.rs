//! Store configuration: TOML file, defaults, environment override.

mod loader;
mod types;

pub use loader::{ConfigError, FAILURE_POLICY_ENV};
pub use types::{FailurePolicy, StoreConfig};
