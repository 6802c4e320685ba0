//! A small unidirectional state store with an effect engine.
//!
//! A [`Store`] owns one state value and serializes every mutation through a
//! [`Reducer`]. Reducers never do asynchronous work themselves; they return
//! an [`Effect`] describing it, and the store runs that effect and feeds the
//! actions it produces back through `dispatch`.
//!
//! ```text
//! caller ──dispatch──→ Store ──reduce──→ State
//!                        │
//!                     Effect::Run ──spawn──→ task ──Sender::send──┐
//!                        ↑                                        │
//!                        └────────────────dispatch────────────────┘
//! ```
//!
//! Cancellation is cooperative: tearing the store down cancels each task's
//! token, after which its [`Sender`] drops every action silently.

pub mod action;
pub mod cancel;
pub mod config;
pub mod effect;
pub mod error;
pub mod logging;
pub mod reducer;
pub mod sender;
pub mod store;

pub use action::Action;
pub use cancel::{CancellationToken, Cancelled};
pub use config::{ConfigError, FailurePolicy, StoreConfig};
pub use effect::{Effect, Priority, Task, TaskOutcome};
pub use error::{StoreError, UnhandledFailure};
pub use reducer::{reducer_fn, FnReducer, Reducer};
pub use sender::Sender;
pub use store::{Store, StoreBuilder, TaskId, TaskInfo};
