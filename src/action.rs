//! Base trait for actions fed into a store.

/// Marker trait for action values.
///
/// Actions represent:
/// - Caller requests (button presses, commands)
/// - Results of effects (responses, timer ticks, failures)
///
/// Actions are processed by reducers, which mutate state and return the
/// next [`Effect`](crate::Effect) to run. `Debug` is required so the store
/// can name actions in its logs.
pub trait Action: std::fmt::Debug + Send + 'static {}
