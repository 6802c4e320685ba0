//! Shared test reducers and helpers.

#![allow(dead_code, unused_imports)]

use std::future::Future;
use std::time::Duration;

use effectstore::{
    reducer_fn, Action, Effect, FailurePolicy, Reducer, Store, StoreConfig,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterState {
    pub count: i64,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterAction {
    Increment,
    Decrement,
    Add(i64),
}

impl Action for CounterAction {}

/// Plain counter: every action mutates state and returns `Effect::none()`.
pub fn counter_reducer() -> impl Reducer<State = CounterState, Action = CounterAction> {
    reducer_fn(|state: &mut CounterState, action: CounterAction| {
        match &action {
            CounterAction::Increment => state.count += 1,
            CounterAction::Decrement => state.count -= 1,
            CounterAction::Add(n) => state.count += n,
        }
        state.log.push(format!("{:?}", action));
        Effect::none()
    })
}

/// Apply `actions` to the default state with the counter reducer, without a store.
pub fn fold(actions: &[CounterAction]) -> CounterState {
    let reducer = counter_reducer();
    let mut state = CounterState::default();
    for action in actions {
        let effect = reducer.reduce(&mut state, action.clone());
        assert!(effect.is_none());
    }
    state
}

pub fn config_with(policy: FailurePolicy) -> StoreConfig {
    StoreConfig::default().with_failure_policy(policy)
}

/// Fail the test if `fut` takes longer than a second.
pub async fn within_second<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(1), fut)
        .await
        .expect("timed out waiting for store")
}

/// Poll until `store` has no task in flight, without draining failures
/// the way `settle` does.
pub async fn wait_until_idle<R: Reducer>(store: &Store<R>) {
    within_second(async {
        while store.in_flight_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}
