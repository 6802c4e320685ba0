//! Reducer trait and closure adapter.

use std::marker::PhantomData;

use crate::action::Action;
use crate::effect::Effect;

/// Reducer mutates state for one action and describes follow-up work.
///
/// The reducer is the only place where state transitions happen. It must be
/// total and must not block or start asynchronous work itself: anything
/// like that is returned as an [`Effect`].
pub trait Reducer: Send + Sync + 'static {
    /// The state type this reducer operates on.
    type State: Send + 'static;

    /// The action type this reducer handles.
    type Action: Action;

    /// Apply `action` to `state` in place and return the effect to run.
    fn reduce(&self, state: &mut Self::State, action: Self::Action) -> Effect<Self::Action>;
}

/// A [`Reducer`] backed by a closure. Build one with [`reducer_fn`].
pub struct FnReducer<S, A, F> {
    reduce: F,
    _marker: PhantomData<fn(&mut S, A)>,
}

pub fn reducer_fn<S, A, F>(reduce: F) -> FnReducer<S, A, F>
where
    S: Send + 'static,
    A: Action,
    F: Fn(&mut S, A) -> Effect<A> + Send + Sync + 'static,
{
    FnReducer {
        reduce,
        _marker: PhantomData,
    }
}

impl<S, A, F> Reducer for FnReducer<S, A, F>
where
    S: Send + 'static,
    A: Action,
    F: Fn(&mut S, A) -> Effect<A> + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut S, action: A) -> Effect<A> {
        (self.reduce)(state, action)
    }
}
