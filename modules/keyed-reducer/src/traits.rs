//! Core traits for keyed reduction.

use std::sync::Arc;

use crate::action::StoreKeys;

/// Actions carry a type string and an optional store-key map in their metadata.
pub trait ActionLike: Clone + Send + Sync + 'static {
    /// The action's type discriminator.
    fn action_type(&self) -> &str;

    /// The store-key map embedded in this action's metadata, if any.
    fn store_keys(&self) -> Option<&StoreKeys>;

    /// Replace the store-key map in this action's metadata. Every other field,
    /// including unrelated metadata, must come through untouched.
    fn with_store_keys(self, store_keys: StoreKeys) -> Self;
}

/// What a reducer is asked to apply.
///
/// `Init` is the reserved initialization pass. It is not an action value, so
/// it can never collide with a user action type.
#[derive(Debug)]
pub enum ReducerAction<'a, A> {
    Init,
    Action(&'a A),
}

impl<'a, A> ReducerAction<'a, A> {
    pub fn action(&self) -> Option<&'a A> {
        match *self {
            ReducerAction::Init => None,
            ReducerAction::Action(action) => Some(action),
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, ReducerAction::Init)
    }
}

impl<'a, A: ActionLike> ReducerAction<'a, A> {
    /// The dispatched action's type, or `None` for the init pass.
    pub fn action_type(&self) -> Option<&'a str> {
        self.action().map(ActionLike::action_type)
    }
}

impl<A> Clone for ReducerAction<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for ReducerAction<'_, A> {}

impl<'a, A> From<&'a A> for ReducerAction<'a, A> {
    fn from(action: &'a A) -> Self {
        ReducerAction::Action(action)
    }
}

/// Pure state transitions. No I/O, no side effects.
///
/// `state` is `None` when there is no prior state; the reducer must then
/// produce its initial state.
pub trait Reducer<A, S>: Send + Sync {
    fn reduce(&self, state: Option<&S>, action: ReducerAction<'_, A>) -> S;

    /// Same transition over shared state. Returning a clone of `state`'s
    /// handle reports that nothing changed; the default always allocates.
    fn reduce_shared(&self, state: Option<&Arc<S>>, action: ReducerAction<'_, A>) -> Arc<S> {
        Arc::new(self.reduce(state.map(|s| &**s), action))
    }
}

impl<A, S, F> Reducer<A, S> for F
where
    F: Fn(Option<&S>, ReducerAction<'_, A>) -> S + Send + Sync,
{
    fn reduce(&self, state: Option<&S>, action: ReducerAction<'_, A>) -> S {
        self(state, action)
    }
}

/// Adapter that hands back the prior state handle whenever the wrapped
/// reducer's output compares equal to it.
#[derive(Debug, Clone, Copy)]
pub struct RetainUnchanged<R>(R);

/// Wrap `reducer` so transitions that change nothing keep the existing
/// shared state.
pub fn retain_unchanged<R>(reducer: R) -> RetainUnchanged<R> {
    RetainUnchanged(reducer)
}

impl<A, S, R> Reducer<A, S> for RetainUnchanged<R>
where
    R: Reducer<A, S>,
    S: PartialEq,
{
    fn reduce(&self, state: Option<&S>, action: ReducerAction<'_, A>) -> S {
        self.0.reduce(state, action)
    }

    fn reduce_shared(&self, state: Option<&Arc<S>>, action: ReducerAction<'_, A>) -> Arc<S> {
        let next = self.0.reduce(state.map(|s| &**s), action);
        match state {
            Some(prior) if **prior == next => Arc::clone(prior),
            _ => Arc::new(next),
        }
    }
}
