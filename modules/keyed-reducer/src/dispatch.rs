//! Dispatch functions, deferred actions, and the keyed dispatch wrapper.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::trace;

use crate::action::{tag, StoreKeys};
use crate::traits::ActionLike;

/// Reads the host store's current state. Supplied to deferred actions by the
/// host's deferred-action middleware.
pub type GetState<S> = Arc<dyn Fn() -> S + Send + Sync>;

type DeferredFn<A, S> =
    Box<dyn FnOnce(Dispatch<A, S>, GetState<S>, &StoreKeys) -> Result<()> + Send>;

/// A function-valued action.
///
/// When run it receives a dispatch function, a state accessor, and the
/// store-key map it was dispatched under. Outside any keyed dispatch that map
/// is empty.
pub struct Deferred<A, S> {
    run: DeferredFn<A, S>,
}

impl<A: 'static, S: 'static> Deferred<A, S> {
    pub fn new<F>(run: F) -> Self
    where
        F: FnOnce(Dispatch<A, S>, GetState<S>, &StoreKeys) -> Result<()> + Send + 'static,
    {
        Self { run: Box::new(run) }
    }

    pub fn run(
        self,
        dispatch: Dispatch<A, S>,
        get_state: GetState<S>,
        store_keys: &StoreKeys,
    ) -> Result<()> {
        (self.run)(dispatch, get_state, store_keys)
    }
}

impl<A, S> fmt::Debug for Deferred<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

/// Anything a dispatch function accepts.
pub enum Dispatchable<A, S> {
    Action(A),
    Deferred(Deferred<A, S>),
}

impl<A, S> Dispatchable<A, S> {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Dispatchable::Deferred(_))
    }
}

impl<A, S> From<Deferred<A, S>> for Dispatchable<A, S> {
    fn from(deferred: Deferred<A, S>) -> Self {
        Dispatchable::Deferred(deferred)
    }
}

impl<A: fmt::Debug, S> fmt::Debug for Dispatchable<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatchable::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Dispatchable::Deferred(deferred) => {
                f.debug_tuple("Deferred").field(deferred).finish()
            }
        }
    }
}

/// A dispatch function. Cheap to clone; clones share the same target.
pub struct Dispatch<A, S> {
    inner: Arc<dyn Fn(Dispatchable<A, S>) -> Result<()> + Send + Sync>,
}

impl<A, S> Dispatch<A, S> {
    pub fn new<F>(dispatch: F) -> Self
    where
        F: Fn(Dispatchable<A, S>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(dispatch),
        }
    }

    pub fn dispatch(&self, action: Dispatchable<A, S>) -> Result<()> {
        (self.inner)(action)
    }

    /// Dispatch a plain action.
    pub fn action(&self, action: A) -> Result<()> {
        self.dispatch(Dispatchable::Action(action))
    }

    /// Dispatch a deferred action.
    pub fn deferred(&self, deferred: Deferred<A, S>) -> Result<()> {
        self.dispatch(Dispatchable::Deferred(deferred))
    }
}

impl<A, S> Clone for Dispatch<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, S> fmt::Debug for Dispatch<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}

/// Wraps a base dispatch so everything passing through it is addressed to a
/// fixed store-key map.
///
/// Plain actions are tagged before being forwarded. Deferred actions are
/// wrapped so that, once the host middleware runs them, they receive a keyed
/// dispatch bound to the same map and the map itself as their third argument.
pub struct KeyedDispatch<A, S> {
    base: Dispatch<A, S>,
    store_keys: StoreKeys,
}

impl<A: ActionLike, S: 'static> KeyedDispatch<A, S> {
    pub fn new(base: Dispatch<A, S>, store_keys: StoreKeys) -> Self {
        Self { base, store_keys }
    }

    pub fn store_keys(&self) -> &StoreKeys {
        &self.store_keys
    }

    pub fn dispatch(&self, action: Dispatchable<A, S>) -> Result<()> {
        match action {
            Dispatchable::Deferred(deferred) => {
                trace!(store_keys = ?self.store_keys, "wrapping deferred action");
                let base = self.base.clone();
                let store_keys = self.store_keys.clone();
                let wrapped = Deferred::new(move |_dispatch, get_state, _outer_keys| {
                    let keyed = create_keyed_dispatch(base, store_keys.clone());
                    deferred.run(keyed, get_state, &store_keys)
                });
                self.base.deferred(wrapped)
            }
            Dispatchable::Action(action) => {
                trace!(
                    action_type = action.action_type(),
                    store_keys = ?self.store_keys,
                    "tagging action"
                );
                self.base
                    .dispatch(tag(Dispatchable::Action(action), &self.store_keys))
            }
        }
    }

    pub fn into_dispatch(self) -> Dispatch<A, S> {
        Dispatch::new(move |action| self.dispatch(action))
    }
}

impl<A, S> Clone for KeyedDispatch<A, S> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            store_keys: self.store_keys.clone(),
        }
    }
}

/// A dispatch function that tags every action with `store_keys` before
/// handing it to `base`.
pub fn create_keyed_dispatch<A: ActionLike, S: 'static>(
    base: Dispatch<A, S>,
    store_keys: StoreKeys,
) -> Dispatch<A, S> {
    KeyedDispatch::new(base, store_keys).into_dispatch()
}
