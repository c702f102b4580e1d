//! Action creators pre-wired to a keyed dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::action::StoreKeys;
use crate::dispatch::{create_keyed_dispatch, Dispatch, Dispatchable};
use crate::error::{KeyedError, Result};
use crate::reducer::validate_store_key;
use crate::traits::ActionLike;

/// Builds a plain or deferred action from its arguments.
pub type ActionCreator<P, A, S> = Arc<dyn Fn(P) -> Dispatchable<A, S> + Send + Sync>;

pub fn action_creator<P, A, S, F>(create: F) -> ActionCreator<P, A, S>
where
    F: Fn(P) -> Dispatchable<A, S> + Send + Sync + 'static,
{
    Arc::new(create)
}

/// An action creator whose result is dispatched as soon as it is called.
pub struct BoundActionCreator<P, A, S> {
    creator: ActionCreator<P, A, S>,
    dispatch: Dispatch<A, S>,
}

impl<P, A, S> BoundActionCreator<P, A, S> {
    pub fn call(&self, args: P) -> anyhow::Result<()> {
        self.dispatch.dispatch((self.creator)(args))
    }
}

impl<P, A, S> Clone for BoundActionCreator<P, A, S> {
    fn clone(&self) -> Self {
        Self {
            creator: Arc::clone(&self.creator),
            dispatch: self.dispatch.clone(),
        }
    }
}

impl<P, A, S> fmt::Debug for BoundActionCreator<P, A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundActionCreator").finish_non_exhaustive()
    }
}

/// A named set of bound action creators.
pub struct BoundActionCreators<P, A, S> {
    bound: BTreeMap<String, BoundActionCreator<P, A, S>>,
}

impl<P, A, S> BoundActionCreators<P, A, S> {
    pub fn get(&self, name: &str) -> Option<&BoundActionCreator<P, A, S>> {
        self.bound.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bound.keys().map(String::as_str)
    }

    pub fn call(&self, name: &str, args: P) -> anyhow::Result<()> {
        let bound = self
            .get(name)
            .ok_or_else(|| KeyedError::UnknownActionCreator(name.to_string()))?;
        bound.call(args)
    }
}

impl<P, A, S> fmt::Debug for BoundActionCreators<P, A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.bound.keys()).finish()
    }
}

/// Bind one action creator to a keyed dispatch for `store_keys`.
pub fn bind_keyed_action<P, A, S>(
    creator: ActionCreator<P, A, S>,
    store_keys: StoreKeys,
    dispatch: Dispatch<A, S>,
) -> BoundActionCreator<P, A, S>
where
    A: ActionLike,
    S: 'static,
{
    BoundActionCreator {
        creator,
        dispatch: create_keyed_dispatch(dispatch, store_keys),
    }
}

/// Bind every creator in `action_creators` to a keyed dispatch for
/// `store_keys`. All of them share the same keyed dispatch.
pub fn bind_keyed_actions<I, K, P, A, S>(
    action_creators: I,
    store_keys: StoreKeys,
    dispatch: Dispatch<A, S>,
) -> Result<BoundActionCreators<P, A, S>>
where
    I: IntoIterator<Item = (K, ActionCreator<P, A, S>)>,
    K: Into<String>,
    A: ActionLike,
    S: 'static,
{
    let creators: BTreeMap<String, ActionCreator<P, A, S>> = action_creators
        .into_iter()
        .map(|(name, creator)| (name.into(), creator))
        .collect();
    if creators.is_empty() {
        return Err(KeyedError::invalid_argument(
            "Expected a non-empty map of action creators.",
        ));
    }

    let keyed = create_keyed_dispatch(dispatch, store_keys);
    let bound = creators
        .into_iter()
        .map(|(name, creator)| {
            let bound = BoundActionCreator {
                creator,
                dispatch: keyed.clone(),
            };
            (name, bound)
        })
        .collect();

    Ok(BoundActionCreators { bound })
}

/// An action creator paired with the partition it targets. The instance is
/// chosen later, at call time.
pub struct LateBoundAction<P, A, S> {
    action: ActionCreator<P, A, S>,
    store_key: String,
}

impl<P, A, S> LateBoundAction<P, A, S> {
    pub fn new(action: ActionCreator<P, A, S>, store_key: impl Into<String>) -> Result<Self> {
        let store_key = store_key.into();
        validate_store_key(&store_key)?;
        Ok(Self { action, store_key })
    }

    pub fn store_key(&self) -> &str {
        &self.store_key
    }
}

pub struct LateBoundActionCreator<P, A, S> {
    action: ActionCreator<P, A, S>,
    store_key: String,
    dispatch: Dispatch<A, S>,
}

impl<P, A, S> LateBoundActionCreator<P, A, S>
where
    A: ActionLike,
    S: 'static,
{
    /// The action creator bound to `instance_name` within this creator's
    /// partition.
    pub fn for_instance(&self, instance_name: impl Into<String>) -> BoundActionCreator<P, A, S> {
        let store_keys = StoreKeys::single(self.store_key.clone(), instance_name);
        BoundActionCreator {
            creator: Arc::clone(&self.action),
            dispatch: create_keyed_dispatch(self.dispatch.clone(), store_keys),
        }
    }

    pub fn store_key(&self) -> &str {
        &self.store_key
    }
}

pub struct LateBoundActionCreators<P, A, S> {
    creators: BTreeMap<String, LateBoundActionCreator<P, A, S>>,
}

impl<P, A, S> LateBoundActionCreators<P, A, S>
where
    A: ActionLike,
    S: 'static,
{
    pub fn get(&self, name: &str) -> Option<&LateBoundActionCreator<P, A, S>> {
        self.creators.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    pub fn for_instance(
        &self,
        name: &str,
        instance_name: impl Into<String>,
    ) -> Result<BoundActionCreator<P, A, S>> {
        let creator = self
            .get(name)
            .ok_or_else(|| KeyedError::UnknownActionCreator(name.to_string()))?;
        Ok(creator.for_instance(instance_name))
    }
}

/// Pair each late-bound action with `dispatch`. No instance is chosen yet.
pub fn late_bind_keyed_actions<I, K, P, A, S>(
    late_bound: I,
    dispatch: Dispatch<A, S>,
) -> LateBoundActionCreators<P, A, S>
where
    I: IntoIterator<Item = (K, LateBoundAction<P, A, S>)>,
    K: Into<String>,
{
    let creators = late_bound
        .into_iter()
        .map(|(name, LateBoundAction { action, store_key })| {
            let creator = LateBoundActionCreator {
                action,
                store_key,
                dispatch: dispatch.clone(),
            };
            (name.into(), creator)
        })
        .collect();

    LateBoundActionCreators { creators }
}
