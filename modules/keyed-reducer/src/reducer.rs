//! The keyed reducer: one wrapped reducer, many named instances of its state.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::action::get_store_keys;
use crate::error::{KeyedError, Result};
use crate::traits::{ActionLike, Reducer, ReducerAction};

/// Reserved instance name. Always present once the reducer has run, and only
/// changed by actions that target it explicitly.
pub const DEFAULT_INSTANCE: &str = "default";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyedReducerOptions {
    /// When set, untargeted actions are not applied to any instance.
    pub is_key_required: bool,
}

impl KeyedReducerOptions {
    pub fn with_key_required(mut self, is_key_required: bool) -> Self {
        self.is_key_required = is_key_required;
        self
    }
}

/// Instance name → state.
///
/// Each transition produces a new map. Instances a transition did not change
/// are shared with the previous map, as far as the wrapped reducer reports
/// "no change" through [`Reducer::reduce_shared`].
pub struct KeyedState<S> {
    instances: BTreeMap<String, Arc<S>>,
}

impl<S> KeyedState<S> {
    pub fn new() -> Self {
        Self {
            instances: BTreeMap::new(),
        }
    }

    pub fn get(&self, instance: &str) -> Option<&S> {
        self.instances.get(instance).map(Arc::as_ref)
    }

    /// The shared handle for an instance, for identity comparisons across
    /// transitions.
    pub fn get_shared(&self, instance: &str) -> Option<&Arc<S>> {
        self.instances.get(instance)
    }

    pub fn default_instance(&self) -> Option<&S> {
        self.get(DEFAULT_INSTANCE)
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.instances.contains_key(instance)
    }

    pub fn instance_names(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &S)> {
        self.instances
            .iter()
            .map(|(name, state)| (name.as_str(), state.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Whether both maps hold the very same instance handles.
    fn shares_instances(&self, other: &KeyedState<S>) -> bool {
        self.instances.len() == other.instances.len()
            && self
                .instances
                .iter()
                .zip(other.instances.iter())
                .all(|((a_name, a), (b_name, b))| a_name == b_name && Arc::ptr_eq(a, b))
    }

    fn insert(&mut self, instance: &str, state: S) {
        self.instances.insert(instance.to_string(), Arc::new(state));
    }
}

impl<S> Default for KeyedState<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for KeyedState<S> {
    fn clone(&self) -> Self {
        Self {
            instances: self.instances.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for KeyedState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<S: PartialEq> PartialEq for KeyedState<S> {
    fn eq(&self, other: &Self) -> bool {
        self.instances == other.instances
    }
}

/// Wraps a reducer so its state is held per instance, addressed by the entry
/// under `store_key` in each action's store-key map.
///
/// Targeted actions reach exactly one instance, creating it on first use.
/// Untargeted actions are broadcast to every instance except the default one,
/// unless the reducer was built with `is_key_required`.
pub struct KeyedReducer<R, A, S> {
    reducer: R,
    store_key: String,
    options: KeyedReducerOptions,
    _phantom: PhantomData<fn(A) -> S>,
}

impl<R, A, S> KeyedReducer<R, A, S>
where
    R: Reducer<A, S>,
{
    pub fn builder() -> KeyedReducerBuilder<R, A, S> {
        KeyedReducerBuilder::new()
    }

    /// The partition name this reducer answers to.
    pub fn store_key(&self) -> &str {
        &self.store_key
    }

    pub fn options(&self) -> KeyedReducerOptions {
        self.options
    }
}

impl<R, A, S> Reducer<A, KeyedState<S>> for KeyedReducer<R, A, S>
where
    R: Reducer<A, S>,
    A: ActionLike,
{
    fn reduce(
        &self,
        state: Option<&KeyedState<S>>,
        action: ReducerAction<'_, A>,
    ) -> KeyedState<S> {
        let store_keys = action.action().map(get_store_keys).unwrap_or_default();
        let mut next = state.cloned().unwrap_or_default();

        if !next.contains(DEFAULT_INSTANCE) {
            debug!(store_key = %self.store_key, "materializing default instance");
            next.insert(DEFAULT_INSTANCE, self.reducer.reduce(None, ReducerAction::Init));
        }

        if let Some(instance) = store_keys.get(&self.store_key) {
            let prior = next.get_shared(instance).cloned();
            if prior.is_none() {
                debug!(store_key = %self.store_key, instance, "creating instance");
            }
            trace!(
                store_key = %self.store_key,
                instance,
                action_type = ?action.action_type(),
                "applying targeted action"
            );
            let updated = self.reducer.reduce_shared(prior.as_ref(), action);
            next.instances.insert(instance.to_string(), updated);
            return next;
        }

        if self.options.is_key_required {
            trace!(
                store_key = %self.store_key,
                action_type = ?action.action_type(),
                "untargeted action ignored, key required"
            );
            return next;
        }

        trace!(
            store_key = %self.store_key,
            action_type = ?action.action_type(),
            instances = next.len() - 1,
            "broadcasting action"
        );
        for (name, instance) in next.instances.iter_mut() {
            if name == DEFAULT_INSTANCE {
                continue;
            }
            *instance = self.reducer.reduce_shared(Some(&*instance), action);
        }

        next
    }

    fn reduce_shared(
        &self,
        state: Option<&Arc<KeyedState<S>>>,
        action: ReducerAction<'_, A>,
    ) -> Arc<KeyedState<S>> {
        let next = self.reduce(state.map(|s| &**s), action);
        match state {
            Some(prior) if prior.shares_instances(&next) => Arc::clone(prior),
            _ => Arc::new(next),
        }
    }
}

impl<R, A, S> fmt::Debug for KeyedReducer<R, A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedReducer")
            .field("store_key", &self.store_key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Step-by-step construction of a [`KeyedReducer`]. `build` rejects missing
/// or malformed arguments before anything is constructed.
pub struct KeyedReducerBuilder<R, A, S> {
    reducer: Option<R>,
    store_key: Option<String>,
    options: KeyedReducerOptions,
    _phantom: PhantomData<fn(A) -> S>,
}

impl<R, A, S> KeyedReducerBuilder<R, A, S>
where
    R: Reducer<A, S>,
{
    pub fn new() -> Self {
        Self {
            reducer: None,
            store_key: None,
            options: KeyedReducerOptions::default(),
            _phantom: PhantomData,
        }
    }

    pub fn reducer(mut self, reducer: R) -> Self {
        self.reducer = Some(reducer);
        self
    }

    pub fn store_key(mut self, store_key: impl Into<String>) -> Self {
        self.store_key = Some(store_key.into());
        self
    }

    pub fn options(mut self, options: KeyedReducerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn key_required(mut self, is_key_required: bool) -> Self {
        self.options.is_key_required = is_key_required;
        self
    }

    pub fn build(self) -> Result<KeyedReducer<R, A, S>> {
        let reducer = self.reducer.ok_or_else(|| {
            KeyedError::invalid_argument("Expected the first argument to be a function.")
        })?;
        let store_key = self.store_key.ok_or_else(|| {
            KeyedError::invalid_argument("Expected the second argument to be a string.")
        })?;
        validate_store_key(&store_key)?;

        Ok(KeyedReducer {
            reducer,
            store_key,
            options: self.options,
            _phantom: PhantomData,
        })
    }
}

impl<R, A, S> Default for KeyedReducerBuilder<R, A, S>
where
    R: Reducer<A, S>,
{
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn validate_store_key(store_key: &str) -> Result<()> {
    if store_key.trim().is_empty() {
        return Err(KeyedError::invalid_argument(
            "Expected the second argument to be a non-empty string.",
        ));
    }
    Ok(())
}

/// Wrap `reducer` so its state is partitioned by the instance named under
/// `store_key` in each action's store-key map.
pub fn create_keyed_reducer<R, A, S>(
    reducer: R,
    store_key: &str,
    options: KeyedReducerOptions,
) -> Result<KeyedReducer<R, A, S>>
where
    R: Reducer<A, S>,
{
    KeyedReducer::builder()
        .reducer(reducer)
        .store_key(store_key)
        .options(options)
        .build()
}
