//! Store-key maps, the action record, and tagging.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::Dispatchable;
use crate::traits::ActionLike;

/// Partition name → instance name.
///
/// Each keyed reducer reads the entry under its own partition name, so one
/// map can address instances in several keyed reducers at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKeys(BTreeMap<String, String>);

impl StoreKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map addressing a single instance of a single partition.
    pub fn single(partition: impl Into<String>, instance: impl Into<String>) -> Self {
        Self::new().with(partition, instance)
    }

    pub fn with(mut self, partition: impl Into<String>, instance: impl Into<String>) -> Self {
        self.0.insert(partition.into(), instance.into());
        self
    }

    pub fn get(&self, partition: &str) -> Option<&str> {
        self.0.get(partition).map(String::as_str)
    }

    pub fn contains(&self, partition: &str) -> bool {
        self.0.contains_key(partition)
    }

    /// A new map holding every entry of `self` and `overrides`. Entries in
    /// `overrides` win on collision.
    pub fn merge(&self, overrides: &StoreKeys) -> StoreKeys {
        let mut merged = self.0.clone();
        merged.extend(
            overrides
                .0
                .iter()
                .map(|(partition, instance)| (partition.clone(), instance.clone())),
        );
        StoreKeys(merged)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(partition, instance)| (partition.as_str(), instance.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for StoreKeys
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        StoreKeys(
            iter.into_iter()
                .map(|(partition, instance)| (partition.into(), instance.into()))
                .collect(),
        )
    }
}

/// Action metadata. `storeKeys` is the only field this crate reads; anything
/// else is carried through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "storeKeys", default, skip_serializing_if = "Option::is_none")]
    pub store_keys: Option<StoreKeys>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A plain action record: `{ type, payload?, meta?: { storeKeys?, .. } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Action {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
            meta: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set an arbitrary metadata field alongside `storeKeys`.
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta
            .get_or_insert_with(Meta::default)
            .extra
            .insert(key.into(), value);
        self
    }
}

impl ActionLike for Action {
    fn action_type(&self) -> &str {
        &self.action_type
    }

    fn store_keys(&self) -> Option<&StoreKeys> {
        self.meta.as_ref()?.store_keys.as_ref()
    }

    fn with_store_keys(mut self, store_keys: StoreKeys) -> Self {
        self.meta.get_or_insert_with(Meta::default).store_keys = Some(store_keys);
        self
    }
}

/// The store-key map an action is addressed to; empty when it carries none.
pub fn get_store_keys<A: ActionLike>(action: &A) -> StoreKeys {
    action.store_keys().cloned().unwrap_or_default()
}

/// A copy of `action` whose store-key map is its existing map merged with
/// `store_keys`. The input is left as it was.
pub fn tag_action<A: ActionLike>(action: &A, store_keys: &StoreKeys) -> A {
    let merged = get_store_keys(action).merge(store_keys);
    action.clone().with_store_keys(merged)
}

/// Tag a dispatchable. Deferred actions carry no metadata and pass through
/// unchanged; they receive the map at dispatch time instead.
pub fn tag<A: ActionLike, S>(
    action: Dispatchable<A, S>,
    store_keys: &StoreKeys,
) -> Dispatchable<A, S> {
    match action {
        Dispatchable::Action(action) => {
            let merged = get_store_keys(&action).merge(store_keys);
            Dispatchable::Action(action.with_store_keys(merged))
        }
        deferred @ Dispatchable::Deferred(_) => deferred,
    }
}
