//! Keyed reducers.
//!
//! Partitions one reducer's state into named instances. Actions pick their
//! instance through a store-key map in their metadata
//! (`meta.storeKeys[partition] = instance`); actions without an entry for a
//! reducer's partition are broadcast to all of its non-default instances.
//!
//! A keyed dispatch tags everything that passes through it with a fixed
//! store-key map. Deferred (function-valued) actions are rewrapped so any
//! dispatch they perform is tagged the same way, and they receive the map as
//! an explicit argument.
//!
//! The host store and its deferred-action middleware live outside this crate;
//! they only need to speak the `Reducer` and `Dispatch` protocols.

pub mod action;
pub mod bind;
pub mod dispatch;
pub mod error;
pub mod reducer;
pub mod traits;

pub use action::{get_store_keys, tag, tag_action, Action, Meta, StoreKeys};
pub use bind::{
    action_creator, bind_keyed_action, bind_keyed_actions, late_bind_keyed_actions,
    ActionCreator, BoundActionCreator, BoundActionCreators, LateBoundAction,
    LateBoundActionCreator, LateBoundActionCreators,
};
pub use dispatch::{
    create_keyed_dispatch, Deferred, Dispatch, Dispatchable, GetState, KeyedDispatch,
};
pub use error::{KeyedError, Result};
pub use reducer::{
    create_keyed_reducer, KeyedReducer, KeyedReducerBuilder, KeyedReducerOptions, KeyedState,
    DEFAULT_INSTANCE,
};
pub use traits::{retain_unchanged, ActionLike, Reducer, ReducerAction, RetainUnchanged};
