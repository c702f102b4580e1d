//! Integration tests driving keyed reducers through a minimal host store with
//! deferred-action middleware.

use std::sync::{Arc, Mutex};

use keyed_reducer::{
    action_creator, bind_keyed_actions, create_keyed_dispatch, create_keyed_reducer,
    get_store_keys, late_bind_keyed_actions, retain_unchanged, Action, ActionCreator, ActionLike,
    Deferred, Dispatch, Dispatchable, GetState, KeyedReducerOptions, KeyedState, LateBoundAction,
    Reducer, ReducerAction, StoreKeys,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test reducers
// ---------------------------------------------------------------------------

fn incrementer(state: Option<&i64>, action: ReducerAction<'_, Action>) -> i64 {
    let state = state.copied().unwrap_or(0);
    match action.action_type() {
        Some("increment") => state + 1,
        _ => state,
    }
}

fn appender(state: Option<&Vec<String>>, action: ReducerAction<'_, Action>) -> Vec<String> {
    let mut items = state.cloned().unwrap_or_default();
    if let Some(action) = action.action() {
        if action.action_type() == "append" {
            if let Some(item) = action.payload.as_ref().and_then(|p| p.as_str()) {
                items.push(item.to_string());
            }
        }
    }
    items
}

/// Two keyed reducers under different partitions, side by side in one root.
#[derive(Debug, Clone, Default)]
struct RootState {
    counters: KeyedState<i64>,
    lists: KeyedState<Vec<String>>,
}

struct RootReducer<C, L> {
    counters: C,
    lists: L,
}

impl<C, L> Reducer<Action, RootState> for RootReducer<C, L>
where
    C: Reducer<Action, KeyedState<i64>>,
    L: Reducer<Action, KeyedState<Vec<String>>>,
{
    fn reduce(&self, state: Option<&RootState>, action: ReducerAction<'_, Action>) -> RootState {
        RootState {
            counters: self
                .counters
                .reduce(state.map(|s| &s.counters), action),
            lists: self.lists.reduce(state.map(|s| &s.lists), action),
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Minimal host store: holds state, runs the reducer for plain actions, and
/// runs deferred actions with its own dispatch and state accessor.
struct HostStore<St> {
    state: Arc<Mutex<St>>,
    reducer: Arc<dyn Reducer<Action, St>>,
    log: Arc<Mutex<Vec<Action>>>,
}

impl<St: Clone + Send + 'static> HostStore<St> {
    fn new(reducer: impl Reducer<Action, St> + 'static) -> Self {
        let initial = reducer.reduce(None, ReducerAction::Init);
        Self {
            state: Arc::new(Mutex::new(initial)),
            reducer: Arc::new(reducer),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn get_state(&self) -> St {
        self.state.lock().unwrap().clone()
    }

    fn dispatched(&self) -> Vec<Action> {
        self.log.lock().unwrap().clone()
    }

    fn dispatch(&self) -> Dispatch<Action, St> {
        store_dispatch(self.state.clone(), self.reducer.clone(), self.log.clone())
    }
}

fn store_dispatch<St: Clone + Send + 'static>(
    state: Arc<Mutex<St>>,
    reducer: Arc<dyn Reducer<Action, St>>,
    log: Arc<Mutex<Vec<Action>>>,
) -> Dispatch<Action, St> {
    Dispatch::new(move |dispatchable| match dispatchable {
        Dispatchable::Action(action) => {
            let mut guard = state.lock().unwrap();
            let next = reducer.reduce(Some(&*guard), ReducerAction::Action(&action));
            *guard = next;
            log.lock().unwrap().push(action);
            Ok(())
        }
        Dispatchable::Deferred(deferred) => {
            let dispatch = store_dispatch(state.clone(), reducer.clone(), log.clone());
            let accessor_state = state.clone();
            let get_state: GetState<St> =
                Arc::new(move || accessor_state.lock().unwrap().clone());
            deferred.run(dispatch, get_state, &StoreKeys::new())
        }
    })
}

type CounterDeferred = Deferred<Action, KeyedState<i64>>;

fn counter_store(options: KeyedReducerOptions) -> HostStore<KeyedState<i64>> {
    HostStore::new(create_keyed_reducer(incrementer, "counter", options).unwrap())
}

fn increment() -> ActionCreator<(), Action, KeyedState<i64>> {
    action_creator(|()| Dispatchable::Action(Action::new("increment")))
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn default_instance_is_immutable() {
    init_tracing();
    let store = counter_store(KeyedReducerOptions::default());
    assert_eq!(store.get_state().default_instance(), Some(&0));
    assert_eq!(store.get_state().len(), 1);

    let dispatch = store.dispatch();
    dispatch.action(Action::new("increment")).unwrap();
    dispatch.action(Action::new("unknown")).unwrap();

    assert_eq!(store.get_state().default_instance(), Some(&0));
    assert_eq!(store.get_state().len(), 1);
}

#[test]
fn keyed_actions_create_a_new_instance() {
    init_tracing();
    let store = counter_store(KeyedReducerOptions::default());
    let actions = bind_keyed_actions(
        [("onIncrement", increment())],
        StoreKeys::single("counter", "testKey"),
        store.dispatch(),
    )
    .unwrap();

    assert!(!store.get_state().contains("testKey"));

    actions.call("onIncrement", ()).unwrap();
    let state = store.get_state();
    assert_eq!(state.len(), 2);
    assert_eq!(state.get("testKey"), Some(&1));
    assert_eq!(state.default_instance(), Some(&0));

    actions.call("onIncrement", ()).unwrap();
    assert_eq!(store.get_state().get("testKey"), Some(&2));
}

#[test]
fn unkeyed_actions_run_against_every_instance() {
    init_tracing();
    let store = counter_store(KeyedReducerOptions::default());
    let keyed = |instance: &str| {
        create_keyed_dispatch(store.dispatch(), StoreKeys::single("counter", instance))
    };

    keyed("foo").action(Action::new("increment")).unwrap();
    keyed("foo").action(Action::new("increment")).unwrap();
    keyed("bar").action(Action::new("increment")).unwrap();
    keyed("baz").action(Action::new("increment")).unwrap();
    store.dispatch().action(Action::new("increment")).unwrap();

    let state = store.get_state();
    assert_eq!(state.get("foo"), Some(&3));
    assert_eq!(state.get("bar"), Some(&2));
    assert_eq!(state.get("baz"), Some(&2));
    assert_eq!(state.default_instance(), Some(&0));
}

#[test]
fn unkeyed_actions_skip_key_required_reducers() {
    init_tracing();
    let store = counter_store(KeyedReducerOptions::default().with_key_required(true));
    let actions = bind_keyed_actions(
        [("onIncrement", increment())],
        StoreKeys::single("counter", "testKey"),
        store.dispatch(),
    )
    .unwrap();

    actions.call("onIncrement", ()).unwrap();
    actions.call("onIncrement", ()).unwrap();
    store.dispatch().action(Action::new("increment")).unwrap();

    assert_eq!(store.get_state().get("testKey"), Some(&2));
}

#[test]
fn deferred_creators_get_store_keys_as_third_argument() {
    init_tracing();
    let store = counter_store(KeyedReducerOptions::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_creator = seen.clone();
    let creator: ActionCreator<(), Action, KeyedState<i64>> = action_creator(move |()| {
        let seen = seen_in_creator.clone();
        Dispatchable::Deferred(CounterDeferred::new(move |dispatch, get_state, store_keys| {
            seen.lock().unwrap().push(store_keys.clone());
            let before = get_state().get("testKey").copied();
            assert_eq!(before, None);
            dispatch.action(Action::new("increment"))
        }))
    });

    let actions = bind_keyed_actions(
        [("onIncrement", creator)],
        StoreKeys::single("counter", "testKey"),
        store.dispatch(),
    )
    .unwrap();
    actions.call("onIncrement", ()).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![StoreKeys::single("counter", "testKey")]
    );
    assert_eq!(store.get_state().get("testKey"), Some(&1));
}

#[test]
fn deferred_actions_can_branch_on_instance() {
    init_tracing();
    let store = counter_store(KeyedReducerOptions::default());
    let creator: ActionCreator<(), Action, KeyedState<i64>> = action_creator(|()| {
        Dispatchable::Deferred(CounterDeferred::new(|dispatch, _get_state, store_keys| {
            let times = if store_keys.get("counter") == Some("double") { 2 } else { 1 };
            for _ in 0..times {
                dispatch.action(Action::new("increment"))?;
            }
            Ok(())
        }))
    });
    let actions = late_bind_keyed_actions(
        [(
            "onIncrement",
            LateBoundAction::new(creator, "counter").unwrap(),
        )],
        store.dispatch(),
    );

    actions.for_instance("onIncrement", "single").unwrap().call(()).unwrap();
    actions.for_instance("onIncrement", "double").unwrap().call(()).unwrap();

    let state = store.get_state();
    assert_eq!(state.get("single"), Some(&1));
    assert_eq!(state.get("double"), Some(&2));
}

#[test]
fn errors_inside_deferred_actions_reach_the_caller() {
    init_tracing();
    let store = counter_store(KeyedReducerOptions::default());
    let keyed = create_keyed_dispatch(store.dispatch(), StoreKeys::single("counter", "foo"));

    let err = keyed
        .deferred(Deferred::new(|dispatch, _get_state, _store_keys| {
            dispatch.action(Action::new("increment"))?;
            anyhow::bail!("gave up halfway")
        }))
        .unwrap_err();

    assert_eq!(err.to_string(), "gave up halfway");
    assert_eq!(store.get_state().get("foo"), Some(&1));
}

#[test]
fn one_action_can_address_several_partitions() {
    init_tracing();
    let root = RootReducer {
        counters: create_keyed_reducer(incrementer, "counter", KeyedReducerOptions::default())
            .unwrap(),
        lists: create_keyed_reducer(appender, "list", KeyedReducerOptions::default()).unwrap(),
    };
    let store = HostStore::new(root);

    let counter_and_list = create_keyed_dispatch(
        store.dispatch(),
        StoreKeys::single("counter", "a").with("list", "x"),
    );
    counter_and_list.action(Action::new("increment")).unwrap();
    counter_and_list
        .action(Action::new("append").with_payload(json!("first")))
        .unwrap();

    let list_only = create_keyed_dispatch(store.dispatch(), StoreKeys::single("list", "y"));
    list_only
        .action(Action::new("append").with_payload(json!("second")))
        .unwrap();

    let state = store.get_state();
    assert_eq!(state.counters.get("a"), Some(&1));
    assert_eq!(state.lists.get("x"), Some(&vec!["first".to_string()]));
    assert_eq!(state.lists.get("y"), Some(&vec!["second".to_string()]));
    // Instance names are per partition.
    assert!(!state.counters.contains("x"));
    assert!(!state.counters.contains("y"));
}

#[test]
fn nested_keyed_dispatches_merge_store_keys() {
    init_tracing();
    let store = counter_store(KeyedReducerOptions::default());
    let outer = create_keyed_dispatch(store.dispatch(), StoreKeys::single("list", "x"));
    let inner = create_keyed_dispatch(outer, StoreKeys::single("counter", "foo"));

    inner
        .action(Action::new("increment").with_meta("source", json!("test")))
        .unwrap();

    let dispatched = store.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].action_type(), "increment");
    assert_eq!(
        serde_json::to_value(&dispatched[0]).unwrap(),
        json!({
            "type": "increment",
            "meta": {
                "source": "test",
                "storeKeys": { "counter": "foo", "list": "x" }
            }
        })
    );
    assert_eq!(
        get_store_keys(&dispatched[0]),
        StoreKeys::single("counter", "foo").with("list", "x")
    );
    assert_eq!(store.get_state().get("foo"), Some(&1));
}

#[test]
fn ignored_broadcasts_keep_instance_state_shared() {
    init_tracing();
    let store: HostStore<KeyedState<i64>> = HostStore::new(
        create_keyed_reducer(
            retain_unchanged(incrementer),
            "counter",
            KeyedReducerOptions::default(),
        )
        .unwrap(),
    );
    let foo = create_keyed_dispatch(store.dispatch(), StoreKeys::single("counter", "foo"));
    foo.action(Action::new("increment")).unwrap();
    let before = store.get_state();

    store.dispatch().action(Action::new("unrelated")).unwrap();
    let after = store.get_state();
    assert!(Arc::ptr_eq(
        before.get_shared("foo").unwrap(),
        after.get_shared("foo").unwrap()
    ));

    store.dispatch().action(Action::new("increment")).unwrap();
    let bumped = store.get_state();
    assert_eq!(bumped.get("foo"), Some(&2));
    assert!(!Arc::ptr_eq(
        after.get_shared("foo").unwrap(),
        bumped.get_shared("foo").unwrap()
    ));
}
