//! Reactivity behavior through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_runtime::reactivity::{is_proxy, is_reactive, is_readonly, readonly, shallow_readonly};
use spark_runtime::{
    computed, effect, effect_with, proxy_refs, reactive, ref_value, stop, to_raw, unref, Array,
    EffectOptions, Object, Value,
};

#[test]
fn test_reactive_reads_match_raw_and_wrap_nested() {
    let nested = Object::new().with("bar", 2);
    let original = Object::new().with("foo", 1).with("nested", nested.clone());
    let observed = reactive(original.clone());

    assert!(!Value::from(observed.clone()).same(&Value::from(original.clone())));
    assert!(observed.get("foo").same(&original.get("foo")));

    let inner = observed.get("nested");
    assert!(is_reactive(&inner), "nested objects are wrapped on read");
    assert!(to_raw(&inner).same(&Value::from(nested)));
    assert!(observed.has("foo"));
    assert!(!observed.has("missing"));
}

#[test]
fn test_effect_tracks_reactive_writes() {
    let user = reactive(Object::new().with("age", 10));
    let seen = Rc::new(Cell::new(0i64));

    let (u, s) = (user.clone(), seen.clone());
    let _runner = effect(move || s.set(u.get("age").as_i64().unwrap_or(-1)));
    assert_eq!(seen.get(), 10);

    user.set("age", 11);
    assert_eq!(seen.get(), 11);
}

#[test]
fn test_array_push_triggers_length_readers() {
    let list = reactive(Array::from_vec(vec![Value::from(1)]));
    let lengths = Rc::new(RefCell::new(Vec::new()));

    let (l, out) = (list.clone(), lengths.clone());
    let _runner = effect(move || out.borrow_mut().push(l.len()));

    list.push(2);
    list.push(3);
    assert_eq!(*lengths.borrow(), vec![1, 2, 3]);
}

#[test]
fn test_ref_same_value_does_not_trigger() {
    let count = ref_value(1);
    let runs = Rc::new(Cell::new(0));

    let (c, r) = (count.clone(), runs.clone());
    let _runner = effect(move || {
        c.get();
        r.set(r.get() + 1);
    });
    assert_eq!(runs.get(), 1);

    count.set(1);
    assert_eq!(runs.get(), 1, "unchanged write must not re-run");

    count.set(2);
    assert_eq!(runs.get(), 2, "changed write runs exactly once");
    count.set(3);
    assert_eq!(runs.get(), 3);
}

#[test]
fn test_ref_holding_object_is_deeply_reactive() {
    let state = ref_value(Object::new().with("count", 1));
    let seen = Rc::new(Cell::new(0i64));

    let (st, s) = (state.clone(), seen.clone());
    let _runner = effect(move || {
        if let Some(obj) = st.get().as_reactive() {
            s.set(obj.get("count").as_i64().unwrap_or(-1));
        }
    });
    assert_eq!(seen.get(), 1);

    if let Some(obj) = state.get().as_reactive() {
        obj.set("count", 2);
    }
    assert_eq!(seen.get(), 2);
}

#[test]
fn test_computed_runs_once_per_invalidation() {
    let source = ref_value(1);
    let calls = Rc::new(Cell::new(0));

    let (s, c) = (source.clone(), calls.clone());
    let doubled = computed(move || {
        c.set(c.get() + 1);
        s.get().as_i64().unwrap_or(0) * 2
    });

    for _ in 0..3 {
        assert_eq!(doubled.get(), 2);
    }
    assert_eq!(calls.get(), 1);

    source.set(2);
    source.set(3);
    assert_eq!(calls.get(), 1, "recompute waits for the next read");
    assert_eq!(doubled.get(), 6);
    assert_eq!(doubled.get(), 6);
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_stop_and_manual_run() {
    let count = ref_value(0);
    let seen = Rc::new(Cell::new(0i64));

    let (c, s) = (count.clone(), seen.clone());
    let runner = effect(move || s.set(c.get().as_i64().unwrap_or(-1)));

    count.set(1);
    assert_eq!(seen.get(), 1);

    stop(&runner);
    assert!(!runner.is_active());
    count.set(2);
    assert_eq!(seen.get(), 1, "stopped effect must not re-run");

    runner.run();
    assert_eq!(seen.get(), 2, "manual run still executes");
    count.set(3);
    assert_eq!(seen.get(), 2);
}

#[test]
fn test_scheduler_replaces_rerun() {
    let count = ref_value(0);
    let runs = Rc::new(Cell::new(0));
    let scheduled = Rc::new(Cell::new(0));

    let (c, r) = (count.clone(), runs.clone());
    let sch = scheduled.clone();
    let runner = effect_with(
        move || {
            c.get();
            r.set(r.get() + 1);
        },
        EffectOptions {
            scheduler: Some(Rc::new(move || sch.set(sch.get() + 1))),
            on_stop: None,
        },
    );
    assert_eq!(runs.get(), 1);

    count.set(1);
    assert_eq!(runs.get(), 1);
    assert_eq!(scheduled.get(), 1);

    runner.run();
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_readonly_write_is_ignored() {
    let original = Object::new().with("foo", 1).with("bar", Object::new().with("baz", 2));
    let wrapped = readonly(original.clone());

    wrapped.set("foo", 2);
    assert_eq!(wrapped.get("foo"), Value::Int(1));
    assert_eq!(original.get("foo"), Value::Int(1));
    assert!(is_readonly(&wrapped.get("bar")), "readonly is deep");

    let shallow = shallow_readonly(original);
    assert!(!is_proxy(&shallow.get("bar")), "shallow leaves nested values raw");
}

#[test]
fn test_proxy_refs_unwraps_and_writes_through() {
    let age = ref_value(10);
    let state = proxy_refs(Object::new().with("age", age.clone()).with("name", "x"));

    assert_eq!(state.get("age"), Value::Int(10));
    assert_eq!(state.get("name"), Value::from("x"));

    state.set("age", 20);
    assert_eq!(age.get(), Value::Int(20));

    let replacement = ref_value(30);
    state.set("age", replacement.clone());
    assert_eq!(state.get("age"), Value::Int(30));
    assert_eq!(age.get(), Value::Int(20));
    assert_eq!(unref(&Value::from(replacement)), Value::Int(30));
}
