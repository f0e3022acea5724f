//! Property-based invariant tests for containers, paths, and the scheduler.
//!
//! These must hold for any valid inputs:
//!
//! 1. `set()` stores exactly what it was given; `get()` returns it.
//! 2. One `set()` notifies each observer exactly once, in subscription
//!    order, with the correct `(new, old)` pair.
//! 3. `set_path(p, v, true)` followed by `get_path(p)` yields `v`.
//! 4. Path validation is total: any string either splits cleanly or fails
//!    with `InvalidPath`, never panics.
//! 5. Scheduler ticks run tasks in FIFO order and drain completely.
//! 6. Primitive key derivation is deterministic.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use keyloom_state::{Key, Scheduler, StateContainer, StateError, Value};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

fn primitive_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Str),
    ]
}

fn value_tree() -> impl Strategy<Value = Value> {
    primitive_value().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(Value::Object),
        ]
    })
}

fn path_segments() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z]{1,8}", 1..5)
}

// ── Properties ────────────────────────────────────────────────────────────

proptest! {
    // Invariant 1: set stores exactly its argument.
    #[test]
    fn set_get_roundtrip(initial in value_tree(), next in value_tree()) {
        let state = StateContainer::new(initial);
        let stored = state.set(next.clone()).unwrap();
        prop_assert_eq!(&stored, &next);
        prop_assert_eq!(state.get(), next);
    }

    // Invariant 2: one notification per observer per set, in order.
    #[test]
    fn observers_fire_once_each_in_order(
        initial in value_tree(),
        next in value_tree(),
        observers in 1usize..6,
    ) {
        let state = StateContainer::new(initial.clone());
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..observers {
            let log = Rc::clone(&log);
            let _sub = state.subscribe(move |new, old| {
                log.borrow_mut().push((tag, new.clone(), old.clone()));
            });
        }

        state.set(next.clone()).unwrap();
        let log = log.borrow();
        prop_assert_eq!(log.len(), observers);
        for (i, (tag, new, old)) in log.iter().enumerate() {
            prop_assert_eq!(*tag, i);
            prop_assert_eq!(new, &next);
            prop_assert_eq!(old, &initial);
        }
    }

    // Invariant 3: a filled path write reads back the written value.
    #[test]
    fn set_path_then_get_path_roundtrip(
        segments in path_segments(),
        value in value_tree(),
    ) {
        let state = StateContainer::new(Value::Object(BTreeMap::new()));
        let path = segments.join(".");
        state.set_path(&path, value.clone(), true).unwrap();
        prop_assert_eq!(state.get_path(&path), Ok(Some(value)));
    }

    // Invariant 4: arbitrary path strings never panic.
    #[test]
    fn path_parsing_is_total(path in ".{0,24}") {
        let state = StateContainer::new(Value::Object(BTreeMap::new()));
        match state.get_path(&path) {
            Ok(_) | Err(StateError::InvalidPath) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    // Invariant 5: FIFO order, full drain.
    #[test]
    fn scheduler_runs_fifo_and_drains(count in 0usize..16) {
        let sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..count {
            let log = Rc::clone(&log);
            sched.defer(move || log.borrow_mut().push(i));
        }
        prop_assert_eq!(sched.run_tick(), count);
        prop_assert_eq!(sched.pending(), 0);
        let expected: Vec<usize> = (0..count).collect();
        prop_assert_eq!(&*log.borrow(), &expected);
    }

    // Invariant 6: same primitive, same key.
    #[test]
    fn primitive_keys_are_deterministic(value in primitive_value()) {
        prop_assert_eq!(Key::for_primitive(&value), Key::for_primitive(&value));
        prop_assert!(Key::for_primitive(&value).is_some());
    }
}
