//! Property-based invariant tests for keyed-list reconciliation.
//!
//! These must hold for any sequence of distinct string keys:
//!
//! 1. After a pass, the children's keys equal the collection's keys, in
//!    order.
//! 2. A pass over an unchanged collection issues zero structural ops.
//! 3. Units are identity-stable: a key that survives a permutation keeps
//!    its node.
//! 4. Structural work is linear: one pass issues at most `2n + removed`
//!    operations.
//! 5. Shrinking to a subset detaches exactly the departed keys' nodes.
//! 6. No panics across arbitrary update sequences.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use keyloom_bind::{Bind, Host};
use keyloom_state::{Key, Scheduler, StateContainer, Value};
use keyloom_tree::{Applicator, ArenaTree, NodeId, NodeTree};
use proptest::prelude::*;

// ── Harness ───────────────────────────────────────────────────────────────

struct Fixture {
    arena: Rc<RefCell<ArenaTree>>,
    root: NodeId,
    rows: StateContainer,
}

fn fixture(initial: &[String]) -> Fixture {
    let arena = Rc::new(RefCell::new(ArenaTree::new()));
    let tree: Rc<RefCell<dyn NodeTree>> = arena.clone();
    let applicator: Rc<RefCell<dyn Applicator>> = arena.clone();
    let host = Host::new(tree, applicator, Scheduler::new());
    let root = arena.borrow_mut().create_element("list");
    let rows = StateContainer::new(to_value(initial));
    rows.bind_children(
        &host,
        root,
        Rc::new(|item, host| host.tree().borrow_mut().create_text(&item.get())),
        None,
        None,
    )
    .unwrap();
    Fixture { arena, root, rows }
}

fn to_value(keys: &[String]) -> Value {
    Value::list(keys.iter().map(|k| Value::from(k.as_str())))
}

fn child_keys(f: &Fixture) -> Vec<Key> {
    f.arena
        .borrow()
        .child_keys(f.root)
        .into_iter()
        .flatten()
        .collect()
}

fn nodes_by_key(f: &Fixture) -> HashMap<Key, NodeId> {
    let arena = f.arena.borrow();
    arena
        .children(f.root)
        .into_iter()
        .filter_map(|n| arena.key(n).map(|k| (k, n)))
        .collect()
}

// ── Strategies ────────────────────────────────────────────────────────────

fn distinct_keys(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::hash_set("[a-z]{1,6}", 0..max)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn keys_and_permutation() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    distinct_keys(10).prop_flat_map(|keys| {
        let original = keys.clone();
        Just(keys)
            .prop_shuffle()
            .prop_map(move |shuffled| (original.clone(), shuffled))
    })
}

fn keys_and_subset() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    distinct_keys(10).prop_flat_map(|keys| {
        let original = keys.clone();
        proptest::collection::vec(proptest::bool::ANY, keys.len()).prop_map(move |mask| {
            let subset = original
                .iter()
                .zip(&mask)
                .filter(|(_, keep)| **keep)
                .map(|(k, _)| k.clone())
                .collect();
            (original.clone(), subset)
        })
    })
}

// ── Properties ────────────────────────────────────────────────────────────

proptest! {
    // Invariant 1: children mirror the collection, in order.
    #[test]
    fn children_match_collection_order((initial, next) in keys_and_permutation()) {
        let f = fixture(&initial);
        f.rows.set(to_value(&next)).unwrap();
        let expected: Vec<Key> = next.iter().map(|k| Key::Str(k.clone())).collect();
        prop_assert_eq!(child_keys(&f), expected);
    }

    // Invariant 2: an unchanged collection reconciles with zero ops.
    #[test]
    fn unchanged_pass_is_structurally_silent(initial in distinct_keys(10)) {
        let f = fixture(&initial);
        f.arena.borrow_mut().reset_ops();
        f.rows.set(f.rows.get()).unwrap();
        prop_assert_eq!(f.arena.borrow().ops().total(), 0);
    }

    // Invariant 3: surviving keys keep their nodes across a permutation.
    #[test]
    fn permutation_preserves_unit_identity((initial, next) in keys_and_permutation()) {
        let f = fixture(&initial);
        let before = nodes_by_key(&f);
        f.rows.set(to_value(&next)).unwrap();
        let after = nodes_by_key(&f);
        prop_assert_eq!(before, after);
    }

    // Invariant 4: structural work stays linear in the collection size.
    #[test]
    fn pass_issues_linearly_many_ops((initial, next) in keys_and_subset()) {
        let f = fixture(&initial);
        f.arena.borrow_mut().reset_ops();
        f.rows.set(to_value(&next)).unwrap();
        let removed = initial.len().saturating_sub(next.len());
        let bound = 2 * next.len() + removed;
        prop_assert!(f.arena.borrow().ops().total() <= bound);
    }

    // Invariant 5: shrinking detaches exactly the departed keys.
    #[test]
    fn subset_detaches_departed_keys((initial, subset) in keys_and_subset()) {
        let f = fixture(&initial);
        let before = nodes_by_key(&f);
        f.rows.set(to_value(&subset)).unwrap();
        let arena = f.arena.borrow();
        for key in &initial {
            let key = Key::Str(key.clone());
            let node = before[&key];
            prop_assert_eq!(arena.is_attached(node), subset.contains(&key.to_string()));
        }
    }

    // Invariant 6: arbitrary update sequences never panic and end consistent.
    #[test]
    fn update_sequences_stay_consistent(
        initial in distinct_keys(8),
        updates in proptest::collection::vec(distinct_keys(8), 1..5),
    ) {
        let f = fixture(&initial);
        for next in &updates {
            f.rows.set(to_value(next)).unwrap();
        }
        let last = updates.last().unwrap();
        let expected: Vec<Key> = last.iter().map(|k| Key::Str(k.clone())).collect();
        prop_assert_eq!(child_keys(&f), expected);
    }
}
