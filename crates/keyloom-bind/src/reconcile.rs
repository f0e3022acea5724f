#![forbid(unsafe_code)]

//! Keyed-list reconciliation.
//!
//! A children binding keeps one parent node's children synchronized with an
//! ordered collection value. Every update runs a single right-to-left pass
//! that reuses units by key and issues only the structural operations the
//! reorder actually needs — never a clear-and-rebuild, and never a
//! re-render of an item whose key persists.
//!
//! # Invariants
//!
//! 1. Keys among the live items of one binding are pairwise unique; a
//!    duplicate vetoes the whole `set()` (value rolled back, no structural
//!    change from this binding).
//! 2. After a successful pass, the parent's children are exactly the
//!    collection's items, in collection order.
//! 3. A pass over an unchanged collection issues zero structural
//!    operations.
//! 4. Structural work is O(n) in the collection length.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Duplicate key | `set()` fails with `DuplicateKey`, value restored |
//! | No key function, structured items | Positional keys, `warn!` once |
//! | Collection replaced by scalar | Pass skipped, `warn!`, corrective re-wrap next tick |

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use keyloom_state::{Key, StateContainer, StateError, Subscription, Value};
use keyloom_tree::{NodeId, NodeTree};
use tracing::warn;

use crate::host::Host;

/// Renders a unit for one collection item (always a wrapped container).
pub type ItemRenderFn = Rc<dyn Fn(&StateContainer, &Host) -> NodeId>;
/// Refreshes an existing unit after its item container changed.
pub type ItemUpdateFn = Rc<dyn Fn(NodeId, &StateContainer, &Host)>;
/// Derives the identity key from an item's value.
pub type KeyFn = Rc<dyn Fn(&Value) -> Key>;

/// One rendered unit tracked by a bind context.
struct LiveUnit {
    node: NodeId,
    /// Id of the item container this unit is wired to.
    item_id: u64,
    /// The item-container observer keeping the unit fresh.
    item_sub: Subscription,
}

/// One `bind_children` attachment: render/update functions, the parent
/// node, and the exclusively-owned live-units map.
struct BindContext {
    render: ItemRenderFn,
    update: Option<ItemUpdateFn>,
    key_fn: Option<KeyFn>,
    parent_node: NodeId,
    host: Host,
    live: HashMap<Key, LiveUnit>,
    warned_positional: bool,
}

/// Attach a children binding: synchronize `parent_node`'s children with
/// `container`'s collection value, now and after every `set()`.
///
/// The initial pass runs immediately; a duplicate key in the initial
/// collection is fatal (the error propagates and no binding is attached —
/// there is no earlier snapshot to roll back to). Afterwards the binding
/// lives until the container is `reset`.
pub(crate) fn bind_children(
    container: &StateContainer,
    host: &Host,
    parent_node: NodeId,
    render: ItemRenderFn,
    update: Option<ItemUpdateFn>,
    key_fn: Option<KeyFn>,
) -> Result<(), StateError> {
    let ctx = Rc::new(RefCell::new(BindContext {
        render,
        update,
        key_fn,
        parent_node,
        host: host.clone(),
        live: HashMap::new(),
        warned_positional: false,
    }));

    reconcile(&ctx, container)?;

    let weak = container.downgrade();
    let ctx = Rc::clone(&ctx);
    container.subscribe_guarded(move |_new, _old| {
        let Some(parent) = weak.upgrade() else {
            return Ok(());
        };
        reconcile(&ctx, &parent)
    });
    Ok(())
}

/// One full reconciliation pass for `ctx` against `parent`'s value.
fn reconcile(ctx: &Rc<RefCell<BindContext>>, parent: &StateContainer) -> Result<(), StateError> {
    let (render, update, parent_node, host) = {
        let b = ctx.borrow();
        (
            Rc::clone(&b.render),
            b.update.clone(),
            b.parent_node,
            b.host.clone(),
        )
    };

    // Shape check: a collection binding whose value became a scalar skips
    // the pass and re-wraps on the next tick.
    if !parent.get().is_list() {
        warn!(
            container = parent.id(),
            "children binding got a non-collection value; wrapping as a one-element collection next tick"
        );
        let weak = parent.downgrade();
        host.scheduler().defer(move || {
            let Some(container) = weak.upgrade() else {
                return;
            };
            let value = container.get();
            if !value.is_list() {
                if let Err(err) = container.set(Value::List(vec![value])) {
                    warn!(error = %err, "corrective collection re-wrap failed");
                }
            }
        });
        return Ok(());
    }

    // Step 1a: wrap every item in its own container, in place. `fresh`
    // marks items wrapped on this pass.
    let mut items: Vec<(StateContainer, bool)> = Vec::new();
    parent.canonicalize(|value| {
        if let Value::List(list) = value {
            for item in list.iter_mut() {
                match item {
                    Value::Handle(existing) => items.push((existing.clone(), false)),
                    other => {
                        let wrapped = StateContainer::new(std::mem::replace(other, Value::Null));
                        *other = Value::Handle(wrapped.clone());
                        items.push((wrapped, true));
                    }
                }
            }
        }
    });

    // Steps 1b + 2: key computation and duplicate check. A duplicate vetoes
    // the update before any structural change.
    let keys = compute_keys(ctx, parent, &items)?;

    // Step 3: empty collection clears everything.
    if items.is_empty() {
        let drained: Vec<(Key, LiveUnit)> = ctx.borrow_mut().live.drain().collect();
        for (key, unit) in drained {
            host.tree().borrow_mut().remove_node(unit.node);
            unit.item_sub.cancel();
            parent.purge_select(&key);
        }
        return Ok(());
    }

    let key_set: HashSet<&Key> = keys.iter().collect();

    // Step 4: placement, last item first. `prev` is the unit placed in the
    // previous iteration, i.e. the current unit's right neighbor.
    let mut prev: Option<NodeId> = None;
    let mut placed: HashMap<Key, LiveUnit> = HashMap::with_capacity(items.len());
    for i in (0..items.len()).rev() {
        let key = &keys[i];
        let item = &items[i].0;
        item.link_parent(parent, key.clone());

        let existing = ctx.borrow_mut().live.remove(key);
        let (unit, is_new) = match existing {
            Some(mut unit) => {
                if unit.item_id != item.id() {
                    // Same key, different container: rewire the refresh
                    // observer and refresh the content in place if we can.
                    unit.item_sub.cancel();
                    unit.item_sub = wire_item(ctx, key, item);
                    unit.item_id = item.id();
                    if let Some(update) = &update {
                        update(unit.node, item, &host);
                    }
                }
                (unit, false)
            }
            None => {
                let node = render(item, &host);
                host.tree().borrow_mut().set_key(node, Some(key.clone()));
                let item_sub = wire_item(ctx, key, item);
                (
                    LiveUnit {
                        node,
                        item_id: item.id(),
                        item_sub,
                    },
                    true,
                )
            }
        };
        let node = unit.node;

        match prev {
            None => {
                let mut tree = host.tree().borrow_mut();
                let last = tree.last_child(parent_node);
                let already_last = match last {
                    Some(l) => tree.key(l).as_ref() == Some(key),
                    None => false,
                };
                if !already_last {
                    tree.append_child(parent_node, node);
                }
            }
            Some(reference) => {
                let sibling = host.tree().borrow().prev_sibling(reference);
                match sibling {
                    None => {
                        host.tree()
                            .borrow_mut()
                            .insert_before(parent_node, node, reference);
                    }
                    Some(sibling) if sibling == node => {
                        // Already in position.
                    }
                    Some(sibling) => {
                        let sibling_key = host.tree().borrow().key(sibling);
                        let stale = match &sibling_key {
                            Some(k) => !key_set.contains(k),
                            None => true,
                        };
                        if stale {
                            // The occupant's key left the collection: drop
                            // its unit and take its slot.
                            if let Some(k) = &sibling_key {
                                let dead = ctx.borrow_mut().live.remove(k);
                                if let Some(dead) = dead {
                                    dead.item_sub.cancel();
                                }
                                parent.purge_select(k);
                            }
                            host.tree().borrow_mut().replace_node(sibling, node);
                        } else if is_new {
                            host.tree()
                                .borrow_mut()
                                .insert_before(parent_node, node, reference);
                        } else {
                            // Pre-existing unit out of position: a move.
                            host.tree().borrow_mut().replace_node(sibling, node);
                        }
                    }
                }
            }
        }

        prev = Some(node);
        placed.insert(key.clone(), unit);
    }

    // Step 5: stray cleanup. Anything still in the old map has no key in
    // the new collection.
    let strays: Vec<(Key, LiveUnit)> = ctx.borrow_mut().live.drain().collect();
    for (key, unit) in strays {
        host.tree().borrow_mut().remove_node(unit.node);
        unit.item_sub.cancel();
        parent.purge_select(&key);
    }
    ctx.borrow_mut().live = placed;
    Ok(())
}

/// Derive every item's key and reject duplicates.
fn compute_keys(
    ctx: &Rc<RefCell<BindContext>>,
    parent: &StateContainer,
    items: &[(StateContainer, bool)],
) -> Result<Vec<Key>, StateError> {
    let key_fn = ctx.borrow().key_fn.clone();
    let mut warned = ctx.borrow().warned_positional;
    let mut keys = Vec::with_capacity(items.len());
    let mut seen: HashSet<Key> = HashSet::with_capacity(items.len());

    for (i, (item, fresh)) in items.iter().enumerate() {
        let key = match &key_fn {
            Some(f) => f(&item.get()),
            None => {
                let value = item.get();
                match Key::for_primitive(&value) {
                    Some(key) => key,
                    None if !*fresh => {
                        // Pre-wrapped structured item: keep the key recorded
                        // on a previous pass, else key by container identity.
                        let recorded = item.parent_link().and_then(|(weak, key)| {
                            if weak.id() == parent.id() { Some(key) } else { None }
                        });
                        recorded.unwrap_or(Key::Ident(item.id()))
                    }
                    None => {
                        if !warned {
                            warn!(
                                container = parent.id(),
                                index = i,
                                "no key function for structured items; using positional keys (unstable under reordering)"
                            );
                            warned = true;
                        }
                        Key::Index(i)
                    }
                }
            }
        };
        if !seen.insert(key.clone()) {
            return Err(StateError::DuplicateKey(key));
        }
        keys.push(key);
    }
    ctx.borrow_mut().warned_positional = warned;
    Ok(keys)
}

/// Subscribe an item container so its own `set()` calls refresh its unit:
/// update-in-place when the context has an update function, deferred
/// re-render-and-swap (key tag carried over) when it does not.
fn wire_item(ctx: &Rc<RefCell<BindContext>>, key: &Key, item: &StateContainer) -> Subscription {
    let weak_ctx = Rc::downgrade(ctx);
    let weak_item = item.downgrade();
    let key = key.clone();
    item.subscribe(move |_new, _old| {
        let Some(ctx) = weak_ctx.upgrade() else {
            return;
        };
        let (update, host) = {
            let b = ctx.borrow();
            (b.update.clone(), b.host.clone())
        };
        let node = ctx.borrow().live.get(&key).map(|unit| unit.node);
        let Some(node) = node else {
            return;
        };
        match update {
            Some(update) => {
                let Some(item) = weak_item.upgrade() else {
                    return;
                };
                update(node, &item, &host);
            }
            None => {
                let weak_ctx = weak_ctx.clone();
                let weak_item = weak_item.clone();
                let key = key.clone();
                host.scheduler().defer(move || {
                    let Some(ctx) = weak_ctx.upgrade() else {
                        return;
                    };
                    let Some(item) = weak_item.upgrade() else {
                        return;
                    };
                    let (render, host) = {
                        let b = ctx.borrow();
                        (Rc::clone(&b.render), b.host.clone())
                    };
                    let old_node = ctx.borrow().live.get(&key).map(|unit| unit.node);
                    let Some(old_node) = old_node else {
                        return;
                    };
                    let fresh = render(&item, &host);
                    {
                        let mut tree = host.tree().borrow_mut();
                        let tag = tree.key(old_node);
                        tree.set_key(fresh, tag);
                        tree.replace_node(old_node, fresh);
                    }
                    if let Some(unit) = ctx.borrow_mut().live.get_mut(&key) {
                        unit.node = fresh;
                    }
                });
            }
        }
    })
}
