#![forbid(unsafe_code)]

//! Reactive state container with ordered change notification and a
//! key-scoped selection channel.
//!
//! # Design
//!
//! [`StateContainer`] is a cheap-clone handle over shared, reference-counted
//! storage (`Rc<RefCell<..>>`). Every `set()` stores the new value, runs the
//! guarded-observer round (the attachment point for children bindings, which
//! may veto the update), then notifies every plain observer with
//! `(new, old)` in registration order — even when the new value equals the
//! old one.
//!
//! # Invariants
//!
//! 1. Plain observers registered at dispatch start fire exactly once per
//!    `set()`, in subscription order.
//! 2. A guarded-observer error rolls the stored value back to the pre-`set`
//!    snapshot before the error is returned; plain observers do not fire for
//!    a vetoed update.
//! 3. Re-entrant `set()` from inside an observer nests: the inner dispatch
//!    round completes before the outer round resumes at its next observer.
//! 4. `select(k)` fires the previously selected key's observers (deselect),
//!    then `k`'s observers (select); each registry at most once per call.
//! 5. The parent link is metadata only, held weakly; it is never an
//!    ownership edge.
//!
//! # Failure Modes
//!
//! - Cancelling a subscription does not interrupt a dispatch round already
//!   in progress; the callback may fire one final time within that round.
//! - Direct mutation of values obtained from `get()` (shared `Handle`s)
//!   bypasses notification. Contract-preserving mutation goes through
//!   `set()` / `patch()` / `set_path()`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::StateError;
use crate::value::{Key, Value};

/// Process-wide container id counter. Ids are used for identity keys and
/// parent-link bookkeeping, never for ordering.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type ChangeFn = Rc<dyn Fn(&Value, &Value)>;
type GuardFn = Rc<dyn Fn(&Value, &Value) -> Result<(), StateError>>;
type SelectFn = Rc<dyn Fn(bool)>;

struct Entry<F> {
    token: u64,
    callback: F,
}

pub(crate) struct Inner {
    value: Value,
    initial: Value,
    observers: Vec<Entry<ChangeFn>>,
    guarded: Vec<Entry<GuardFn>>,
    next_token: u64,
    selected: Option<Key>,
    select_observers: HashMap<Key, Vec<Entry<SelectFn>>>,
    parent_link: Option<(WeakStateContainer, Key)>,
}

/// The reactive state holder.
///
/// Cloning a `StateContainer` produces a second handle to the same inner
/// state; both handles share value, observers, and selection.
pub struct StateContainer {
    id: u64,
    inner: Rc<RefCell<Inner>>,
}

impl Clone for StateContainer {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Rc::clone(&self.inner),
        }
    }
}

impl PartialEq for StateContainer {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("StateContainer")
            .field("id", &self.id)
            .field("observers", &inner.observers.len())
            .field("selected", &inner.selected)
            .finish_non_exhaustive()
    }
}

impl StateContainer {
    /// Create a container with an initial value. The value is also kept as
    /// the construction-time snapshot for `reset(true)`.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            inner: Rc::new(RefCell::new(Inner {
                initial: value.clone(),
                value,
                observers: Vec::new(),
                guarded: Vec::new(),
                next_token: 1,
                selected: None,
                select_observers: HashMap::new(),
                parent_link: None,
            })),
        }
    }

    /// Process-unique container id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current value. `Handle`s inside the value share their containers, so
    /// this is a by-handle read, not a deep copy of wrapped items.
    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.borrow().value.clone()
    }

    /// Store a new value and notify.
    ///
    /// Guarded observers run first, in registration order; if one fails the
    /// previous value is restored and the error returned — plain observers
    /// never see the vetoed value. Otherwise every plain observer fires once
    /// with `(new, old)`, in subscription order, even when `new == old`.
    /// Returns the stored value.
    pub fn set(&self, value: Value) -> Result<Value, StateError> {
        let old = {
            let mut inner = self.inner.borrow_mut();
            std::mem::replace(&mut inner.value, value.clone())
        };

        let guards: Vec<GuardFn> = {
            let inner = self.inner.borrow();
            inner.guarded.iter().map(|e| Rc::clone(&e.callback)).collect()
        };
        for guard in guards {
            if let Err(err) = guard(&value, &old) {
                self.inner.borrow_mut().value = old;
                return Err(err);
            }
        }

        let observers: Vec<ChangeFn> = {
            let inner = self.inner.borrow();
            inner.observers.iter().map(|e| Rc::clone(&e.callback)).collect()
        };
        for observer in observers {
            observer(&value, &old);
        }
        Ok(self.get())
    }

    /// Subscribe to value changes. The callback receives `(new, old)`.
    ///
    /// Returns a [`Subscription`] token; [`Subscription::cancel`] removes
    /// this one registration, idempotently. The registration stays live
    /// until cancelled or the container is `reset`.
    pub fn subscribe(&self, callback: impl Fn(&Value, &Value) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let token = inner.next_token;
        inner.next_token += 1;
        inner.observers.push(Entry {
            token,
            callback: Rc::new(callback),
        });
        Subscription {
            token,
            registry: Registry::Change,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Subscribe a guarded observer. Guarded observers run before plain
    /// observers on every `set()` and may veto the update by returning an
    /// error, which rolls the value back. This is the attachment point for
    /// children bindings.
    pub fn subscribe_guarded(
        &self,
        callback: impl Fn(&Value, &Value) -> Result<(), StateError> + 'static,
    ) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let token = inner.next_token;
        inner.next_token += 1;
        inner.guarded.push(Entry {
            token,
            callback: Rc::new(callback),
        });
        Subscription {
            token,
            registry: Registry::Guard,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Shallow-merge an object into the current object value, then `set()`.
    pub fn patch(&self, partial: Value) -> Result<Value, StateError> {
        let Value::Object(fields) = partial else {
            return Err(StateError::NotAnObject);
        };
        let mut current = self.get();
        {
            let Value::Object(map) = &mut current else {
                return Err(StateError::NotAnObject);
            };
            for (k, v) in fields {
                map.insert(k, v);
            }
        }
        self.set(current)
    }

    // -- selection channel --------------------------------------------------

    /// Select `key`. Fires the previously selected key's observers with
    /// `false` (unless it equals `key`), then `key`'s observers with `true`.
    pub fn select(&self, key: impl Into<Key>) {
        let key = key.into();
        let previous = {
            let mut inner = self.inner.borrow_mut();
            let previous = inner.selected.take();
            inner.selected = Some(key.clone());
            previous
        };
        if let Some(prev) = previous {
            if prev != key {
                self.fire_select(&prev, false);
            }
        }
        self.fire_select(&key, true);
    }

    /// Currently selected key, if any.
    #[must_use]
    pub fn selected(&self) -> Option<Key> {
        self.inner.borrow().selected.clone()
    }

    /// Subscribe to the selection channel for one key. The callback fires
    /// with `true` when the key becomes selected and `false` when it stops
    /// being selected.
    pub fn subscribe_select(&self, key: Key, callback: impl Fn(bool) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let token = inner.next_token;
        inner.next_token += 1;
        inner
            .select_observers
            .entry(key.clone())
            .or_default()
            .push(Entry {
                token,
                callback: Rc::new(callback),
            });
        Subscription {
            token,
            registry: Registry::Select(key),
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Drop every selection observer registered for `key`. Used by the
    /// reconciler when the item carrying `key` leaves the collection.
    pub fn purge_select(&self, key: &Key) {
        let mut inner = self.inner.borrow_mut();
        inner.select_observers.remove(key);
    }

    fn fire_select(&self, key: &Key, selected: bool) {
        let callbacks: Vec<SelectFn> = {
            let inner = self.inner.borrow();
            match inner.select_observers.get(key) {
                Some(entries) => entries.iter().map(|e| Rc::clone(&e.callback)).collect(),
                None => Vec::new(),
            }
        };
        for cb in callbacks {
            cb(selected);
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Clear every registry: plain observers, guarded observers, and
    /// selection observers. When `reinitialize`, silently restore the
    /// construction-time value.
    pub fn reset(&self, reinitialize: bool) {
        let mut inner = self.inner.borrow_mut();
        inner.observers.clear();
        inner.guarded.clear();
        inner.select_observers.clear();
        inner.selected = None;
        if reinitialize {
            inner.value = inner.initial.clone();
        }
    }

    /// Run `f` over the stored value without notifying anyone.
    ///
    /// This is the canonicalization seam the reconciler uses to wrap
    /// collection items into `Handle`s in place. It deliberately bypasses
    /// notification; anything else should go through `set()`.
    pub fn canonicalize(&self, f: impl FnOnce(&mut Value)) {
        f(&mut self.inner.borrow_mut().value);
    }

    // -- parent link --------------------------------------------------------

    /// Record this item's enclosing container and its own key within it.
    /// Metadata only; the reference is weak and never an ownership edge.
    pub fn link_parent(&self, parent: &StateContainer, key: Key) {
        self.inner.borrow_mut().parent_link = Some((parent.downgrade(), key));
    }

    /// The recorded parent link, if any.
    #[must_use]
    pub fn parent_link(&self) -> Option<(WeakStateContainer, Key)> {
        self.inner.borrow().parent_link.clone()
    }

    /// Downgrade to a weak handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakStateContainer {
        WeakStateContainer {
            id: self.id,
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Weak handle to a [`StateContainer`]. Used for parent links and for
/// observer closures that must not keep their own container alive.
#[derive(Clone)]
pub struct WeakStateContainer {
    id: u64,
    inner: Weak<RefCell<Inner>>,
}

impl WeakStateContainer {
    /// Id of the container this handle points at (valid even after drop).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Upgrade to a strong handle, if the container is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<StateContainer> {
        self.inner.upgrade().map(|inner| StateContainer {
            id: self.id,
            inner,
        })
    }
}

impl std::fmt::Debug for WeakStateContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakStateContainer")
            .field("id", &self.id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

enum Registry {
    Change,
    Guard,
    Select(Key),
}

/// Unsubscribe token returned by the `subscribe*` family.
///
/// `cancel()` removes the one registration it stands for, idempotently.
/// Dropping the token does nothing; registrations live until cancelled or
/// the container is `reset`.
pub struct Subscription {
    token: u64,
    registry: Registry,
    inner: Weak<RefCell<Inner>>,
}

impl Subscription {
    /// Remove the registration. Calling this more than once, or after the
    /// container was dropped or reset, is a no-op.
    pub fn cancel(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.borrow_mut();
        match &self.registry {
            Registry::Change => inner.observers.retain(|e| e.token != self.token),
            Registry::Guard => inner.guarded.retain(|e| e.token != self.token),
            Registry::Select(key) => {
                let empty = match inner.select_observers.get_mut(key) {
                    Some(entries) => {
                        entries.retain(|e| e.token != self.token);
                        entries.is_empty()
                    }
                    None => false,
                };
                if empty {
                    inner.select_observers.remove(key);
                }
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
