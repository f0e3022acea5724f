#![forbid(unsafe_code)]

//! Fine-grained reactive state with keyed-list reconciliation.
//!
//! Keyloom is three layers, re-exported here as one surface:
//!
//! - [`keyloom_state`]: [`StateContainer`] (ordered observers, selection
//!   channel, dotted-path access), the dynamic [`Value`] model, and the
//!   cooperative [`Scheduler`].
//! - [`keyloom_tree`]: the [`NodeTree`] / [`Applicator`] capability
//!   surface and the instrumented [`ArenaTree`] reference backend.
//! - [`keyloom_bind`]: the [`Bind`] trait putting unit, attribute, style,
//!   selection, and keyed-children bindings on every container.
//!
//! ```
//! use keyloom::{ArenaTree, Bind, Host, NodeTree, Scheduler, StateContainer, Value};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let arena = Rc::new(RefCell::new(ArenaTree::new()));
//! let host = Host::new(arena.clone(), arena.clone(), Scheduler::new());
//! let root = arena.borrow_mut().create_element("list");
//!
//! let rows = StateContainer::new(Value::list([
//!     Value::from("alpha"),
//!     Value::from("beta"),
//! ]));
//! rows.bind_children(
//!     &host,
//!     root,
//!     Rc::new(|item, host| host.tree().borrow_mut().create_text(&item.get())),
//!     None,
//!     None,
//! )
//! .unwrap();
//! assert_eq!(arena.borrow().children(root).len(), 2);
//! ```

pub use keyloom_bind::{
    AttrProducer, Bind, BoundAttr, BoundStyle, DynValue, Host, ItemRenderFn, ItemUpdateFn, KeyFn,
    RenderFn, SelectAttrProducer, SelectRenderFn, SelectUpdateFn, UpdateFn,
};
pub use keyloom_state::{
    Key, Scheduler, StateContainer, StateError, Subscription, Value, WeakStateContainer,
};
pub use keyloom_tree::{Applicator, ArenaTree, NodeId, NodeTree, OpCounts};
