#![forbid(unsafe_code)]

//! Fine-grained reactive state for Keyloom.
//!
//! This crate holds the leaf components: the dynamic [`Value`] model with
//! its identity [`Key`]s, the [`StateContainer`] (ordered change
//! notification, guarded observers, key-scoped selection channel,
//! dotted-path access), and the cooperative [`Scheduler`] used for work
//! deferred past the current dispatch round.
//!
//! Single-threaded by design: one logical writer, synchronous dispatch,
//! `Rc`/`RefCell` shared state. Bindings and the keyed-list reconciler live
//! in `keyloom-bind`; the node-tree capability surface lives in
//! `keyloom-tree`.

pub mod container;
pub mod error;
#[cfg(feature = "json")]
mod json;
mod path;
pub mod scheduler;
pub mod value;

pub use container::{StateContainer, Subscription, WeakStateContainer};
pub use error::StateError;
pub use scheduler::Scheduler;
pub use value::{Key, Value};
