#![forbid(unsafe_code)]

//! The node capability surface bindings render against.
//!
//! The reconciler and the binders never touch a concrete tree type; they
//! work through [`NodeTree`], which is exactly the small contract they
//! need: create a text unit, append, insert-before, replace, remove, tag a
//! node with an identity [`Key`], and read a node's previous sibling or a
//! parent's last child. Attribute and style application goes through the
//! separate [`Applicator`] surface.
//!
//! [`ArenaTree`] is the in-memory reference implementation, instrumented
//! with structural-operation counters so tests can assert minimality.

pub mod arena;

pub use arena::{ArenaTree, OpCounts};

use keyloom_state::{Key, Value};

/// Stable handle to a node. Plain index, never an owning pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id. Backends mint these; bindings only pass them around.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Structural capabilities a node backend must supply.
///
/// Attach operations (`append_child`, `insert_before`, `replace_node`) must
/// first detach the node from any prior position, so a single call moves a
/// node. `replace_node` detaches the old node but must not destroy it; the
/// reconciler may re-attach it later in the same pass.
pub trait NodeTree {
    /// Create a detached text-equivalent node rendering `value`.
    fn create_text(&mut self, value: &Value) -> NodeId;
    /// Attach `child` as the last child of `parent`.
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    /// Attach `node` immediately before `reference` under `parent`.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: NodeId);
    /// Put `new` where `old` currently sits; `old` is detached. Ignored
    /// when `old` is not attached anywhere.
    fn replace_node(&mut self, old: NodeId, new: NodeId);
    /// Detach `node` from its parent, if attached.
    fn remove_node(&mut self, node: NodeId);
    /// Write the identity tag. Used only for matching during
    /// reconciliation, never for rendering.
    fn set_key(&mut self, node: NodeId, key: Option<Key>);
    /// Read the identity tag.
    fn key(&self, node: NodeId) -> Option<Key>;
    /// The sibling immediately left of `node`, if any.
    fn prev_sibling(&self, node: NodeId) -> Option<NodeId>;
    /// The last child of `parent`, if any.
    fn last_child(&self, parent: NodeId) -> Option<NodeId>;
}

/// Attribute and style application surface.
///
/// `attach` is the one-time hook invoked when a bound attribute or style is
/// first applied to a concrete node; after it runs, the binding's producer
/// is subscribed and re-applies through `apply_attr` / `apply_style` on
/// every change.
pub trait Applicator {
    /// Apply an attribute value to a node.
    fn apply_attr(&mut self, name: &str, value: &Value, node: NodeId);
    /// Apply a style value to a node.
    fn apply_style(&mut self, name: &str, value: &Value, node: NodeId);
    /// One-time notification that a bound attribute/style now targets
    /// `node` under `name`.
    fn attach(&mut self, name: &str, node: NodeId) {
        let _ = (name, node);
    }
}
