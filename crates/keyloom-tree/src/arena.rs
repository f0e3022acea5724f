#![forbid(unsafe_code)]

//! In-memory arena tree with structural-operation counters.
//!
//! Reference implementation of [`NodeTree`] and [`Applicator`], used by the
//! test suites and by embedders that want a headless tree. Nodes live in a
//! flat arena indexed by [`NodeId`]; detached nodes stay alive (and keep
//! their keys and attributes) until the arena is dropped.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Stale `NodeId` from another arena | Panics (index out of bounds) |
//! | `insert_before` with detached reference | Falls back to append |
//! | `replace_node` with detached old node | Ignored |

use std::collections::BTreeMap;

use keyloom_state::{Key, Value};

use crate::{Applicator, NodeId, NodeTree};

/// Node payload: a text unit or an element with attributes and styles.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Text-equivalent node.
    Text(String),
    /// Element node with applied attributes and styles.
    Element {
        /// Tag name.
        tag: String,
        /// Applied attributes, rendered to text.
        attrs: BTreeMap<String, String>,
        /// Applied styles, rendered to text.
        styles: BTreeMap<String, String>,
    },
}

#[derive(Debug)]
struct NodeRec {
    payload: Payload,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    key: Option<Key>,
}

/// Counters for the structural operations a reconciliation pass issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    /// `append_child` calls that attached a node.
    pub appends: usize,
    /// `insert_before` calls.
    pub inserts: usize,
    /// `replace_node` calls that took effect.
    pub replaces: usize,
    /// `remove_node` calls that detached a node.
    pub removes: usize,
}

impl OpCounts {
    /// Total structural operations.
    #[must_use]
    pub fn total(&self) -> usize {
        self.appends + self.inserts + self.replaces + self.removes
    }
}

/// Flat arena of nodes implementing the full capability surface.
#[derive(Debug, Default)]
pub struct ArenaTree {
    nodes: Vec<NodeRec>,
    ops: OpCounts,
    attach_log: Vec<(String, NodeId)>,
}

impl ArenaTree {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(Payload::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            styles: BTreeMap::new(),
        })
    }

    fn push(&mut self, payload: Payload) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u64);
        self.nodes.push(NodeRec {
            payload,
            parent: None,
            children: Vec::new(),
            key: None,
        });
        id
    }

    fn rec(&self, id: NodeId) -> &NodeRec {
        &self.nodes[id.raw() as usize]
    }

    fn rec_mut(&mut self, id: NodeId) -> &mut NodeRec {
        &mut self.nodes[id.raw() as usize]
    }

    /// Detach `node` from its parent without counting a structural op.
    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.rec(node).parent {
            let children = &mut self.rec_mut(parent).children;
            children.retain(|c| *c != node);
            self.rec_mut(node).parent = None;
        }
    }

    /// Structural-operation counters since the last [`Self::reset_ops`].
    #[must_use]
    pub fn ops(&self) -> OpCounts {
        self.ops
    }

    /// Zero the operation counters.
    pub fn reset_ops(&mut self) {
        self.ops = OpCounts::default();
    }

    /// Every `(name, node)` pair the one-time attach hook saw, in order.
    #[must_use]
    pub fn attach_log(&self) -> &[(String, NodeId)] {
        &self.attach_log
    }

    // -- inspection ---------------------------------------------------------

    /// Children of `parent`, left to right.
    #[must_use]
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.rec(parent).children.clone()
    }

    /// Keys of `parent`'s children, left to right.
    #[must_use]
    pub fn child_keys(&self, parent: NodeId) -> Vec<Option<Key>> {
        self.rec(parent)
            .children
            .iter()
            .map(|c| self.rec(*c).key.clone())
            .collect()
    }

    /// Text contents, if `node` is a text node.
    #[must_use]
    pub fn text_of(&self, node: NodeId) -> Option<&str> {
        match &self.rec(node).payload {
            Payload::Text(s) => Some(s),
            Payload::Element { .. } => None,
        }
    }

    /// An applied attribute, if `node` is an element.
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.rec(node).payload {
            Payload::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            Payload::Text(_) => None,
        }
    }

    /// An applied style, if `node` is an element.
    #[must_use]
    pub fn style(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.rec(node).payload {
            Payload::Element { styles, .. } => styles.get(name).map(String::as_str),
            Payload::Text(_) => None,
        }
    }

    /// Whether `node` currently has a parent.
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.rec(node).parent.is_some()
    }
}

impl NodeTree for ArenaTree {
    fn create_text(&mut self, value: &Value) -> NodeId {
        self.push(Payload::Text(value.to_string()))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.rec_mut(parent).children.push(child);
        self.rec_mut(child).parent = Some(parent);
        self.ops.appends += 1;
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: NodeId) {
        self.detach(node);
        let position = self.rec(parent).children.iter().position(|c| *c == reference);
        match position {
            Some(i) => self.rec_mut(parent).children.insert(i, node),
            None => self.rec_mut(parent).children.push(node),
        }
        self.rec_mut(node).parent = Some(parent);
        self.ops.inserts += 1;
    }

    fn replace_node(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.rec(old).parent else {
            return;
        };
        self.detach(new);
        // Old node's slot may have shifted if new was its sibling; look it
        // up after the detach.
        let position = self.rec(parent).children.iter().position(|c| *c == old);
        let Some(i) = position else {
            return;
        };
        self.rec_mut(parent).children[i] = new;
        self.rec_mut(new).parent = Some(parent);
        self.rec_mut(old).parent = None;
        self.ops.replaces += 1;
    }

    fn remove_node(&mut self, node: NodeId) {
        if self.rec(node).parent.is_some() {
            self.detach(node);
            self.ops.removes += 1;
        }
    }

    fn set_key(&mut self, node: NodeId, key: Option<Key>) {
        self.rec_mut(node).key = key;
    }

    fn key(&self, node: NodeId) -> Option<Key> {
        self.rec(node).key.clone()
    }

    fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.rec(node).parent?;
        let children = &self.rec(parent).children;
        let i = children.iter().position(|c| *c == node)?;
        if i == 0 { None } else { Some(children[i - 1]) }
    }

    fn last_child(&self, parent: NodeId) -> Option<NodeId> {
        self.rec(parent).children.last().copied()
    }
}

impl Applicator for ArenaTree {
    fn apply_attr(&mut self, name: &str, value: &Value, node: NodeId) {
        if let Payload::Element { attrs, .. } = &mut self.rec_mut(node).payload {
            attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn apply_style(&mut self, name: &str, value: &Value, node: NodeId) {
        if let Payload::Element { styles, .. } = &mut self.rec_mut(node).payload {
            styles.insert(name.to_string(), value.to_string());
        }
    }

    fn attach(&mut self, name: &str, node: NodeId) {
        self.attach_log.push((name.to_string(), node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(tree: &mut ArenaTree, s: &str) -> NodeId {
        tree.create_text(&Value::from(s))
    }

    #[test]
    fn append_and_inspect() {
        let mut tree = ArenaTree::new();
        let root = tree.create_element("root");
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append_child(root, a);
        tree.append_child(root, b);

        assert_eq!(tree.children(root), vec![a, b]);
        assert_eq!(tree.last_child(root), Some(b));
        assert_eq!(tree.prev_sibling(b), Some(a));
        assert_eq!(tree.prev_sibling(a), None);
        assert_eq!(tree.text_of(a), Some("a"));
        assert_eq!(tree.ops().appends, 2);
    }

    #[test]
    fn insert_before_positions_node() {
        let mut tree = ArenaTree::new();
        let root = tree.create_element("root");
        let a = text(&mut tree, "a");
        let c = text(&mut tree, "c");
        tree.append_child(root, a);
        tree.append_child(root, c);

        let b = text(&mut tree, "b");
        tree.insert_before(root, b, c);
        assert_eq!(tree.children(root), vec![a, b, c]);
    }

    #[test]
    fn attach_operations_move_nodes() {
        let mut tree = ArenaTree::new();
        let root = tree.create_element("root");
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append_child(root, a);
        tree.append_child(root, b);

        // Re-appending a moves it to the end, not duplicates it.
        tree.append_child(root, a);
        assert_eq!(tree.children(root), vec![b, a]);
    }

    #[test]
    fn replace_detaches_old_and_moves_new() {
        let mut tree = ArenaTree::new();
        let root = tree.create_element("root");
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        let c = text(&mut tree, "c");
        tree.append_child(root, a);
        tree.append_child(root, b);
        tree.append_child(root, c);

        // Move c into a's slot.
        tree.replace_node(a, c);
        assert_eq!(tree.children(root), vec![c, b]);
        assert!(!tree.is_attached(a));
        assert!(tree.text_of(a).is_some(), "detached node stays alive");
    }

    #[test]
    fn replace_of_detached_old_is_ignored() {
        let mut tree = ArenaTree::new();
        let root = tree.create_element("root");
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append_child(root, b);

        tree.replace_node(a, b);
        assert_eq!(tree.children(root), vec![b]);
        assert_eq!(tree.ops().replaces, 0);
    }

    #[test]
    fn remove_only_counts_when_attached() {
        let mut tree = ArenaTree::new();
        let root = tree.create_element("root");
        let a = text(&mut tree, "a");
        tree.append_child(root, a);
        tree.remove_node(a);
        tree.remove_node(a);
        assert_eq!(tree.ops().removes, 1);
        assert_eq!(tree.children(root), Vec::<NodeId>::new());
    }

    #[test]
    fn keys_survive_moves() {
        let mut tree = ArenaTree::new();
        let root = tree.create_element("root");
        let a = text(&mut tree, "a");
        tree.set_key(a, Some(Key::from("k")));
        tree.append_child(root, a);
        tree.remove_node(a);
        assert_eq!(tree.key(a), Some(Key::from("k")));
    }

    #[test]
    fn applicator_writes_attrs_and_styles() {
        let mut tree = ArenaTree::new();
        let el = tree.create_element("item");
        tree.apply_attr("title", &Value::from("hello"), el);
        tree.apply_style("color", &Value::from("red"), el);
        tree.attach("title", el);

        assert_eq!(tree.attr(el, "title"), Some("hello"));
        assert_eq!(tree.style(el, "color"), Some("red"));
        assert_eq!(tree.attach_log(), &[("title".to_string(), el)]);
    }

    #[test]
    fn op_counter_reset() {
        let mut tree = ArenaTree::new();
        let root = tree.create_element("root");
        let a = text(&mut tree, "a");
        tree.append_child(root, a);
        assert_eq!(tree.ops().total(), 1);
        tree.reset_ops();
        assert_eq!(tree.ops().total(), 0);
    }
}
