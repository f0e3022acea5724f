#![forbid(unsafe_code)]

//! Single-unit bindings: value-bound, attribute-bound, style-bound, and
//! selection-bound.
//!
//! Every binding attaches an observer that produces or refreshes exactly
//! one rendered unit. Two refresh modes exist:
//!
//! - **update-in-place**: an update function mutates the existing unit
//!   synchronously inside the triggering `set()`;
//! - **re-render-and-swap**: with no update function, a fresh unit is
//!   rendered and swapped in for the old one, carrying over the old unit's
//!   key tag. The swap is deferred one scheduler tick so the state
//!   transition's other synchronous observers finish first.
//!
//! Attribute and style bindings are values, not attachments: constructing
//! one does nothing until the external element factory `attach`es it to a
//! concrete node and name, at which point the applicator's one-time attach
//! hook runs, the current value is applied, and the producer is subscribed
//! for re-application on every change.

use std::rc::Rc;

use keyloom_state::{StateContainer, StateError, Subscription, Value};
use keyloom_tree::{Applicator, NodeId, NodeTree};

use crate::host::Host;

/// Renders a unit from a value.
pub type RenderFn = Rc<dyn Fn(&Value, &Host) -> NodeId>;
/// Refreshes an existing unit in place after a value change.
pub type UpdateFn = Rc<dyn Fn(NodeId, &Value, &Host)>;
/// Renders a unit from a selection flag.
pub type SelectRenderFn = Rc<dyn Fn(bool, &Host) -> NodeId>;
/// Refreshes an existing unit in place after a selection change.
pub type SelectUpdateFn = Rc<dyn Fn(NodeId, bool, &Host)>;
/// Produces an attribute/style value from the container's value.
pub type AttrProducer = Rc<dyn Fn(&Value) -> Value>;
/// Produces an attribute/style value from a selection flag.
pub type SelectAttrProducer = Rc<dyn Fn(bool) -> Value>;

fn default_render() -> RenderFn {
    Rc::new(|value, host| host.tree().borrow_mut().create_text(value))
}

/// Render a unit for `container`'s value under `parent` and keep it fresh.
///
/// With `update`, the unit is mutated in place on every `set()`. Without
/// it, every `set()` schedules a deferred re-render-and-swap. `render`
/// defaults to a text node of the value; passing neither function is
/// [`StateError::MissingUpdateFunction`].
pub(crate) fn bind_as(
    container: &StateContainer,
    host: &Host,
    parent: NodeId,
    render: Option<RenderFn>,
    update: Option<UpdateFn>,
) -> Result<NodeId, StateError> {
    if render.is_none() && update.is_none() {
        return Err(StateError::MissingUpdateFunction);
    }
    let render = render.unwrap_or_else(default_render);

    let unit = render(&container.get(), host);
    host.tree().borrow_mut().append_child(parent, unit);

    let slot = Rc::new(std::cell::Cell::new(unit));
    let host = host.clone();
    match update {
        Some(update) => {
            let slot = Rc::clone(&slot);
            container.subscribe(move |new, _old| update(slot.get(), new, &host));
        }
        None => {
            let weak = container.downgrade();
            let slot = Rc::clone(&slot);
            container.subscribe(move |_new, _old| {
                let weak = weak.clone();
                let render = Rc::clone(&render);
                let slot = Rc::clone(&slot);
                let task_host = host.clone();
                host.scheduler().defer(move || {
                    let Some(container) = weak.upgrade() else {
                        return;
                    };
                    swap_unit(&task_host, &slot, render(&container.get(), &task_host));
                });
            });
        }
    }
    Ok(unit)
}

/// Replace the unit in `slot` with `fresh`, carrying over the key tag.
fn swap_unit(host: &Host, slot: &std::cell::Cell<NodeId>, fresh: NodeId) {
    let old = slot.get();
    {
        let mut tree = host.tree().borrow_mut();
        let key = tree.key(old);
        tree.set_key(fresh, key);
        tree.replace_node(old, fresh);
    }
    slot.set(fresh);
}

/// Render a unit driven by the selection channel scoped to `item`'s own
/// key within its parent collection. Same dual refresh mode as
/// [`bind_as`]; fails with [`StateError::MissingParent`] when `item` has
/// no parent link.
pub(crate) fn bind_select(
    item: &StateContainer,
    host: &Host,
    parent: NodeId,
    render: Option<SelectRenderFn>,
    update: Option<SelectUpdateFn>,
) -> Result<NodeId, StateError> {
    if render.is_none() && update.is_none() {
        return Err(StateError::MissingUpdateFunction);
    }
    let render: SelectRenderFn = render.unwrap_or_else(|| {
        Rc::new(|selected, host| host.tree().borrow_mut().create_text(&Value::Bool(selected)))
    });

    let (weak_parent, own_key) = item.parent_link().ok_or(StateError::MissingParent)?;
    let parent_container = weak_parent.upgrade().ok_or(StateError::MissingParent)?;

    let selected = parent_container.selected().as_ref() == Some(&own_key);
    let unit = render(selected, host);
    host.tree().borrow_mut().append_child(parent, unit);

    let slot = Rc::new(std::cell::Cell::new(unit));
    let host = host.clone();
    match update {
        Some(update) => {
            let slot = Rc::clone(&slot);
            parent_container
                .subscribe_select(own_key, move |selected| update(slot.get(), selected, &host));
        }
        None => {
            let slot = Rc::clone(&slot);
            parent_container.subscribe_select(own_key, move |selected| {
                let render = Rc::clone(&render);
                let slot = Rc::clone(&slot);
                let task_host = host.clone();
                host.scheduler().defer(move || {
                    swap_unit(&task_host, &slot, render(selected, &task_host));
                });
            });
        }
    }
    Ok(unit)
}

// ---------------------------------------------------------------------------
// Bound attributes and styles
// ---------------------------------------------------------------------------

/// What drives a bound attribute: value changes or selection changes.
enum Producer {
    OfValue(StateContainer, AttrProducer),
    OfSelection(StateContainer, SelectAttrProducer),
}

impl Producer {
    fn attach(
        &self,
        name: &str,
        node: NodeId,
        host: &Host,
        style: bool,
    ) -> Result<Subscription, StateError> {
        host.applicator().borrow_mut().attach(name, node);
        let name = name.to_string();
        match self {
            Self::OfValue(container, produce) => {
                apply(host, &name, &produce(&container.get()), node, style);
                let produce = Rc::clone(produce);
                let host = host.clone();
                Ok(container.subscribe(move |new, _old| {
                    apply(&host, &name, &produce(new), node, style);
                }))
            }
            Self::OfSelection(item, produce) => {
                let (weak_parent, own_key) =
                    item.parent_link().ok_or(StateError::MissingParent)?;
                let parent = weak_parent.upgrade().ok_or(StateError::MissingParent)?;
                let selected = parent.selected().as_ref() == Some(&own_key);
                apply(host, &name, &produce(selected), node, style);
                let produce = Rc::clone(produce);
                let host = host.clone();
                Ok(parent.subscribe_select(own_key, move |selected| {
                    apply(&host, &name, &produce(selected), node, style);
                }))
            }
        }
    }
}

fn apply(host: &Host, name: &str, value: &Value, node: NodeId, style: bool) {
    let mut applicator = host.applicator().borrow_mut();
    if style {
        applicator.apply_style(name, value, node);
    } else {
        applicator.apply_attr(name, value, node);
    }
}

/// A bound attribute: applied when attached, re-applied on every change.
pub struct BoundAttr {
    producer: Producer,
}

impl BoundAttr {
    /// Attach to a concrete node and attribute name. Runs the applicator's
    /// one-time attach hook, applies the current value, and subscribes the
    /// producer. Selection-driven attributes fail with
    /// [`StateError::MissingParent`] when the item is not linked.
    pub fn attach(
        &self,
        name: &str,
        node: NodeId,
        host: &Host,
    ) -> Result<Subscription, StateError> {
        self.producer.attach(name, node, host, false)
    }
}

impl std::fmt::Debug for BoundAttr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundAttr").finish_non_exhaustive()
    }
}

/// A bound style: like [`BoundAttr`] but applied through the style surface.
pub struct BoundStyle {
    producer: Producer,
}

impl BoundStyle {
    /// Attach to a concrete node and style name. See [`BoundAttr::attach`].
    pub fn attach(
        &self,
        name: &str,
        node: NodeId,
        host: &Host,
    ) -> Result<Subscription, StateError> {
        self.producer.attach(name, node, host, true)
    }
}

impl std::fmt::Debug for BoundStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundStyle").finish_non_exhaustive()
    }
}

pub(crate) fn bind_attr(container: &StateContainer, producer: Option<AttrProducer>) -> BoundAttr {
    let produce = producer.unwrap_or_else(|| Rc::new(Value::clone));
    BoundAttr {
        producer: Producer::OfValue(container.clone(), produce),
    }
}

pub(crate) fn bind_style(container: &StateContainer, producer: Option<AttrProducer>) -> BoundStyle {
    let produce = producer.unwrap_or_else(|| Rc::new(Value::clone));
    BoundStyle {
        producer: Producer::OfValue(container.clone(), produce),
    }
}

pub(crate) fn bind_select_attr(
    item: &StateContainer,
    producer: Option<SelectAttrProducer>,
) -> BoundAttr {
    let produce = producer.unwrap_or_else(|| Rc::new(Value::Bool));
    BoundAttr {
        producer: Producer::OfSelection(item.clone(), produce),
    }
}

// ---------------------------------------------------------------------------
// DynValue
// ---------------------------------------------------------------------------

/// Tagged value handed to the external element/attribute factory.
///
/// Replaces duck-typed marker flags on callables: the factory pattern
/// matches instead of probing.
pub enum DynValue {
    /// A plain value, applied once.
    Plain(Value),
    /// A bound attribute; attaching subscribes it.
    BoundAttr(BoundAttr),
    /// A bound style; attaching subscribes it.
    BoundStyle(BoundStyle),
    /// A bare container, treated as a bound attribute of its own value.
    State(StateContainer),
    /// A template placeholder slot; inert until the embedder resolves it.
    Placeholder(usize),
}

impl DynValue {
    /// Apply or attach this value to `node` under `name`. Bound variants
    /// return the subscription that keeps them live.
    pub fn apply(
        &self,
        name: &str,
        node: NodeId,
        host: &Host,
    ) -> Result<Option<Subscription>, StateError> {
        match self {
            Self::Plain(value) => {
                host.applicator().borrow_mut().apply_attr(name, value, node);
                Ok(None)
            }
            Self::BoundAttr(bound) => bound.attach(name, node, host).map(Some),
            Self::BoundStyle(bound) => bound.attach(name, node, host).map(Some),
            Self::State(container) => {
                bind_attr(container, None).attach(name, node, host).map(Some)
            }
            Self::Placeholder(_) => Ok(None),
        }
    }
}

impl std::fmt::Debug for DynValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(v) => f.debug_tuple("Plain").field(v).finish(),
            Self::BoundAttr(_) => f.write_str("BoundAttr(..)"),
            Self::BoundStyle(_) => f.write_str("BoundStyle(..)"),
            Self::State(c) => f.debug_tuple("State").field(c).finish(),
            Self::Placeholder(i) => f.debug_tuple("Placeholder").field(i).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
