#![forbid(unsafe_code)]

//! Bindings between [`StateContainer`]s and a node tree.
//!
//! Three binding families:
//!
//! - **Unit bindings** ([`Bind::bind_as`], [`Bind::bind_select`]) render a
//!   node per container and keep it fresh, either mutating in place
//!   (update mode) or re-rendering and swapping on the next scheduler tick
//!   (swap mode).
//! - **Attribute and style bindings** ([`Bind::bind_attr`],
//!   [`Bind::bind_style`], [`Bind::bind_select_attr`]) produce
//!   [`BoundAttr`]/[`BoundStyle`] handles that attach to a concrete node
//!   and re-apply on every change.
//! - **Children bindings** ([`Bind::bind_children`]) keep a parent node's
//!   children synchronized with an ordered collection through the keyed
//!   reconciler.
//!
//! All bindings run against a [`Host`]: the node tree, the applicator, and
//! the cooperative scheduler bundled as shared handles.

mod binder;
mod host;
mod reconcile;

pub use binder::{
    AttrProducer, BoundAttr, BoundStyle, DynValue, RenderFn, SelectAttrProducer, SelectRenderFn,
    SelectUpdateFn, UpdateFn,
};
pub use host::Host;
pub use reconcile::{ItemRenderFn, ItemUpdateFn, KeyFn};

use keyloom_state::{StateContainer, StateError};
use keyloom_tree::NodeId;

/// Binding surface for [`StateContainer`].
///
/// Implemented once, for `StateContainer`; a trait so downstream code can
/// take the binding surface without the concrete container type.
pub trait Bind {
    /// Render a unit for this container's value under `parent` and keep
    /// it fresh. With `update` the unit is mutated in place; without it,
    /// every change schedules a deferred re-render-and-swap.
    ///
    /// # Errors
    ///
    /// [`StateError::MissingUpdateFunction`] when both `render` and
    /// `update` are `None`.
    fn bind_as(
        &self,
        host: &Host,
        parent: NodeId,
        render: Option<RenderFn>,
        update: Option<UpdateFn>,
    ) -> Result<NodeId, StateError>;

    /// Render a unit driven by the selection channel scoped to this
    /// item's own key within its parent collection.
    ///
    /// # Errors
    ///
    /// [`StateError::MissingUpdateFunction`] when both functions are
    /// `None`; [`StateError::MissingParent`] when this container has no
    /// live parent link.
    fn bind_select(
        &self,
        host: &Host,
        parent: NodeId,
        render: Option<SelectRenderFn>,
        update: Option<SelectUpdateFn>,
    ) -> Result<NodeId, StateError>;

    /// A bound attribute fed by this container's value. `producer`
    /// defaults to the identity.
    fn bind_attr(&self, producer: Option<AttrProducer>) -> BoundAttr;

    /// A bound style fed by this container's value. `producer` defaults
    /// to the identity.
    fn bind_style(&self, producer: Option<AttrProducer>) -> BoundStyle;

    /// A bound attribute fed by this item's selection state. `producer`
    /// defaults to wrapping the flag as a boolean value.
    fn bind_select_attr(&self, producer: Option<SelectAttrProducer>) -> BoundAttr;

    /// Keep `parent`'s children synchronized with this container's
    /// collection value through keyed reconciliation.
    ///
    /// # Errors
    ///
    /// [`StateError::DuplicateKey`] when the initial collection carries
    /// two items with the same key; the binding is not attached.
    fn bind_children(
        &self,
        host: &Host,
        parent: NodeId,
        render: ItemRenderFn,
        update: Option<ItemUpdateFn>,
        key_fn: Option<KeyFn>,
    ) -> Result<(), StateError>;
}

impl Bind for StateContainer {
    fn bind_as(
        &self,
        host: &Host,
        parent: NodeId,
        render: Option<RenderFn>,
        update: Option<UpdateFn>,
    ) -> Result<NodeId, StateError> {
        binder::bind_as(self, host, parent, render, update)
    }

    fn bind_select(
        &self,
        host: &Host,
        parent: NodeId,
        render: Option<SelectRenderFn>,
        update: Option<SelectUpdateFn>,
    ) -> Result<NodeId, StateError> {
        binder::bind_select(self, host, parent, render, update)
    }

    fn bind_attr(&self, producer: Option<AttrProducer>) -> BoundAttr {
        binder::bind_attr(self, producer)
    }

    fn bind_style(&self, producer: Option<AttrProducer>) -> BoundStyle {
        binder::bind_style(self, producer)
    }

    fn bind_select_attr(&self, producer: Option<SelectAttrProducer>) -> BoundAttr {
        binder::bind_select_attr(self, producer)
    }

    fn bind_children(
        &self,
        host: &Host,
        parent: NodeId,
        render: ItemRenderFn,
        update: Option<ItemUpdateFn>,
        key_fn: Option<KeyFn>,
    ) -> Result<(), StateError> {
        reconcile::bind_children(self, host, parent, render, update, key_fn)
    }
}
