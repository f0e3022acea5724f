#![forbid(unsafe_code)]

//! Dynamic value model and identity keys.
//!
//! [`Value`] is the payload type flowing through every container: a
//! JSON-like tree plus [`Value::Handle`], which is how collection items get
//! wrapped in their own [`StateContainer`] during reconciliation so item
//! mutation is independent of the parent collection.
//!
//! [`Key`] is the identity token used to match collection items across
//! updates. Keys among the live items of one bound collection must be
//! pairwise unique; the reconciler enforces this.
//!
//! # Invariants
//!
//! 1. `Handle` equality is pointer identity: two handles are equal only if
//!    they share the same underlying container.
//! 2. Cloning a `Handle` shares the container; cloning any other variant is
//!    a deep copy.
//! 3. `Key` derivation from a primitive is deterministic: the same primitive
//!    always yields the same key.

use std::collections::BTreeMap;

use crate::container::StateContainer;

/// A dynamic value: JSON-like data plus shared container handles.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered collection. The unit a children binding reconciles over.
    List(Vec<Value>),
    /// String-keyed structured object.
    Object(BTreeMap<String, Value>),
    /// A collection item wrapped in its own container. Shares state on clone.
    Handle(StateContainer),
}

impl Value {
    /// Build an object value from an iterator of entries.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Build a string value.
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Whether this value is an [`Value::Object`].
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Whether this value is a [`Value::List`].
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Whether this value is a primitive (null, bool, int, float, string).
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_)
        )
    }

    /// Borrow the list items, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the object map, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the wrapped container, if this is a handle.
    #[must_use]
    pub fn as_handle(&self) -> Option<&StateContainer> {
        match self {
            Self::Handle(c) => Some(c),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    /// Text-equivalent rendering, used by default text-node creation.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Object(_) => f.write_str("[object]"),
            Self::Handle(c) => write!(f, "{}", c.get()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<StateContainer> for Value {
    fn from(c: StateContainer) -> Self {
        Self::Handle(c)
    }
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Identity token derived from a collection item.
///
/// `Index` is the positional fallback used when no key function is supplied
/// and no better identity exists; it is unstable under reordering and the
/// reconciler warns when it has to use it. `Ident` carries a container id
/// (value identity for structured items).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Boolean primitive key.
    Bool(bool),
    /// Integer primitive key.
    Int(i64),
    /// String primitive key.
    Str(String),
    /// Positional fallback key.
    Index(usize),
    /// Container-identity key.
    Ident(u64),
}

impl Key {
    /// Derive a key from a primitive value. Returns `None` for lists,
    /// objects, and handles. Floats key by their decimal rendering so the
    /// key stays hashable.
    #[must_use]
    pub fn for_primitive(value: &Value) -> Option<Key> {
        match value {
            Value::Null => Some(Key::Str("null".to_string())),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Float(x) => Some(Key::Str(x.to_string())),
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::List(_) | Value::Object(_) | Value::Handle(_) => None,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
            Self::Index(i) => write!(f, "@{i}"),
            Self::Ident(id) => write!(f, "#{id}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}
