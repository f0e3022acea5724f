#![forbid(unsafe_code)]

//! Error types for state-container operations.
//!
//! All failures are synchronous and raised at the call site that caused
//! them; there is no retry or background recovery. [`StateError::DuplicateKey`]
//! is the one variant with a compensating action: before it is returned from
//! `set()`, the container's value is rolled back to its last-known-good
//! snapshot so the container, its observers, and any bound node tree stay
//! mutually consistent.

use crate::value::Key;

/// Errors from container reads, writes, and binding construction.
#[derive(Debug, Clone, PartialEq)]
pub enum StateError {
    /// A dotted path was empty or contained an empty segment.
    InvalidPath,
    /// An object operation was attempted on a non-object value.
    NotAnObject,
    /// A dotted-path write could not resolve its parent to an object.
    MissingPathTarget,
    /// Two items of a bound collection resolved to the same key.
    DuplicateKey(Key),
    /// A binder was constructed without any render or update function.
    MissingUpdateFunction,
    /// A selection binding was requested on an item with no parent link.
    MissingParent,
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath => write!(f, "path must be a non-empty dotted string"),
            Self::NotAnObject => write!(f, "current value is not an object"),
            Self::MissingPathTarget => write!(f, "path parent is not an object"),
            Self::DuplicateKey(key) => {
                write!(f, "duplicate key '{key}' in bound collection")
            }
            Self::MissingUpdateFunction => {
                write!(f, "binder requires a render or update function")
            }
            Self::MissingParent => {
                write!(f, "item container has no parent link for selection")
            }
        }
    }
}

impl std::error::Error for StateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_key() {
        let err = StateError::DuplicateKey(Key::Str("row-3".into()));
        assert!(err.to_string().contains("row-3"));
    }

    #[test]
    fn error_trait_object() {
        let err: Box<dyn std::error::Error> = Box::new(StateError::InvalidPath);
        assert!(!err.to_string().is_empty());
    }
}
