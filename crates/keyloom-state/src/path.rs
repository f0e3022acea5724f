#![forbid(unsafe_code)]

//! Dotted-path reads and writes over object values.
//!
//! Paths are non-empty dotted strings (`"user.address.city"`). Reads return
//! `Ok(None)` for absent segments; writes can optionally create missing
//! intermediate objects.

use std::collections::BTreeMap;

use crate::container::StateContainer;
use crate::error::StateError;
use crate::value::Value;

fn split_path(path: &str) -> Result<Vec<&str>, StateError> {
    if path.is_empty() {
        return Err(StateError::InvalidPath);
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StateError::InvalidPath);
    }
    Ok(segments)
}

impl StateContainer {
    /// Read the value at a dotted path.
    ///
    /// Fails with [`StateError::NotAnObject`] when the current value is not
    /// an object and [`StateError::InvalidPath`] on an empty path or
    /// segment. Returns `Ok(None)` when any segment is absent or descends
    /// through a non-object.
    pub fn get_path(&self, path: &str) -> Result<Option<Value>, StateError> {
        let segments = split_path(path)?;
        let root = self.get();
        if !root.is_object() {
            return Err(StateError::NotAnObject);
        }
        let mut current = &root;
        for segment in segments {
            let Value::Object(map) = current else {
                return Ok(None);
            };
            match map.get(segment) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current.clone()))
    }

    /// Write `value` at a dotted path, then `set()` the mutated root.
    ///
    /// With `fill_with_objects`, missing intermediate segments are created
    /// as empty objects; otherwise a missing or non-object parent fails with
    /// [`StateError::MissingPathTarget`].
    pub fn set_path(
        &self,
        path: &str,
        value: Value,
        fill_with_objects: bool,
    ) -> Result<Value, StateError> {
        let segments = split_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(StateError::InvalidPath);
        };

        let mut root = self.get();
        {
            let mut current = &mut root;
            for segment in parents {
                let Value::Object(map) = current else {
                    return Err(StateError::MissingPathTarget);
                };
                if !map.contains_key(*segment) {
                    if !fill_with_objects {
                        return Err(StateError::MissingPathTarget);
                    }
                    map.insert((*segment).to_string(), Value::Object(BTreeMap::new()));
                }
                current = match map.get_mut(*segment) {
                    Some(next) => next,
                    None => return Err(StateError::MissingPathTarget),
                };
            }
            let Value::Object(map) = current else {
                return Err(StateError::MissingPathTarget);
            };
            map.insert((*last).to_string(), value);
        }
        self.set(root)
    }
}
