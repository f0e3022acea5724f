#![forbid(unsafe_code)]

//! JSON interop for [`Value`] (feature = "json").
//!
//! `Handle`s flatten to their wrapped value on the way out; there is no
//! JSON representation that round-trips container identity, so `from_json`
//! never produces handles.

use crate::value::Value;

impl Value {
    /// Convert to a `serde_json::Value`. `Handle`s flatten to their inner
    /// value; non-finite floats become JSON null.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(x) => serde_json::Number::from_f64(*x)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::Handle(c) => c.get().to_json(),
        }
    }

    /// Convert from a `serde_json::Value`. Integral numbers become `Int`,
    /// everything else numeric becomes `Float`.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::StateContainer;

    #[test]
    fn json_roundtrip() {
        let value = Value::object([
            ("name", Value::from("ada")),
            ("count", Value::from(3)),
            ("ratio", Value::from(0.5)),
            ("tags", Value::list([Value::from("a"), Value::from("b")])),
        ]);
        let json = value.to_json();
        assert_eq!(Value::from_json(&json), value);
    }

    #[test]
    fn handle_flattens_to_inner_value() {
        let item = StateContainer::new(Value::from(7));
        let value = Value::list([Value::Handle(item)]);
        assert_eq!(value.to_json(), serde_json::json!([7]));
    }

    #[test]
    fn non_finite_float_becomes_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }
}
