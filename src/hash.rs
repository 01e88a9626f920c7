//! Canonicalization and consistent hashing of snapshot data.
//!
//! Two independently loaded snapshots that are semantically identical must
//! hash to the same digest, even when mapping keys were inserted in a
//! different order. The reward engine relies on this to compare the agent's
//! final database state against the state produced by replaying the
//! ground-truth action sequence.
//!
//! Ordering rules:
//! - mapping entries are sorted by key (insertion order is not meaningful),
//! - set elements are sorted (set order is never meaningful),
//! - sequence elements keep their order (e.g. a list of order line items).

use std::fmt::Write as _;

use ordered_float::OrderedFloat;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// An order-normalized form of a nested data value.
///
/// The derived total order is what makes set elements sortable; floats go
/// through [`OrderedFloat`] so the ordering is total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Canon {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    /// Order-preserving sequence.
    Seq(Vec<Canon>),
    /// Sorted at construction; see [`Canon::set`].
    Set(Vec<Canon>),
    /// Sorted by key at construction.
    Map(Vec<(String, Canon)>),
}

impl Canon {
    /// Build a canonical set from elements in any order.
    pub fn set(elements: impl IntoIterator<Item = Canon>) -> Self {
        let mut elems: Vec<Canon> = elements.into_iter().collect();
        elems.sort();
        Canon::Set(elems)
    }

    fn render(&self, out: &mut String) {
        match self {
            Canon::Null => out.push_str("null"),
            Canon::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Canon::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Canon::Float(f) => {
                // Debug keeps the decimal point on integral floats, so 1.0
                // never renders the same as the integer 1.
                let _ = write!(out, "{:?}", f.0);
            }
            Canon::Str(s) => {
                let _ = write!(out, "{s:?}");
            }
            Canon::Seq(elems) => {
                out.push('[');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    elem.render(out);
                }
                out.push(']');
            }
            Canon::Set(elems) => {
                out.push_str("{|");
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    elem.render(out);
                }
                out.push_str("|}");
            }
            Canon::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{key:?}:");
                    value.render(out);
                }
                out.push('}');
            }
        }
    }
}

impl From<&Value> for Canon {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Canon::Null,
            Value::Bool(b) => Canon::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Canon::Int(i),
                // u64 beyond i64::MAX or a true float.
                None => Canon::Float(OrderedFloat(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Canon::Str(s.clone()),
            Value::Array(elems) => Canon::Seq(elems.iter().map(Canon::from).collect()),
            Value::Object(map) => {
                let mut entries: Vec<(String, Canon)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), Canon::from(v)))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                Canon::Map(entries)
            }
        }
    }
}

/// Hash a canonical value to a lowercase SHA-256 hex digest.
pub fn consistent_hash(value: &Canon) -> String {
    let mut text = String::new();
    value.render(&mut text);
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonicalize and hash an arbitrary JSON value in one step.
pub fn hash_value(value: &Value) -> String {
    consistent_hash(&Canon::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_key_order_is_normalized() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn nested_map_key_order_is_normalized() {
        let a: Value =
            serde_json::from_str(r#"{"orders": {"o1": {"x": 1, "y": 2}}}"#).unwrap();
        let b: Value =
            serde_json::from_str(r#"{"orders": {"o1": {"y": 2, "x": 1}}}"#).unwrap();
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn set_order_is_normalized() {
        let a = Canon::set([Canon::Int(1), Canon::Int(2), Canon::Int(3)]);
        let b = Canon::set([Canon::Int(3), Canon::Int(2), Canon::Int(1)]);
        assert_eq!(consistent_hash(&a), consistent_hash(&b));
    }

    #[test]
    fn sequence_order_is_significant() {
        let a = hash_value(&json!([1, 2, 3]));
        let b = hash_value(&json!([3, 2, 1]));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_deterministic() {
        let value = json!({
            "users": {"u1": {"name": "Ava", "zip": "94016"}},
            "orders": [{"id": "o1", "items": ["a", "b"]}],
        });
        assert_eq!(hash_value(&value), hash_value(&value.clone()));
    }

    #[test]
    fn string_and_number_do_not_collide() {
        assert_ne!(hash_value(&json!("1")), hash_value(&json!(1)));
    }

    #[test]
    fn integer_and_integral_float_do_not_collide() {
        assert_ne!(hash_value(&json!({"x": 1})), hash_value(&json!({"x": 1.0})));
        assert_ne!(
            consistent_hash(&Canon::Int(84)),
            consistent_hash(&Canon::Float(OrderedFloat(84.0)))
        );
    }

    #[test]
    fn set_and_sequence_do_not_collide() {
        let seq = Canon::Seq(vec![Canon::Int(1), Canon::Int(2)]);
        let set = Canon::set([Canon::Int(1), Canon::Int(2)]);
        assert_ne!(consistent_hash(&seq), consistent_hash(&set));
    }
}
