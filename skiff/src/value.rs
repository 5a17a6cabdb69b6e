//! Language-neutral values for comparing original and translated results
//!
//! Swift and Kotlin disagree on numeric widths, collection types and string
//! types, so results from both sides are canonicalized into a
//! [`ComparableValue`] before comparison. Numbers with an integral value are
//! always stored as [`ComparableValue::Integer`], so `6` and `6.0` compare
//! equal.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComparableValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ComparableValue>),
    Mapping(BTreeMap<String, ComparableValue>),
}

impl ComparableValue {
    /// Canonicalize a JSON-shaped native value
    pub fn from_native(value: &Value) -> Self {
        match value {
            Value::Null => ComparableValue::Null,
            Value::Bool(b) => ComparableValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ComparableValue::Integer(i)
                } else {
                    ComparableValue::float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => ComparableValue::String(s.clone()),
            Value::Array(items) => {
                ComparableValue::Sequence(items.iter().map(ComparableValue::from_native).collect())
            }
            Value::Object(map) => ComparableValue::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), ComparableValue::from_native(v)))
                    .collect(),
            ),
        }
    }

    /// A float, folded into an integer when it has no fractional part
    pub fn float(f: f64) -> Self {
        if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            ComparableValue::Integer(f as i64)
        } else {
            ComparableValue::Float(f)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ComparableValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ComparableValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparableValue::Null => write!(f, "nil"),
            ComparableValue::Bool(b) => write!(f, "{}", b),
            ComparableValue::Integer(i) => write!(f, "{}", i),
            ComparableValue::Float(x) => write!(f, "{}", x),
            ComparableValue::String(s) => write!(f, "{:?}", s),
            ComparableValue::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ComparableValue::Mapping(map) => {
                if map.is_empty() {
                    return write!(f, "[:]");
                }
                write!(f, "[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "]")
            }
        }
    }
}

// Deserialization goes through `from_native` so that `2.0` becomes `Integer(2)`
impl<'de> Deserialize<'de> for ComparableValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| ComparableValue::from_native(&value))
    }
}

impl From<&Value> for ComparableValue {
    fn from(value: &Value) -> Self {
        ComparableValue::from_native(value)
    }
}

impl From<bool> for ComparableValue {
    fn from(b: bool) -> Self {
        ComparableValue::Bool(b)
    }
}

impl From<i64> for ComparableValue {
    fn from(i: i64) -> Self {
        ComparableValue::Integer(i)
    }
}

impl From<i32> for ComparableValue {
    fn from(i: i32) -> Self {
        ComparableValue::Integer(i as i64)
    }
}

impl From<f64> for ComparableValue {
    fn from(f: f64) -> Self {
        ComparableValue::float(f)
    }
}

impl From<&str> for ComparableValue {
    fn from(s: &str) -> Self {
        ComparableValue::String(s.to_string())
    }
}

impl From<String> for ComparableValue {
    fn from(s: String) -> Self {
        ComparableValue::String(s)
    }
}

impl<T: Into<ComparableValue>> From<Vec<T>> for ComparableValue {
    fn from(items: Vec<T>) -> Self {
        ComparableValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ComparableValue>> From<Option<T>> for ComparableValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ComparableValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integral_float_equals_integer() {
        assert_eq!(ComparableValue::from_native(&json!(6.0)), ComparableValue::Integer(6));
        assert_eq!(ComparableValue::from(6.0), ComparableValue::from(6));
    }

    #[test]
    fn test_fractional_float_stays_float() {
        assert_eq!(ComparableValue::from_native(&json!(1.5)), ComparableValue::Float(1.5));
    }

    #[test]
    fn test_nested_structures() {
        let native = json!({"b": [1, "x", null], "a": true});
        let expected = ComparableValue::Mapping(BTreeMap::from([
            ("a".to_string(), ComparableValue::Bool(true)),
            (
                "b".to_string(),
                ComparableValue::Sequence(vec![
                    ComparableValue::Integer(1),
                    ComparableValue::String("x".to_string()),
                    ComparableValue::Null,
                ]),
            ),
        ]));
        assert_eq!(ComparableValue::from_native(&native), expected);
    }

    #[test]
    fn test_option_conversion() {
        assert!(ComparableValue::from(None::<i64>).is_null());
        assert_eq!(ComparableValue::from(Some("dog")), ComparableValue::from("dog"));
    }

    #[test]
    fn test_display_reads_like_swift() {
        assert_eq!(ComparableValue::from("XYZ").to_string(), "\"XYZ\"");
        assert_eq!(ComparableValue::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(ComparableValue::Null.to_string(), "nil");
        assert_eq!(ComparableValue::Mapping(BTreeMap::new()).to_string(), "[:]");
    }

    #[test]
    fn test_serde_round_trip_shape() {
        let value: ComparableValue = serde_json::from_str(r#"{"k": [1, 2.5, "s"]}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"k":[1,2.5,"s"]}"#
        );
    }

    #[test]
    fn test_deserialized_integral_float_is_integer() {
        let value: ComparableValue = serde_json::from_str("[2.0, 2.5]").unwrap();
        assert_eq!(
            value,
            ComparableValue::Sequence(vec![
                ComparableValue::Integer(2),
                ComparableValue::Float(2.5),
            ])
        );
    }
}
