//! Typed values.
//!
//! Host data enters the engine as `serde_json::Value`. Binding happens in
//! two steps: [`implied_type`] infers a [`ValueType`] for the data, then
//! [`Value::convert`] coerces the data into that type. Inference fails for
//! shapes the type system cannot express, such as lists mixing element types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::ValueError;

/// A typed engine value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

/// Type of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// Unknown element type, e.g. of `null` or an empty list.
    Dynamic,
    Bool,
    Number,
    String,
    List(Box<ValueType>),
    Object(BTreeMap<String, ValueType>),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Dynamic => f.write_str("dynamic"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Number => f.write_str("number"),
            ValueType::String => f.write_str("string"),
            ValueType::List(element) => write!(f, "list({element})"),
            ValueType::Object(fields) => {
                f.write_str("object({")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={ty}")?;
                }
                f.write_str("})")
            }
        }
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Infer the type of a JSON value.
pub fn implied_type(json: &Json) -> Result<ValueType, ValueError> {
    match json {
        Json::Null => Ok(ValueType::Dynamic),
        Json::Bool(_) => Ok(ValueType::Bool),
        Json::Number(_) => Ok(ValueType::Number),
        Json::String(_) => Ok(ValueType::String),
        Json::Array(items) => {
            let mut element = ValueType::Dynamic;
            for item in items {
                element = unify(element, implied_type(item)?)?;
            }
            Ok(ValueType::List(Box::new(element)))
        }
        Json::Object(fields) => fields
            .iter()
            .map(|(name, value)| implied_type(value).map(|ty| (name.clone(), ty)))
            .collect::<Result<_, _>>()
            .map(ValueType::Object),
    }
}

fn unify(a: ValueType, b: ValueType) -> Result<ValueType, ValueError> {
    match (a, b) {
        (ValueType::Dynamic, other) | (other, ValueType::Dynamic) => Ok(other),
        (ValueType::List(x), ValueType::List(y)) => Ok(ValueType::List(Box::new(unify(*x, *y)?))),
        (ValueType::Object(x), ValueType::Object(y)) if x.keys().eq(y.keys()) => {
            let mut fields = BTreeMap::new();
            for ((name, xt), yt) in x.into_iter().zip(y.into_values()) {
                fields.insert(name, unify(xt, yt)?);
            }
            Ok(ValueType::Object(fields))
        }
        (x, y) if x == y => Ok(x),
        (x, y) => Err(ValueError::Inference(format!(
            "inconsistent list element types ({x} and {y})"
        ))),
    }
}

impl Value {
    /// Coerce JSON data into `ty`.
    pub fn convert(json: &Json, ty: &ValueType) -> Result<Value, ValueError> {
        match (json, ty) {
            (Json::Null, _) => Ok(Value::Null),
            (_, ValueType::Dynamic) => Ok(Value::from_json(json)),
            (Json::Bool(b), ValueType::Bool) => Ok(Value::Bool(*b)),
            (Json::Number(n), ValueType::Number) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| ValueError::Conversion(format!("number {n} is out of range"))),
            (Json::String(s), ValueType::String) => Ok(Value::String(s.clone())),
            (Json::Array(items), ValueType::List(element)) => items
                .iter()
                .map(|item| Value::convert(item, element))
                .collect::<Result<_, _>>()
                .map(Value::List),
            (Json::Object(fields), ValueType::Object(types)) => {
                let mut object = BTreeMap::new();
                for (name, field_ty) in types {
                    let field = fields.get(name).unwrap_or(&Json::Null);
                    object.insert(name.clone(), Value::convert(field, field_ty)?);
                }
                if let Some(extra) = fields.keys().find(|name| !types.contains_key(*name)) {
                    return Err(ValueError::Conversion(format!("unexpected attribute {extra:?}")));
                }
                Ok(Value::Object(object))
            }
            (json, ty) => Err(ValueError::Conversion(format!(
                "expected {ty}, found {}",
                json_kind(json)
            ))),
        }
    }

    /// Untyped conversion; every JSON value maps onto some [`Value`].
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// String form used for interpolation: strings unquoted, whole numbers
/// without a fraction, collections as JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::List(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_implied_type_object() {
        let ty = implied_type(&json!({"region": "eu", "count": 3, "tags": ["a", "b"]})).unwrap();

        assert_eq!(ty.to_string(), "object({count=number, region=string, tags=list(string)})");
    }

    #[test]
    fn test_implied_type_rejects_mixed_list() {
        let err = implied_type(&json!({"bad": [1, "two"]})).unwrap_err();

        assert!(matches!(err, ValueError::Inference(_)));
    }

    #[test]
    fn test_implied_type_unifies_nulls_and_empty_lists() {
        let ty = implied_type(&json!([null, [], [1]])).unwrap();

        assert_eq!(ty, ValueType::List(Box::new(ValueType::List(Box::new(ValueType::Number)))));
    }

    #[test]
    fn test_convert_follows_type() {
        let data = json!({"name": "web", "ports": [80, 443], "enabled": true});
        let ty = implied_type(&data).unwrap();

        let value = Value::convert(&data, &ty).unwrap();

        let fields = value.as_object().unwrap();
        assert_eq!(fields["name"], Value::from("web"));
        assert_eq!(fields["ports"], Value::List(vec![Value::Number(80.0), Value::Number(443.0)]));
        assert_eq!(fields["enabled"], Value::Bool(true));
    }

    #[test]
    fn test_convert_type_mismatch() {
        let err = Value::convert(&json!("text"), &ValueType::Number).unwrap_err();

        assert_eq!(err, ValueError::Conversion("expected number, found string".into()));
    }

    #[test]
    fn test_display_for_interpolation() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::from("x").to_string(), "x");
        assert_eq!(Value::Null.to_string(), "");
    }
}
