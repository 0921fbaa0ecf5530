//! Action signatures declared on agent handler types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// How a signature receives its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SignatureStyle {
    /// Discrete named parameters, possibly defaulted
    Explicit,
    /// One ServerAction-style config object; supplied keys fill its fields by name
    Aggregate,
}

/// Declared type of an action parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ParamType {
    Bool,
    Int,
    Float,
    String,
    /// `{x, y, z}` with all three components
    Vector3,
    /// Any subset of `{x, y, z}`
    PartialVector3,
    /// A yaw angle or a full `{x, y, z}` rotation
    Rotation,
    FloatList,
    StringList,
    Object,
    Any,
}

impl ParamType {
    /// Whether `value` can bind to this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Bool => value.is_boolean(),
            ParamType::Int => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            ParamType::Float => value.is_number(),
            ParamType::String => value.is_string(),
            ParamType::Vector3 => is_vector(value, true),
            ParamType::PartialVector3 => is_vector(value, false),
            ParamType::Rotation => value.is_number() || is_vector(value, true),
            ParamType::FloatList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_number)),
            ParamType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ParamType::Object => value.is_object(),
            ParamType::Any => true,
        }
    }
}

fn is_vector(value: &Value, complete: bool) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    let known = map
        .iter()
        .all(|(k, v)| matches!(k.as_str(), "x" | "y" | "z") && v.is_number());
    known && (!complete || map.len() == 3)
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Bool => "bool",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::String => "string",
            ParamType::Vector3 => "Vector3",
            ParamType::PartialVector3 => "partial Vector3",
            ParamType::Rotation => "rotation",
            ParamType::FloatList => "float list",
            ParamType::StringList => "string list",
            ParamType::Object => "object",
            ParamType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Short description of a JSON value's kind, for error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: ParamType,
    /// `None` means required; `Some(Value::Null)` is a nullable optional
    #[serde(
        default,
        deserialize_with = "present_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
}

// An explicit `"Default": null` must stay distinguishable from a missing default
fn present_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ParamType, default: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: Some(default.into()),
        }
    }

    /// Optional parameter whose default is `null`
    pub fn nullable(name: &str, kind: ParamType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: Some(Value::Null),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Whether `value` binds to this parameter
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return matches!(self.default, Some(Value::Null)) || self.kind == ParamType::Any;
        }
        self.kind.accepts(value)
    }
}

/// A handler method an action name can dispatch to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionSignature {
    pub name: String,
    pub style: SignatureStyle,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl ActionSignature {
    pub fn explicit(name: &str, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            style: SignatureStyle::Explicit,
            params,
        }
    }

    pub fn aggregate(name: &str, fields: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            style: SignatureStyle::Aggregate,
            params: fields,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn param_names(&self) -> BTreeSet<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn required_names(&self) -> BTreeSet<&str> {
        self.params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vector_types() {
        let full = json!({"x": 1.0, "y": 2, "z": 3.5});
        let partial = json!({"x": 3.2, "z": 5});

        assert!(ParamType::Vector3.accepts(&full));
        assert!(!ParamType::Vector3.accepts(&partial));
        assert!(ParamType::PartialVector3.accepts(&partial));
        assert!(!ParamType::PartialVector3.accepts(&json!({"w": 1})));
        assert!(!ParamType::Vector3.accepts(&json!(5)));
        assert!(!ParamType::Float.accepts(&full));
    }

    #[test]
    fn test_rotation_accepts_yaw_or_vector() {
        assert!(ParamType::Rotation.accepts(&json!(90)));
        assert!(ParamType::Rotation.accepts(&json!({"x": 0, "y": 90, "z": 0})));
        assert!(!ParamType::Rotation.accepts(&json!("90")));
    }

    #[test]
    fn test_int_accepts_integral_floats() {
        assert!(ParamType::Int.accepts(&json!(3)));
        assert!(ParamType::Int.accepts(&json!(3.0)));
        assert!(!ParamType::Int.accepts(&json!(3.5)));
    }

    #[test]
    fn test_null_only_binds_nullable() {
        let nullable = ParamSpec::nullable("orthographicSize", ParamType::Float);
        let required = ParamSpec::required("fieldOfView", ParamType::Float);

        assert!(nullable.accepts(&Value::Null));
        assert!(!required.accepts(&Value::Null));
    }

    #[test]
    fn test_signature_from_json() {
        let json = r#"{"Name":"RotateLook","Style":"Explicit","Params":[
            {"Name":"rotation","Type":"Float"},
            {"Name":"horizon","Type":"Float","Default":0}
        ]}"#;
        let sig: ActionSignature = serde_json::from_str(json).unwrap();

        assert_eq!(sig.style, SignatureStyle::Explicit);
        assert_eq!(sig.required_names(), BTreeSet::from(["rotation"]));
        assert_eq!(sig.param("horizon").unwrap().default, Some(json!(0)));
    }

    #[test]
    fn test_nullable_default_survives_json() {
        let spec = ParamSpec::nullable("orthographicSize", ParamType::Float);
        let json = serde_json::to_string(&spec).unwrap();
        let loaded: ParamSpec = serde_json::from_str(&json).unwrap();
        assert!(!loaded.is_required());
        assert_eq!(loaded.default, Some(Value::Null));
    }
}
