//! Fixture execution adapter shared by harness tooling.
//!
//! Provides a small reference validator that understands the JSON Schema
//! `type` keyword (plus boolean schemas). It exists so the harness binary and
//! integration tests have a concrete validator to drive; real implementations
//! under test plug in through the harness `TestSource` trait instead.

use serde_json::Value;
use thiserror::Error;

/// Outcome of executing one fixture case against the reference validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaExecution {
    /// Whether the data satisfied the schema.
    pub valid: bool,
    /// Human-readable reason when the data was rejected.
    pub note: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema must be an object or boolean, got {0}")]
    InvalidSchema(&'static str),
    #[error("unknown type name '{0}'")]
    UnknownType(String),
    #[error("'type' must be a string or an array of strings")]
    MalformedType,
}

const KNOWN_TYPES: &[&str] = &[
    "null", "boolean", "integer", "number", "string", "array", "object",
];

/// Execute `data` against `schema`, honoring only the `type` keyword.
///
/// Boolean schemas follow JSON Schema: `true` accepts everything, `false`
/// rejects everything. An object schema without `type` accepts everything.
pub fn execute_schema_case(data: &Value, schema: &Value) -> Result<SchemaExecution, SchemaError> {
    let declared = match schema {
        Value::Bool(true) => return Ok(accept()),
        Value::Bool(false) => return Ok(reject("schema is `false`".to_string())),
        Value::Object(map) => match map.get("type") {
            None => return Ok(accept()),
            Some(Value::String(name)) => vec![name.as_str()],
            Some(Value::Array(names)) => names
                .iter()
                .map(|n| n.as_str().ok_or(SchemaError::MalformedType))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(SchemaError::MalformedType),
        },
        other => return Err(SchemaError::InvalidSchema(json_kind(other))),
    };

    for name in &declared {
        if !KNOWN_TYPES.contains(name) {
            return Err(SchemaError::UnknownType((*name).to_string()));
        }
    }

    if declared.iter().any(|name| matches_type(data, name)) {
        Ok(accept())
    } else {
        Ok(reject(format!(
            "expected {}, got {}",
            declared.join(" | "),
            json_kind(data)
        )))
    }
}

fn accept() -> SchemaExecution {
    SchemaExecution {
        valid: true,
        note: None,
    }
}

fn reject(note: String) -> SchemaExecution {
    SchemaExecution {
        valid: false,
        note: Some(note),
    }
}

fn matches_type(data: &Value, name: &str) -> bool {
    match name {
        "null" => data.is_null(),
        "boolean" => data.is_boolean(),
        "integer" => match data {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        "number" => data.is_number(),
        "string" => data.is_string(),
        "array" => data.is_array(),
        "object" => data.is_object(),
        _ => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
