//! Configuration validation against a [`Schema`].
//!
//! # Example
//!
//! ```
//! use terraform_provider_sendgrid::schema::{Attribute, Schema};
//! use terraform_provider_sendgrid::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("email_to", Attribute::required_string())
//!     .with_attribute("percentage", Attribute::optional_int64());
//!
//! assert!(validate(&schema, &json!({"email_to": "ops@example.com"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"email_to": "ops@example.com", "percentage": "90"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("percentage".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Validate a configuration object against a schema.
///
/// - Unknown attributes are rejected
/// - Required attributes must be present and non-null
/// - Computed-only attributes cannot be configured
/// - Values must match the attribute type and any allowed values
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            check_missing_required(schema, &Map::new(), &mut diagnostics);
            return diagnostics;
        }
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(other))),
            );
            return diagnostics;
        }
    };

    for name in obj.keys() {
        if !schema.attributes.contains_key(name) {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported argument '{}'", name))
                    .with_detail("An argument with this name is not expected here")
                    .with_attribute(name.as_str()),
            );
        }
    }

    check_missing_required(schema, obj, &mut diagnostics);

    for (name, attr) in &schema.attributes {
        match obj.get(name) {
            None | Some(Value::Null) => {}
            Some(v) => validate_attribute(attr, v, name, &mut diagnostics),
        }
    }

    diagnostics
}

/// Like [`validate`], but returns `Err` with the diagnostics when any are produced.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Whether the value is valid against the schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn check_missing_required(
    schema: &Schema,
    obj: &Map<String, Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr) in &schema.attributes {
        let missing = matches!(obj.get(name), None | Some(Value::Null));
        if attr.flags.required && missing {
            diagnostics.push(
                Diagnostic::error(format!("Missing required attribute '{}'", name))
                    .with_detail("This attribute is required and must be provided")
                    .with_attribute(name.as_str()),
            );
        }
    }
}

fn validate_attribute(attr: &Attribute, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if attr.is_computed_only() {
        diagnostics.push(
            Diagnostic::error(format!("Invalid configuration for read-only attribute '{}'", path))
                .with_detail("This attribute is set by the provider and cannot be configured")
                .with_attribute(path),
        );
        return;
    }

    let before = diagnostics.len();
    validate_type(&attr.attr_type, value, path, diagnostics);

    // Only check allowed values once the type is right.
    if diagnostics.len() == before
        && !attr.allowed_values.is_empty()
        && !attr.allowed_values.iter().any(|allowed| values_equal(allowed, value))
    {
        let allowed: Vec<String> = attr.allowed_values.iter().map(Value::to_string).collect();
        diagnostics.push(
            Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                .with_detail(format!("Expected one of {}, got {}", allowed.join(", "), value))
                .with_attribute(path),
        );
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            let Some(items) = value.as_array() else {
                let expected = if attr_type.is_set() { "set" } else { "list" };
                diagnostics.push(type_error(path, expected, value));
                return;
            };
            for (i, item) in items.iter().enumerate() {
                validate_type(element_type, item, &format!("{}.{}", path, i), diagnostics);
            }
            if attr_type.is_set() {
                check_duplicates(items, path, diagnostics);
            }
        }
        AttributeType::Object(fields) => match value.as_object() {
            Some(obj) => validate_object(fields, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

fn validate_object(
    fields: &BTreeMap<String, AttributeType>,
    obj: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, field_type) in fields {
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_type(field_type, value, &format!("{}.{}", path, name), diagnostics);
        }
    }
}

fn check_duplicates(items: &[Value], path: &str, diagnostics: &mut Vec<Diagnostic>) {
    for (i, item) in items.iter().enumerate() {
        if items[..i].iter().any(|earlier| earlier == item) {
            diagnostics.push(
                Diagnostic::error(format!("Duplicate set element in '{}'", path))
                    .with_detail(format!("{} appears more than once", item))
                    .with_attribute(format!("{}.{}", path, i)),
            );
        }
    }
}

/// Compare two JSON values, treating numbers by numeric value.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64()
                || n.as_f64().is_some_and(|f| {
                    f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
                })
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}
