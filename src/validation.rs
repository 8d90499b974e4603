//! Schema validation helpers.
//!
//! Values are checked in one of two modes:
//!
//! - **config**: what the user wrote. Required attributes must be present,
//!   read-only attributes and undeclared names are rejected.
//! - **state**: what the orchestrator plans to apply. Required attributes must
//!   be present; read-only attributes may carry values from a previous read and
//!   are only type-checked.
//!
//! [`check_value`] type-checks a single attribute or block on its own; the
//! state container runs it on every write.
//!
//! # Example
//!
//! ```
//! use prismacloud_provider::schema::{Attribute, Schema};
//! use prismacloud_provider::validation::validate_config;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("last_modified_by", Attribute::computed_string());
//!
//! assert!(validate_config(&schema, &json!({"name": "grp1"})).is_empty());
//!
//! let diagnostics = validate_config(&schema, &json!({"name": "grp1", "last_modified_by": "me"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("last_modified_by"));
//! ```

use serde_json::Value;

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Config,
    State,
    Write,
}

/// Validate a planned state value against a schema.
///
/// Returns a list of diagnostics; an empty list means the value is valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", Mode::State, &mut diagnostics);
    diagnostics
}

/// Validate user configuration against a schema.
///
/// Stricter than [`validate`]: read-only attributes and names the schema does
/// not declare are errors.
pub fn validate_config(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", Mode::Config, &mut diagnostics);
    diagnostics
}

/// Check whether a planned state value is valid.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Type-check a single value destined for `name` in `block`.
///
/// Presence rules are not applied; a null value is always accepted. Writing a
/// name the block does not declare is an error.
pub fn check_value(block: &Block, name: &str, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if let Some(attr) = block.attributes.get(name) {
        if !value.is_null() {
            validate_attribute_value(attr, value, name, Mode::Write, &mut diagnostics);
        }
    } else if let Some(nested) = block.blocks.get(name) {
        validate_nested_block(nested, Some(value), name, Mode::Write, &mut diagnostics);
    } else {
        diagnostics.push(
            Diagnostic::error(format!("Unsupported attribute '{}'", name))
                .with_detail("The schema does not declare this attribute")
                .with_attribute(name),
        );
    }
    diagnostics
}

fn validate_block(
    block: &Block,
    value: &Value,
    path: &str,
    mode: Mode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let diagnostic = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)));
            diagnostics.push(if path.is_empty() {
                diagnostic
            } else {
                diagnostic.with_attribute(path)
            });
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, mode, diagnostics);
    }

    for (name, nested) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested, obj.get(name), &block_path, mode, diagnostics);
    }

    if mode == Mode::Config {
        for name in obj.keys().filter(|name| !block.declares(name)) {
            let attr_path = join_path(path, name);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported argument '{}'", attr_path))
                    .with_detail("An argument with this name is not expected here")
                    .with_attribute(attr_path),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    mode: Mode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let value = match value {
        None | Some(Value::Null) => {
            if attr.flags.required && mode != Mode::Write {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
            return;
        },
        Some(v) => v,
    };

    if attr.flags.is_read_only() && mode == Mode::Config {
        diagnostics.push(
            Diagnostic::error(format!("Attribute '{}' is read-only", path))
                .with_detail("This value is computed by Prisma Cloud and cannot be configured")
                .with_attribute(path),
        );
        return;
    }

    validate_attribute_value(attr, value, path, mode, diagnostics);
}

fn validate_attribute_value(
    attr: &Attribute,
    value: &Value,
    path: &str,
    mode: Mode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let before = diagnostics.len();
    validate_attribute_type(&attr.attr_type, value, path, diagnostics);

    // Computed values come from the API and are never restricted.
    let restricted = !attr.allowed_values.is_empty() && mode != Mode::Write;
    if diagnostics.len() == before && restricted {
        if let Some(text) = value.as_str() {
            if !attr.allowed_values.iter().any(|allowed| allowed == text) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                        .with_detail(format!(
                            "Expected one of [{}], got {:?}",
                            attr.allowed_values.join(", "),
                            text
                        ))
                        .with_attribute(path),
                );
            }
        }
    }
}

fn validate_attribute_type(
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
        },
        AttributeType::Int64 => {
            if !value.is_i64() && !value.is_u64() {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, item, &item_path, diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Object(fields) => match value.as_object() {
            Some(obj) => {
                for (name, field_type) in fields {
                    if let Some(field) = obj.get(name).filter(|v| !v.is_null()) {
                        let field_path = join_path(path, name);
                        validate_attribute_type(field_type, field, &field_path, diagnostics);
                    }
                }
            },
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    mode: Mode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let value = match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 && mode != Mode::Write {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
            return;
        },
        Some(v) => v,
    };

    match (nested.nesting_mode, value) {
        (BlockNestingMode::Single, Value::Object(_)) => {
            validate_block(&nested.block, value, path, mode, diagnostics);
        },
        // Orchestrators commonly encode a single block as a one-element list.
        (BlockNestingMode::Single, Value::Array(items)) if !items.is_empty() => {
            check_item_count(nested, items.len(), path, mode, diagnostics);
            for item in items {
                validate_block(&nested.block, item, path, mode, diagnostics);
            }
        },
        (BlockNestingMode::List, Value::Array(items)) => {
            check_item_count(nested, items.len(), path, mode, diagnostics);
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, mode, diagnostics);
            }
        },
        (mode, other) => {
            let expected = match mode {
                BlockNestingMode::Single => "object",
                BlockNestingMode::List => "list",
            };
            diagnostics.push(
                Diagnostic::error(format!("Expected {} for block '{}'", expected, path))
                    .with_detail(format!("Got {}", value_type_name(other)))
                    .with_attribute(path),
            );
        },
    }
}

fn check_item_count(
    nested: &NestedBlock,
    len: usize,
    path: &str,
    mode: Mode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    if len < nested.min_items && mode != Mode::Write {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
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

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}
