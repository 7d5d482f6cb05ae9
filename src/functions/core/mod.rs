//! General-purpose functions that know nothing about OpenAPI.

mod alphabetical;
mod blank;
mod casing;
mod defined;
mod enumeration;
mod length;
mod pattern;
mod schema;
mod truthy;
mod xor;

pub use alphabetical::Alphabetical;
pub use blank::Blank;
pub use casing::{Casing, CasingType};
pub use defined::{Defined, Undefined};
pub use enumeration::Enumeration;
pub use length::Length;
pub use pattern::{Pattern, compile_pattern};
pub use schema::Schema;
pub use truthy::{Falsy, Truthy};
pub use xor::Xor;

use crate::document::{Document, NodeId, ScalarType};

/// Render a scalar for messages; containers render as their kind
pub(crate) fn display_value(document: &Document, node: NodeId) -> String {
    if document.is_scalar(node) {
        document.value(node).to_string()
    } else if document.is_mapping(node) {
        "object".to_string()
    } else {
        "array".to_string()
    }
}

/// Format a float without a trailing `.0` when it is whole
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Name to use for a node in messages: its key, or the field it came from
pub(crate) fn node_label(document: &Document, node: NodeId, field: &str) -> String {
    if !field.is_empty() {
        return field.to_string();
    }
    match document.key_of(node) {
        Some(key) if document.scalar_type(key) == Some(ScalarType::Str) => {
            document.value(key).to_string()
        }
        Some(key) => document.value(key).to_string(),
        None => display_value(document, node),
    }
}
