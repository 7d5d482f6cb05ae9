//! Canonical JSONPath rendering.
//!
//! Fixed OpenAPI fields render with dot notation; keys chosen by the spec
//! author (path templates, component names, property names, status codes...)
//! render in brackets so the same location always produces the same string.

use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Fields whose children are author-chosen names
const NAMED_CONTAINERS: &[&str] = &[
    "paths",
    "schemas",
    "properties",
    "patternProperties",
    "responses",
    "parameters",
    "securitySchemes",
    "securityDefinitions",
    "definitions",
    "headers",
    "examples",
    "requestBodies",
    "links",
    "callbacks",
    "content",
    "webhooks",
    "encoding",
    "variables",
    "scopes",
    "pathItems",
    "mapping",
    "dependentSchemas",
    "$defs",
];

pub fn render(segments: &[PathSegment]) -> String {
    let mut out = String::from("$");
    // The previous key, and whether it was itself an author-chosen name
    let mut previous: Option<(&str, bool)> = None;

    for segment in segments {
        match segment {
            PathSegment::Index(index) => {
                let _ = write!(out, "[{}]", index);
                previous = None;
            }
            PathSegment::Key(key) => {
                let named =
                    matches!(previous, Some((prev, false)) if NAMED_CONTAINERS.contains(&prev));
                if named || !is_plain_identifier(key) {
                    let _ = write!(out, "['{}']", key.replace('\'', "\\'"));
                } else {
                    out.push('.');
                    out.push_str(key);
                }
                previous = Some((key.as_str(), named));
            }
        }
    }
    out
}

fn is_plain_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Operation path template named by a canonical path, e.g. `/pets/{id}`
pub fn operation_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("$.paths['")?;
    let end = rest.find("']")?;
    Some(&rest[..end])
}

/// Whether `path` equals `ancestor` or points somewhere beneath it
pub fn is_descendant_path(path: &str, ancestor: &str) -> bool {
    match path.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => rest.starts_with('.') || rest.starts_with('['),
        None => false,
    }
}
