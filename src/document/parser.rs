use super::{Document, FileId, Node, NodeId, NodeKind, Position, ScalarType};
use crate::error::{LintError, Result};
use std::collections::HashMap;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Most nodes aliases may add to one file before parsing gives up
pub const ALIAS_EXPANSION_LIMIT: usize = 100_000;

/// Parse YAML or JSON bytes into `document` as the root of `file`.
///
/// Nodes built before a syntax error stay in the arena, so callers can still
/// lint whatever parsed.
pub fn parse_into(document: &mut Document, bytes: &[u8], file: FileId) -> Result<Option<NodeId>> {
    let source = std::str::from_utf8(bytes)
        .map_err(|e| LintError::DocumentParse(format!("document is not valid UTF-8: {}", e)))?;
    let source = source.trim_start_matches('\u{feff}');

    let mut builder = TreeBuilder {
        document,
        file,
        stack: Vec::new(),
        anchors: HashMap::new(),
        root: None,
        expanded: 0,
        overflowed: false,
    };

    let mut parser = Parser::new_from_str(source);
    let outcome = parser.load(&mut builder, false);

    let root = builder.root;
    let overflowed = builder.overflowed;
    if let Some(root) = root {
        builder.document.set_file_root(file, root);
    }

    outcome.map_err(|e| LintError::DocumentParse(e.to_string()))?;
    if overflowed {
        return Err(LintError::DocumentParse(format!(
            "aliases expand to more than {} nodes",
            ALIAS_EXPANSION_LIMIT
        )));
    }
    Ok(root)
}

struct TreeBuilder<'d> {
    document: &'d mut Document,
    file: FileId,
    /// Containers still open
    stack: Vec<NodeId>,
    anchors: HashMap<usize, NodeId>,
    root: Option<NodeId>,
    /// Nodes added by alias copies so far
    expanded: usize,
    overflowed: bool,
}

impl TreeBuilder<'_> {
    fn attach(
        &mut self,
        kind: NodeKind,
        value: String,
        scalar: ScalarType,
        mark: Marker,
    ) -> NodeId {
        let id = self.document.push(Node {
            kind,
            value,
            scalar,
            position: Position::new(mark.line().max(1), mark.col() + 1),
            parent: self.stack.last().copied(),
            children: Vec::new(),
            file: self.file,
            source: None,
        });
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    fn remember(&mut self, anchor: usize, id: NodeId) {
        if anchor > 0 {
            self.anchors.insert(anchor, id);
        }
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, event: Event, mark: Marker) {
        match event {
            Event::MappingStart(anchor, _) => {
                let id = self.attach(NodeKind::Mapping, String::new(), ScalarType::Null, mark);
                self.remember(anchor, id);
                self.stack.push(id);
            }
            Event::SequenceStart(anchor, _) => {
                let id = self.attach(NodeKind::Sequence, String::new(), ScalarType::Null, mark);
                self.remember(anchor, id);
                self.stack.push(id);
            }
            Event::MappingEnd | Event::SequenceEnd => {
                self.stack.pop();
            }
            Event::Scalar(value, style, anchor, _) => {
                let scalar = if style == TScalarStyle::Plain {
                    resolve_plain(&value)
                } else {
                    ScalarType::Str
                };
                let id = self.attach(NodeKind::Scalar, value, scalar, mark);
                self.remember(anchor, id);
            }
            Event::Alias(anchor) => {
                if self.overflowed {
                    return;
                }
                if let Some(target) = self.anchors.get(&anchor).copied() {
                    let size = self.document.subtree_len(target);
                    if self.expanded + size > ALIAS_EXPANSION_LIMIT {
                        tracing::warn!("Alias expansion stopped after {} nodes", self.expanded);
                        self.overflowed = true;
                        return;
                    }
                    self.expanded += size;
                    let parent = self.stack.last().copied();
                    let copy = self.document.copy_subtree(target, parent);
                    if self.root.is_none() {
                        self.root = Some(copy);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Resolve an unquoted scalar to its core-schema type
fn resolve_plain(value: &str) -> ScalarType {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => ScalarType::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => ScalarType::Bool,
        _ if parse_int(value).is_some() => ScalarType::Int,
        _ if parse_float(value).is_some() => ScalarType::Float,
        _ => ScalarType::Str,
    }
}

pub(crate) fn parse_int(value: &str) -> Option<i64> {
    if let Some(hex) = value.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(octal) = value.strip_prefix("0o") {
        return i64::from_str_radix(octal, 8).ok();
    }
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

pub(crate) fn parse_float(value: &str) -> Option<f64> {
    match value {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => return Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => return Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Some(f64::NAN),
        _ => {}
    }
    let well_formed = value.bytes().any(|b| b.is_ascii_digit())
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'-' | b'+'));
    if !well_formed {
        return None;
    }
    value.parse().ok()
}
