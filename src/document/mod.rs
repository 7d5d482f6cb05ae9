//! Positioned document model shared by every rule.
//!
//! A spec (plus any file it references) is parsed once into an arena of
//! [`Node`]s. Two roots hang off the same arena: the raw source tree
//! ([`View::Unresolved`]) and a `$ref`-dereferenced copy ([`View::Resolved`]).
//! Nodes are addressed by [`NodeId`] handles so rule tasks can share the
//! arena behind an `Arc` without borrowing across threads.

pub mod locator;
mod parser;
pub mod path;
pub mod resolver;

pub use locator::Locator;
pub use parser::parse_into;
pub use path::PathSegment;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Key used inside specs to suppress rules on a mapping and its descendants.
pub const INLINE_IGNORE_KEY: &str = "x-lint-ignore";

/// Handle to a node in a [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Index of a file in the document's rolodex (0 is the root spec)
pub type FileId = usize;

/// Which tree a rule sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// The source exactly as written
    Unresolved,
    /// The source with every resolvable `$ref` replaced by its target
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Mapping,
    Sequence,
    Scalar,
}

/// Resolved type of a scalar (YAML 1.2 core schema)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Str,
    Int,
    Float,
    Bool,
    Null,
}

/// 1-based line and column of a node in its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Scalar text; empty for containers
    pub value: String,
    pub scalar: ScalarType,
    pub position: Position,
    pub parent: Option<NodeId>,
    /// Sequence items, or alternating key/value pairs for mappings
    pub children: Vec<NodeId>,
    pub file: FileId,
    /// For resolved copies, the node this one was copied from
    pub source: Option<NodeId>,
}

/// A file loaded into the arena
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub location: String,
    pub root: Option<NodeId>,
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    files: Vec<SourceFile>,
    resolved_root: Option<NodeId>,
    unresolved_json: OnceLock<Value>,
    resolved_json: OnceLock<Value>,
}

impl Document {
    /// Create an empty document whose root file lives at `location`
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            files: vec![SourceFile {
                location: location.into(),
                root: None,
            }],
            resolved_root: None,
            unresolved_json: OnceLock::new(),
            resolved_json: OnceLock::new(),
        }
    }

    /// Parse a single spec into a fresh document
    pub fn parse(bytes: &[u8], location: impl Into<String>) -> crate::Result<Self> {
        let mut document = Self::new(location);
        parse_into(&mut document, bytes, 0)?;
        Ok(document)
    }

    /// Parse a single spec, keeping whatever parsed before a syntax error
    pub fn parse_partial(
        bytes: &[u8],
        location: impl Into<String>,
    ) -> (Self, Option<crate::LintError>) {
        let mut document = Self::new(location);
        let error = parse_into(&mut document, bytes, 0).err();
        (document, error)
    }

    pub fn root(&self, view: View) -> Option<NodeId> {
        match view {
            View::Unresolved => self.files[0].root,
            View::Resolved => self.resolved_root.or(self.files[0].root),
        }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file_location(&self, file: FileId) -> &str {
        self.files
            .get(file)
            .map(|f| f.location.as_str())
            .unwrap_or_default()
    }

    pub fn file_by_location(&self, location: &str) -> Option<FileId> {
        self.files.iter().position(|f| f.location == location)
    }

    pub(crate) fn add_file(&mut self, location: impl Into<String>) -> FileId {
        self.files.push(SourceFile {
            location: location.into(),
            root: None,
        });
        self.files.len() - 1
    }

    pub(crate) fn set_file_root(&mut self, file: FileId, root: NodeId) {
        if let Some(f) = self.files.get_mut(file) {
            f.root = Some(root);
        }
    }

    pub(crate) fn set_resolved_root(&mut self, root: Option<NodeId>) {
        self.resolved_root = root;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        if let Some(parent) = node.parent {
            self.nodes[parent.0].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    /// Deep copy `src` under `parent`, keeping source positions
    pub(crate) fn copy_subtree(&mut self, src: NodeId, parent: Option<NodeId>) -> NodeId {
        let original = self.node(src).clone();
        let id = self.push(Node {
            children: Vec::new(),
            parent,
            source: Some(src),
            ..original.clone()
        });
        for child in original.children {
            self.copy_subtree(child, Some(id));
        }
        id
    }

    /// Number of nodes in the subtree rooted at `id`, itself included
    pub(crate) fn subtree_len(&self, id: NodeId) -> usize {
        let mut pending = vec![id];
        let mut count = 0;
        while let Some(next) = pending.pop() {
            count += 1;
            pending.extend_from_slice(self.children(next));
        }
        count
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn is_mapping(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Mapping
    }

    pub fn is_sequence(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Sequence
    }

    pub fn is_scalar(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Scalar
    }

    pub fn value(&self, id: NodeId) -> &str {
        &self.node(id).value
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn position(&self, id: NodeId) -> Position {
        self.node(id).position
    }

    pub fn file(&self, id: NodeId) -> FileId {
        self.node(id).file
    }

    /// Key/value pairs of a mapping; empty for anything else
    pub fn entries(&self, id: NodeId) -> impl DoubleEndedIterator<Item = (NodeId, NodeId)> + '_ {
        let children: &[NodeId] = if self.is_mapping(id) {
            self.children(id)
        } else {
            &[]
        };
        children.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Entries a rule may target: every pair except an `x-lint-ignore` directive
    pub fn lint_entries(
        &self,
        id: NodeId,
    ) -> impl DoubleEndedIterator<Item = (NodeId, NodeId)> + '_ {
        self.entries(id)
            .filter(|(key, _)| self.value(*key) != INLINE_IGNORE_KEY)
    }

    /// Items of a sequence; empty for anything else
    pub fn items(&self, id: NodeId) -> &[NodeId] {
        if self.is_sequence(id) {
            self.children(id)
        } else {
            &[]
        }
    }

    /// Value for `key` in a mapping (last occurrence wins, matching JSON semantics)
    pub fn get(&self, map: NodeId, key: &str) -> Option<NodeId> {
        self.entries(map)
            .rev()
            .find(|(k, _)| self.value(*k) == key)
            .map(|(_, v)| v)
    }

    /// Key node that holds `key` in a mapping
    pub fn get_key(&self, map: NodeId, key: &str) -> Option<NodeId> {
        self.entries(map)
            .rev()
            .find(|(k, _)| self.value(*k) == key)
            .map(|(k, _)| k)
    }

    pub fn has(&self, map: NodeId, key: &str) -> bool {
        self.get(map, key).is_some()
    }

    /// Scalar text for `key`, if the value is a scalar
    pub fn get_str(&self, map: NodeId, key: &str) -> Option<&str> {
        self.get(map, key)
            .filter(|v| self.is_scalar(*v))
            .map(|v| self.value(v))
    }

    /// Walk a dotted path of keys (`a.b.c`); numeric segments index sequences
    pub fn get_dotted(&self, start: NodeId, dotted: &str) -> Option<NodeId> {
        let mut current = start;
        for part in dotted.split('.').filter(|p| !p.is_empty()) {
            current = if self.is_sequence(current) {
                let index: usize = part.parse().ok()?;
                *self.items(current).get(index)?
            } else {
                self.get(current, part)?
            };
        }
        Some(current)
    }

    pub fn len_of(&self, id: NodeId) -> usize {
        match self.kind(id) {
            NodeKind::Mapping => self.children(id).len() / 2,
            NodeKind::Sequence => self.children(id).len(),
            NodeKind::Scalar => 0,
        }
    }

    pub fn scalar_type(&self, id: NodeId) -> Option<ScalarType> {
        self.is_scalar(id).then(|| self.node(id).scalar)
    }

    pub fn as_str(&self, id: NodeId) -> Option<&str> {
        self.is_scalar(id).then(|| self.value(id))
    }

    pub fn as_bool(&self, id: NodeId) -> Option<bool> {
        match self.scalar_type(id)? {
            ScalarType::Bool => Some(self.value(id).eq_ignore_ascii_case("true")),
            _ => None,
        }
    }

    pub fn as_f64(&self, id: NodeId) -> Option<f64> {
        match self.scalar_type(id)? {
            ScalarType::Int => parser::parse_int(self.value(id)).map(|v| v as f64),
            ScalarType::Float => parser::parse_float(self.value(id)),
            _ => None,
        }
    }

    pub fn as_i64(&self, id: NodeId) -> Option<i64> {
        match self.scalar_type(id)? {
            ScalarType::Int => parser::parse_int(self.value(id)),
            _ => None,
        }
    }

    pub fn is_null(&self, id: NodeId) -> bool {
        self.scalar_type(id) == Some(ScalarType::Null)
    }

    /// Truthiness: null, `false`, `0`, empty strings and empty containers are falsy
    pub fn is_truthy(&self, id: NodeId) -> bool {
        let node = self.node(id);
        match node.kind {
            NodeKind::Mapping | NodeKind::Sequence => !node.children.is_empty(),
            NodeKind::Scalar => match node.scalar {
                ScalarType::Null => false,
                ScalarType::Bool => node.value.eq_ignore_ascii_case("true"),
                ScalarType::Int | ScalarType::Float => self.as_f64(id).is_some_and(|v| v != 0.0),
                ScalarType::Str => !node.value.is_empty() && node.value != "false",
            },
        }
    }

    /// Mapping that holds `id` as a key or value
    pub fn owning_mapping(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_mapping(*p))
    }

    /// Whether `id` sits in a key slot of its parent mapping
    pub fn is_key(&self, id: NodeId) -> bool {
        match self.owning_mapping(id) {
            Some(parent) => self
                .children(parent)
                .iter()
                .position(|c| *c == id)
                .is_some_and(|i| i % 2 == 0),
            None => false,
        }
    }

    /// Key node paired with a mapping value
    pub fn key_of(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.owning_mapping(id)?;
        let children = self.children(parent);
        let index = children.iter().position(|c| *c == id)?;
        (index % 2 == 1).then(|| children[index - 1])
    }

    /// Parents of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Whether `ancestor` is `id` or one of its parents
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Path segments from the file root down to `id`.
    ///
    /// A key node reports the path of the entry it names.
    pub fn segments_of(&self, id: NodeId) -> Vec<PathSegment> {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let children = self.children(parent);
            let index = children.iter().position(|c| *c == current).unwrap_or(0);
            match self.kind(parent) {
                NodeKind::Mapping => {
                    let key = if index % 2 == 0 {
                        children[index]
                    } else {
                        children[index - 1]
                    };
                    segments.push(PathSegment::Key(self.value(key).to_string()));
                }
                _ => segments.push(PathSegment::Index(index)),
            }
            current = parent;
        }
        segments.reverse();
        segments
    }

    /// Canonical JSONPath of a node, e.g. `$.paths['/pets'].get.parameters[0]`
    pub fn path_of(&self, id: NodeId) -> String {
        path::render(&self.segments_of(id))
    }

    /// Follow key/index segments down from `start`
    pub fn descend(&self, start: NodeId, segments: &[PathSegment]) -> Option<NodeId> {
        let mut current = start;
        for segment in segments {
            current = match segment {
                PathSegment::Key(key) => self.get(current, key)?,
                PathSegment::Index(index) => *self.items(current).get(*index)?,
            };
        }
        Some(current)
    }

    /// Position just past the last character covered by `id`
    pub fn end_position(&self, id: NodeId) -> Position {
        let mut last = id;
        while let Some(child) = self.children(last).last() {
            last = *child;
        }
        let node = self.node(last);
        if node.kind == NodeKind::Scalar {
            let width = node.value.lines().last().map(|l| l.chars().count()).unwrap_or(0);
            Position::new(node.position.line, node.position.column + width)
        } else {
            node.position
        }
    }

    /// Rule ids listed by an `x-lint-ignore` key on a mapping
    pub fn inline_ignores(&self, id: NodeId) -> Vec<&str> {
        if !self.is_mapping(id) {
            return Vec::new();
        }
        match self.get(id, INLINE_IGNORE_KEY) {
            Some(value) if self.is_scalar(value) => vec![self.value(value)],
            Some(value) => self
                .items(value)
                .iter()
                .filter(|item| self.is_scalar(**item))
                .map(|item| self.value(*item))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether the node is the `x-lint-ignore` key, its value, or inside that value
    pub fn is_inline_ignore_directive(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if let Some(parent) = self.owning_mapping(current) {
                let children = self.children(parent);
                if let Some(index) = children.iter().position(|c| *c == current) {
                    let key = if index % 2 == 0 {
                        children[index]
                    } else {
                        children[index - 1]
                    };
                    if self.value(key) == INLINE_IGNORE_KEY {
                        return true;
                    }
                }
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// JSON projection of a view, built once and cached
    pub fn json(&self, view: View) -> &Value {
        let cell = match view {
            View::Unresolved => &self.unresolved_json,
            View::Resolved => &self.resolved_json,
        };
        cell.get_or_init(|| match self.root(view) {
            Some(root) => self.to_json(root),
            None => Value::Null,
        })
    }

    /// Convert a subtree to JSON
    pub fn to_json(&self, id: NodeId) -> Value {
        let node = self.node(id);
        match node.kind {
            NodeKind::Mapping => {
                let mut map = Map::new();
                for (k, v) in self.entries(id) {
                    map.insert(self.value(k).to_string(), self.to_json(v));
                }
                Value::Object(map)
            }
            NodeKind::Sequence => {
                Value::Array(node.children.iter().map(|c| self.to_json(*c)).collect())
            }
            NodeKind::Scalar => match node.scalar {
                ScalarType::Null => Value::Null,
                ScalarType::Bool => Value::Bool(node.value.eq_ignore_ascii_case("true")),
                ScalarType::Int => parser::parse_int(&node.value)
                    .map(Value::from)
                    .unwrap_or_else(|| Value::String(node.value.clone())),
                ScalarType::Float => parser::parse_float(&node.value)
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(node.value.clone())),
                ScalarType::Str => Value::String(node.value.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: "1.0"
  x-lint-ignore: [info-contact]
paths:
  /pets:
    get:
      parameters:
        - name: limit
          in: query
"#;

    #[test]
    fn test_canonical_paths() {
        let doc = Document::parse(SPEC.as_bytes(), "spec.yaml").unwrap();
        let root = doc.root(View::Unresolved).unwrap();
        let param = doc.get_dotted(root, "paths./pets.get.parameters.0").unwrap();
        assert_eq!(doc.path_of(param), "$.paths['/pets'].get.parameters[0]");
        let title = doc.get_dotted(root, "info.title").unwrap();
        assert_eq!(doc.path_of(title), "$.info.title");
    }

    #[test]
    fn test_scalar_types_and_truthiness() {
        let doc = Document::parse(
            b"a: 0\nb: 'false'\nc: ~\nd: [1]\ne: 1.5\nf: \"3\"\n",
            "t.yaml",
        )
        .unwrap();
        let root = doc.root(View::Unresolved).unwrap();
        assert!(!doc.is_truthy(doc.get(root, "a").unwrap()));
        assert!(!doc.is_truthy(doc.get(root, "b").unwrap()));
        assert!(doc.is_null(doc.get(root, "c").unwrap()));
        assert!(doc.is_truthy(doc.get(root, "d").unwrap()));
        assert_eq!(doc.as_f64(doc.get(root, "e").unwrap()), Some(1.5));
        assert_eq!(doc.scalar_type(doc.get(root, "f").unwrap()), Some(ScalarType::Str));
    }

    #[test]
    fn test_inline_ignores() {
        let doc = Document::parse(SPEC.as_bytes(), "spec.yaml").unwrap();
        let root = doc.root(View::Unresolved).unwrap();
        let info = doc.get(root, "info").unwrap();
        assert_eq!(doc.inline_ignores(info), vec!["info-contact"]);
        let directive = doc.get(info, INLINE_IGNORE_KEY).unwrap();
        assert!(doc.is_inline_ignore_directive(directive));
        assert!(doc.is_inline_ignore_directive(doc.items(directive)[0]));
        assert!(!doc.is_inline_ignore_directive(doc.get(info, "title").unwrap()));
    }

    #[test]
    fn test_lint_entries_skip_directive() {
        let doc = Document::parse(SPEC.as_bytes(), "spec.yaml").unwrap();
        let root = doc.root(View::Unresolved).unwrap();
        let info = doc.get(root, "info").unwrap();
        let keys: Vec<&str> = doc.lint_entries(info).map(|(k, _)| doc.value(k)).collect();
        assert_eq!(keys, vec!["title", "version"]);
        assert_eq!(doc.entries(info).count(), 3);
    }

    #[test]
    fn test_json_projection() {
        let doc = Document::parse(SPEC.as_bytes(), "spec.yaml").unwrap();
        let json = doc.json(View::Unresolved);
        assert_eq!(json["info"]["version"], "1.0");
        assert_eq!(json["paths"]["/pets"]["get"]["parameters"][0]["in"], "query");
    }

    #[test]
    fn test_positions_increase_down_the_file() {
        let doc = Document::parse(SPEC.as_bytes(), "spec.yaml").unwrap();
        let root = doc.root(View::Unresolved).unwrap();
        let info = doc.get(root, "info").unwrap();
        let paths = doc.get(root, "paths").unwrap();
        assert!(doc.position(info).line < doc.position(paths).line);
        assert!(doc.end_position(info).line >= doc.position(info).line);
    }
}
