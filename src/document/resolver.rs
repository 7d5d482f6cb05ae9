//! `$ref` resolution: the rolodex of referenced files and the resolved view.

use super::{Document, FileId, Node, NodeId, View, parse_into};
use crate::error::LintError;
use std::collections::{HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

/// Upper bound on nodes created while expanding references
const MAX_RESOLVED_NODES: usize = 2_000_000;

/// Upper bound on files pulled into the rolodex
const MAX_ROLODEX_FILES: usize = 512;

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Fetch `http(s)` references
    pub allow_lookup: bool,
    /// Follow `$ref`s that live under `x-` extension keys
    pub extract_references_from_extensions: bool,
}

/// A `$ref` whose target is already being expanded higher up the tree
#[derive(Debug, Clone)]
pub struct CircularReference {
    pub definition: String,
    /// The `$ref` mapping left in place in the resolved view
    pub site: NodeId,
    /// The loop passes through `items`
    pub array: bool,
    /// The loop passes through `anyOf` / `oneOf` / `allOf`
    pub polymorphic: bool,
    /// Every step of the loop is mandatory, so no finite instance exists
    pub infinite: bool,
}

#[derive(Debug, Clone)]
pub struct UnresolvedReference {
    pub definition: String,
    pub site: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    pub circular: Vec<CircularReference>,
    pub unresolved: Vec<UnresolvedReference>,
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Split `file.yaml#/a/b` into its location and fragment parts
pub fn split_reference(reference: &str) -> (&str, &str) {
    match reference.split_once('#') {
        Some((location, fragment)) => (location, fragment),
        None => (reference, ""),
    }
}

/// Resolve `relative` against the location of the file that mentions it
pub fn resolve_location(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    if is_remote(relative) {
        return relative.to_string();
    }
    if is_remote(base) {
        return reqwest::Url::parse(base)
            .and_then(|url| url.join(relative))
            .map(|url| url.to_string())
            .unwrap_or_else(|_| relative.to_string());
    }
    let relative_path = Path::new(relative);
    if relative_path.is_absolute() {
        return normalize(relative_path).to_string_lossy().into_owned();
    }
    let directory = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    normalize(&directory.join(relative_path))
        .to_string_lossy()
        .into_owned()
}

/// Lexically collapse `.` and `..` without touching the filesystem
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Decode one JSON pointer token (`~1`, `~0` and `%XX` escapes)
fn decode_token(token: &str) -> String {
    let unescaped = token.replace("~1", "/").replace("~0", "~");
    if !unescaped.contains('%') {
        return unescaped;
    }
    let bytes = unescaped.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = [bytes[i + 1], bytes[i + 2]];
            if let Some(byte) = std::str::from_utf8(&hex)
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(decoded).unwrap_or(unescaped)
}

impl Document {
    /// The `$ref` string of a reference mapping
    pub fn reference_of(&self, id: NodeId) -> Option<&str> {
        if !self.is_mapping(id) {
            return None;
        }
        self.get(id, "$ref")
            .filter(|v| self.is_scalar(*v))
            .map(|v| self.value(v))
    }

    /// Target of a JSON pointer fragment inside `file`
    pub fn resolve_pointer(&self, file: FileId, fragment: &str) -> Option<NodeId> {
        let mut current = self.files().get(file)?.root?;
        let fragment = fragment.trim_start_matches('/');
        if fragment.is_empty() {
            return Some(current);
        }
        for token in fragment.split('/') {
            let token = decode_token(token);
            current = if self.is_sequence(current) {
                *self.items(current).get(token.parse::<usize>().ok()?)?
            } else {
                self.get(current, &token)?
            };
        }
        Some(current)
    }

    /// Target of `reference` as written inside the file that holds `site`
    pub fn resolve_reference(&self, site: NodeId, reference: &str) -> Option<NodeId> {
        let (location, fragment) = split_reference(reference);
        let file = if location.is_empty() {
            self.file(site)
        } else {
            let base = self.file_location(self.file(site));
            self.file_by_location(&resolve_location(base, location))?
        };
        self.resolve_pointer(file, fragment)
    }

    /// Chase a chain of `$ref` mappings to the first non-reference node
    pub fn follow(&self, id: NodeId) -> NodeId {
        let mut current = id;
        let mut seen = HashSet::new();
        while let Some(reference) = self.reference_of(current) {
            if !seen.insert(current) {
                break;
            }
            match self.resolve_reference(current, reference) {
                Some(target) => current = target,
                None => break,
            }
        }
        current
    }

    /// All `$ref` strings in a file, with the mapping that holds each
    pub fn reference_sites(&self, file: FileId, include_extensions: bool) -> Vec<(NodeId, String)> {
        let mut sites = Vec::new();
        let Some(root) = self.files().get(file).and_then(|f| f.root) else {
            return sites;
        };
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            if let Some(reference) = self.reference_of(id) {
                sites.push((id, reference.to_string()));
            }
            if self.is_mapping(id) {
                for (key, value) in self.entries(id) {
                    if !include_extensions && self.value(key).starts_with("x-") {
                        continue;
                    }
                    pending.push(value);
                }
            } else {
                pending.extend(self.items(id).iter().copied());
            }
        }
        sites.sort();
        sites
    }
}

/// Pull every file reachable through `$ref`s into the document.
///
/// Failures are returned, not raised: a missing file only leaves its
/// references unresolved.
pub async fn load_rolodex(
    document: &mut Document,
    options: &ResolveOptions,
    client: Option<&reqwest::Client>,
) -> Vec<LintError> {
    let mut errors = Vec::new();
    let mut failed: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<FileId> = VecDeque::from([0]);

    while let Some(file) = queue.pop_front() {
        let base = document.file_location(file).to_string();
        let mut locations: Vec<String> = document
            .reference_sites(file, options.extract_references_from_extensions)
            .into_iter()
            .map(|(_, reference)| split_reference(&reference).0.to_string())
            .filter(|location| !location.is_empty())
            .map(|location| resolve_location(&base, &location))
            .collect();
        locations.sort();
        locations.dedup();

        for location in locations {
            if document.file_by_location(&location).is_some() || failed.contains(&location) {
                continue;
            }
            if document.files().len() >= MAX_ROLODEX_FILES {
                tracing::warn!("Rolodex file limit reached, not loading {}", location);
                failed.insert(location);
                continue;
            }
            match fetch(&location, options, client).await {
                Ok(bytes) => {
                    let id = document.add_file(location.clone());
                    if let Err(e) = parse_into(document, &bytes, id) {
                        tracing::warn!("Referenced file {} failed to parse: {}", location, e);
                        errors.push(e);
                    }
                    queue.push_back(id);
                }
                Err(e) => {
                    tracing::warn!("Cannot load referenced file {}: {}", location, e);
                    failed.insert(location);
                    errors.push(e);
                }
            }
        }
    }
    errors
}

async fn fetch(
    location: &str,
    options: &ResolveOptions,
    client: Option<&reqwest::Client>,
) -> crate::Result<Vec<u8>> {
    if is_remote(location) {
        let client = match client {
            Some(client) if options.allow_lookup => client,
            _ => {
                return Err(LintError::RemoteFetch {
                    location: location.to_string(),
                    cause: "remote lookups are disabled".to_string(),
                });
            }
        };
        let response = client
            .get(location)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LintError::RemoteFetch {
                location: location.to_string(),
                cause: e.to_string(),
            })?;
        let bytes = response.bytes().await.map_err(|e| LintError::RemoteFetch {
            location: location.to_string(),
            cause: e.to_string(),
        })?;
        return Ok(bytes.to_vec());
    }
    tokio::fs::read(location).await.map_err(LintError::from)
}

/// Build the resolved view beside the raw tree
pub fn build_resolved_view(document: &mut Document, options: &ResolveOptions) -> ResolutionReport {
    let Some(root) = document.root(View::Unresolved) else {
        return ResolutionReport::default();
    };
    let mut builder = ResolvedViewBuilder {
        document,
        options,
        stack: Vec::new(),
        report: ResolutionReport::default(),
        created: 0,
        seen_circular: HashSet::new(),
    };
    let resolved = builder.copy(root, None, false);
    let report = builder.report;
    document.set_resolved_root(Some(resolved));
    report
}

struct ResolvedViewBuilder<'a> {
    document: &'a mut Document,
    options: &'a ResolveOptions,
    /// Reference targets currently being expanded
    stack: Vec<NodeId>,
    report: ResolutionReport,
    created: usize,
    seen_circular: HashSet<String>,
}

impl ResolvedViewBuilder<'_> {
    fn copy(&mut self, src: NodeId, parent: Option<NodeId>, in_extension: bool) -> NodeId {
        let follow = !in_extension || self.options.extract_references_from_extensions;
        if follow && let Some(reference) = self.document.reference_of(src).map(str::to_string) {
            match self.document.resolve_reference(src, &reference) {
                Some(target) if self.stack.contains(&target) => {
                    let site = self.copy_plain(src, parent, in_extension, false);
                    self.record_circular(reference, site, target);
                    return site;
                }
                Some(target) if self.created < MAX_RESOLVED_NODES => {
                    self.stack.push(target);
                    let id = self.copy(target, parent, in_extension);
                    self.stack.pop();
                    return id;
                }
                Some(_) => {
                    tracing::warn!("Resolved view node budget exhausted, keeping {}", reference);
                }
                None => {
                    let site = self.copy_plain(src, parent, in_extension, false);
                    self.report.unresolved.push(UnresolvedReference {
                        definition: reference,
                        site,
                    });
                    return site;
                }
            }
        }
        self.copy_plain(src, parent, in_extension, follow)
    }

    fn copy_plain(
        &mut self,
        src: NodeId,
        parent: Option<NodeId>,
        in_extension: bool,
        follow: bool,
    ) -> NodeId {
        let original = self.document.node(src);
        let node = Node {
            kind: original.kind,
            value: original.value.clone(),
            scalar: original.scalar,
            position: original.position,
            parent,
            children: Vec::new(),
            file: original.file,
            source: Some(src),
        };
        let children = original.children.clone();
        let is_mapping = self.document.is_mapping(src);
        let id = self.document.push(node);
        self.created += 1;

        if is_mapping {
            for pair in children.chunks_exact(2) {
                let key_is_extension = self.document.value(pair[0]).starts_with("x-");
                self.copy_plain(pair[0], Some(id), in_extension, false);
                if follow {
                    self.copy(pair[1], Some(id), in_extension || key_is_extension);
                } else {
                    self.copy_plain(pair[1], Some(id), in_extension || key_is_extension, false);
                }
            }
        } else {
            for child in children {
                if follow {
                    self.copy(child, Some(id), in_extension);
                } else {
                    self.copy_plain(child, Some(id), in_extension, false);
                }
            }
        }
        id
    }

    /// Classify the loop between `site` and the copy of `target` above it
    fn record_circular(&mut self, definition: String, site: NodeId, target: NodeId) {
        let document = &*self.document;
        let mut array = false;
        let mut polymorphic = false;
        let mut infinite = true;

        let mut current = site;
        while let Some(parent) = document.parent(current) {
            if document.node(current).source == Some(target) {
                break;
            }
            if let Some(key) = document.key_of(current) {
                let key = document.value(key);
                match key {
                    "items" | "prefixItems" => {
                        array = true;
                        infinite = false;
                    }
                    "anyOf" | "oneOf" => {
                        polymorphic = true;
                        infinite = false;
                    }
                    "allOf" => polymorphic = true,
                    "additionalProperties" | "patternProperties" | "not" => infinite = false,
                    _ => {
                        // A property step is mandatory only when listed in `required`
                        if let Some(properties_key) = document.key_of(parent)
                            && document.value(properties_key) == "properties"
                        {
                            let schema = document.parent(parent);
                            let required = schema
                                .and_then(|s| document.get(s, "required"))
                                .map(|r| {
                                    document
                                        .items(r)
                                        .iter()
                                        .any(|item| document.value(*item) == key)
                                })
                                .unwrap_or(false);
                            if !required {
                                infinite = false;
                            }
                        }
                    }
                }
            }
            current = parent;
        }

        let signature = format!("{}|{}", definition, document.file(target));
        if self.seen_circular.insert(signature) {
            self.report.circular.push(CircularReference {
                definition,
                site,
                array,
                polymorphic,
                infinite,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CIRCULAR: &str = r##"
openapi: 3.0.3
info: {title: T, version: "1"}
paths: {}
components:
  schemas:
    Node:
      type: object
      properties:
        child:
          $ref: '#/components/schemas/Node'
    Pet:
      type: object
      properties:
        owner:
          $ref: '#/components/schemas/Owner'
    Owner:
      type: object
      properties:
        name: {type: string}
"##;

    fn resolved(source: &str) -> (Document, ResolutionReport) {
        let mut doc = Document::parse(source.as_bytes(), "spec.yaml").unwrap();
        let report = build_resolved_view(&mut doc, &ResolveOptions::default());
        (doc, report)
    }

    #[test]
    fn test_references_are_inlined() {
        let (doc, report) = resolved(CIRCULAR);
        let root = doc.root(View::Resolved).unwrap();
        let owner = doc
            .get_dotted(root, "components.schemas.Pet.properties.owner")
            .unwrap();
        assert!(doc.reference_of(owner).is_none());
        assert_eq!(doc.get_str(owner, "type"), Some("object"));
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_circular_reference_detected() {
        let (doc, report) = resolved(CIRCULAR);
        assert_eq!(report.circular.len(), 1);
        let circular = &report.circular[0];
        assert_eq!(circular.definition, "#/components/schemas/Node");
        assert!(!circular.infinite);
        assert!(doc.reference_of(circular.site).is_some());
    }

    #[test]
    fn test_unresolved_reference_recorded() {
        let (_, report) = resolved("a:\n  $ref: '#/nowhere'\n");
        assert_eq!(report.unresolved.len(), 1);
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(resolve_location("specs/api.yaml", "models/pet.yaml"), "specs/models/pet.yaml");
        assert_eq!(resolve_location("specs/api.yaml", "../common.yaml"), "common.yaml");
        assert_eq!(
            resolve_location("https://example.com/api/openapi.yaml", "pet.yaml"),
            "https://example.com/api/pet.yaml"
        );
    }

    #[test]
    fn test_pointer_decoding() {
        let doc = Document::parse(b"paths:\n  /a/b:\n    get: {}\n", "s.yaml").unwrap();
        assert!(doc.resolve_pointer(0, "/paths/~1a~1b/get").is_some());
    }

    #[tokio::test]
    async fn test_rolodex_loads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.yaml");
        std::fs::write(&main, "schema:\n  $ref: 'pet.yaml#/Pet'\n").unwrap();
        std::fs::write(dir.path().join("pet.yaml"), "Pet:\n  type: object\n").unwrap();

        let location = main.to_string_lossy().to_string();
        let bytes = std::fs::read(&main).unwrap();
        let mut doc = Document::parse(&bytes, location).unwrap();
        let options = ResolveOptions::default();
        let errors = load_rolodex(&mut doc, &options, None).await;
        assert!(errors.is_empty());
        assert_eq!(doc.files().len(), 2);

        build_resolved_view(&mut doc, &options);
        let root = doc.root(View::Resolved).unwrap();
        let schema = doc.get(root, "schema").unwrap();
        assert_eq!(doc.get_str(schema, "type"), Some("object"));
        assert_eq!(doc.file(schema), 1);
    }
}
