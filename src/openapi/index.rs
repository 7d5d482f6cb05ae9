use crate::document::resolver::{ResolutionReport, split_reference};
use crate::document::{Document, NodeId, View};
use std::collections::HashMap;

/// One `$ref` mapping in the source
#[derive(Debug, Clone)]
pub struct ReferenceSite {
    /// The reference as written
    pub definition: String,
    pub node: NodeId,
    pub path: String,
    pub target: Option<NodeId>,
}

/// A named reusable object (`components.schemas.Pet`, `definitions.Pet`, ...)
#[derive(Debug, Clone)]
pub struct Component {
    /// Container name, e.g. `schemas` or `securityDefinitions`
    pub kind: String,
    pub name: String,
    pub node: NodeId,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct CircularReferenceResult {
    pub definition: String,
    pub path: String,
    pub array: bool,
    pub polymorphic: bool,
    pub infinite: bool,
}

#[derive(Debug, Clone)]
pub struct UnresolvedReferenceResult {
    pub definition: String,
    pub path: String,
}

/// Cross-reference index over a parsed spec and its rolodex
#[derive(Debug, Default)]
pub struct SpecIndex {
    references: Vec<ReferenceSite>,
    sites_by_target: HashMap<NodeId, Vec<usize>>,
    components: Vec<Component>,
    circular: Vec<CircularReferenceResult>,
    unresolved: Vec<UnresolvedReferenceResult>,
}

const OAS3_COMPONENT_KINDS: &[&str] = &[
    "schemas",
    "parameters",
    "responses",
    "examples",
    "requestBodies",
    "headers",
    "securitySchemes",
    "links",
    "callbacks",
    "pathItems",
];

const OAS2_COMPONENT_KINDS: &[&str] =
    &["definitions", "parameters", "responses", "securityDefinitions"];

impl SpecIndex {
    pub fn build(document: &Document, report: &ResolutionReport, include_extensions: bool) -> Self {
        let mut index = SpecIndex::default();

        for file in 0..document.files().len() {
            for (node, definition) in document.reference_sites(file, include_extensions) {
                let target = document.resolve_reference(node, &definition);
                let position = index.references.len();
                if let Some(target) = target {
                    index.sites_by_target.entry(target).or_default().push(position);
                }
                index.references.push(ReferenceSite {
                    path: document.path_of(node),
                    definition,
                    node,
                    target,
                });
            }
        }

        if let Some(root) = document.root(View::Unresolved) {
            if let Some(components) = document.get(root, "components") {
                index.collect_components(document, components, OAS3_COMPONENT_KINDS);
            }
            index.collect_components(document, root, OAS2_COMPONENT_KINDS);
        }

        index.circular = report
            .circular
            .iter()
            .map(|c| CircularReferenceResult {
                definition: c.definition.clone(),
                path: document.path_of(c.site),
                array: c.array,
                polymorphic: c.polymorphic,
                infinite: c.infinite,
            })
            .collect();
        index.unresolved = report
            .unresolved
            .iter()
            .map(|u| UnresolvedReferenceResult {
                definition: u.definition.clone(),
                path: document.path_of(u.site),
            })
            .collect();

        index
    }

    fn collect_components(&mut self, document: &Document, container: NodeId, kinds: &[&str]) {
        for kind in kinds {
            let Some(group) = document.get(container, kind) else {
                continue;
            };
            for (key, value) in document.entries(group) {
                self.components.push(Component {
                    kind: kind.to_string(),
                    name: document.value(key).to_string(),
                    node: value,
                    path: document.path_of(value),
                });
            }
        }
    }

    pub fn references(&self) -> &[ReferenceSite] {
        &self.references
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn components_of(&self, kind: &str) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    pub fn circular_references(&self) -> &[CircularReferenceResult] {
        &self.circular
    }

    pub fn unresolved_references(&self) -> &[UnresolvedReferenceResult] {
        &self.unresolved
    }

    /// Paths of every `$ref` that points at `target`
    pub fn references_to(&self, target: NodeId) -> Vec<String> {
        self.sites_by_target
            .get(&target)
            .map(|sites| sites.iter().map(|i| self.references[*i].path.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_referenced(&self, target: NodeId) -> bool {
        self.sites_by_target.contains_key(&target)
    }

    /// References whose location part points outside the root file
    pub fn external_references(&self) -> impl Iterator<Item = &ReferenceSite> {
        self.references
            .iter()
            .filter(|r| !split_reference(&r.definition).0.is_empty())
    }
}
