//! `given` expression evaluation with a per-run cache.

use super::{Document, NodeId, PathSegment, View};
use crate::error::{LintError, Result};
use dashmap::DashMap;
use serde_json_path::{JsonPath, PathElement};
use std::sync::Arc;

/// Resolves JSONPath locators to arena nodes.
///
/// Many rules share locators (`$.paths[*][*]`, `$`), so results are cached
/// per `(view, expression)` for the lifetime of a run.
pub struct Locator {
    document: Arc<Document>,
    cache: DashMap<(View, String), Arc<Vec<NodeId>>>,
}

impl Locator {
    pub fn new(document: Arc<Document>) -> Self {
        Self {
            document,
            cache: DashMap::new(),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Nodes matched by `expression` in `view`
    pub fn locate(&self, view: View, expression: &str) -> Result<Arc<Vec<NodeId>>> {
        let key = (view, expression.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }

        let nodes = Arc::new(self.evaluate(view, expression)?);
        self.cache.insert(key, Arc::clone(&nodes));
        Ok(nodes)
    }

    fn evaluate(&self, view: View, expression: &str) -> Result<Vec<NodeId>> {
        let Some(root) = self.document.root(view) else {
            return Ok(Vec::new());
        };
        let expression = expression.trim();
        if expression == "$" {
            return Ok(vec![root]);
        }

        let path = JsonPath::parse(expression).map_err(|e| LintError::Locator {
            expression: expression.to_string(),
            message: e.to_string(),
        })?;

        let json = self.document.json(view);
        let located = path.query_located(json);
        let mut nodes = Vec::new();
        for location in located.locations() {
            let segments: Vec<PathSegment> = location
                .iter()
                .map(|element| match element {
                    PathElement::Name(name) => PathSegment::Key(name.to_string()),
                    PathElement::Index(index) => PathSegment::Index(*index),
                })
                .collect();
            if let Some(id) = self.document.descend(root, &segments) {
                nodes.push(id);
            }
        }
        Ok(nodes)
    }
}
