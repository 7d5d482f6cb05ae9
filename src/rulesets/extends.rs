use super::catalogue;
use crate::document::resolver::{is_remote, normalize, resolve_location};
use crate::models::{Rule, Selector};
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Built-in rule families an `extends` entry can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// The OpenAPI catalogue (`spectral:oas`, `vacuum:oas`, or a bare selector)
    Oas,
    /// The OWASP family only (`spectral:owasp`, `vacuum:owasp`)
    Owasp,
}

impl Preset {
    /// Recognise a preset tag, along with the selector a bare tag implies
    pub fn parse(tag: &str) -> Option<(Preset, Option<Selector>)> {
        match tag.trim() {
            "spectral:oas" | "vacuum:oas" => Some((Preset::Oas, None)),
            "spectral:owasp" | "vacuum:owasp" => Some((Preset::Owasp, None)),
            other => Selector::parse(other).map(|selector| (Preset::Oas, Some(selector))),
        }
    }

    /// Seed rules for this preset under `selector`
    pub fn rules(self, selector: Option<Selector>) -> Vec<Arc<Rule>> {
        match (self, selector.unwrap_or(Selector::Recommended)) {
            (_, Selector::Off) => Vec::new(),
            (Preset::Oas, Selector::Recommended) => catalogue::recommended().cloned().collect(),
            (Preset::Oas, Selector::All) => catalogue::rules().cloned().collect(),
            (Preset::Owasp, _) => catalogue::owasp().cloned().collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Oas => "oas",
            Preset::Owasp => "owasp",
        }
    }
}

/// Where an `extends` entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendsSource {
    /// A built-in preset, with the selector implied by its tag
    Preset(Preset, Option<Selector>),
    /// A ruleset file, as a normalised path
    Local(String),
    /// An `http(s)` URL
    Remote(String),
}

impl ExtendsSource {
    /// Classify `raw`, resolving relative locations against the ruleset that
    /// names it, or against `base` for the top-level ruleset
    pub fn classify(raw: &str, parent: Option<&str>, base: Option<&Path>) -> Self {
        if let Some((preset, implied)) = Preset::parse(raw) {
            return ExtendsSource::Preset(preset, implied);
        }
        let raw = raw.trim();
        let location = match parent {
            Some(parent) => resolve_location(parent, raw),
            None if is_remote(raw) => raw.to_string(),
            None => match base {
                Some(base) if Path::new(raw).is_relative() => {
                    normalize(&base.join(raw)).to_string_lossy().into_owned()
                }
                _ => normalize(Path::new(raw)).to_string_lossy().into_owned(),
            },
        };
        if is_remote(&location) {
            ExtendsSource::Remote(location)
        } else {
            ExtendsSource::Local(location)
        }
    }

    /// Graph key: the preset tag, path or URL
    pub fn key(&self) -> String {
        match self {
            ExtendsSource::Preset(preset, _) => format!("preset:{}", preset.name()),
            ExtendsSource::Local(location) | ExtendsSource::Remote(location) => location.clone(),
        }
    }

}

/// The `extends` edges seen while composing, keyed by source
#[derive(Debug, Clone, Default)]
pub struct ExtendsGraph {
    pub graph: DiGraph<String, ()>,

    /// Mapping from source key to NodeIndex for quick lookup
    pub source_index_map: HashMap<String, NodeIndex>,
}

impl ExtendsGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node for `key`, created on first sight
    pub fn node(&mut self, key: &str) -> NodeIndex {
        if let Some(index) = self.source_index_map.get(key) {
            return *index;
        }
        let index = self.graph.add_node(key.to_string());
        self.source_index_map.insert(key.to_string(), index);
        index
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        let (from, to) = (self.node(from), self.node(to));
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    /// The chain `from -> to -> ... -> from` when the edge `from -> to` closes a cycle
    pub fn cycle_through<'a>(&'a self, from: &'a str, to: &str) -> Option<Vec<&'a str>> {
        let from_index = *self.source_index_map.get(from)?;
        let to_index = *self.source_index_map.get(to)?;
        // shortest way back from `to`; it ends at `from`
        let (_, back) = astar(&self.graph, to_index, |n| n == from_index, |_| 1, |_| 0)?;

        let mut chain = vec![from];
        chain.extend(back.into_iter().map(|n| self.graph[n].as_str()));
        Some(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_presets() {
        assert_eq!(
            ExtendsSource::classify("spectral:oas", None, None),
            ExtendsSource::Preset(Preset::Oas, None)
        );
        assert_eq!(
            ExtendsSource::classify("vacuum:owasp", None, None),
            ExtendsSource::Preset(Preset::Owasp, None)
        );
        assert_eq!(
            ExtendsSource::classify("all", None, None),
            ExtendsSource::Preset(Preset::Oas, Some(Selector::All))
        );
    }

    #[test]
    fn test_classify_locations() {
        let base = Path::new("/rules");
        assert_eq!(
            ExtendsSource::classify("base.yaml", None, Some(base)),
            ExtendsSource::Local("/rules/base.yaml".to_string())
        );
        assert_eq!(
            ExtendsSource::classify("../shared/base.yaml", Some("/rules/team/ruleset.yaml"), None),
            ExtendsSource::Local("/rules/shared/base.yaml".to_string())
        );
        assert_eq!(
            ExtendsSource::classify("other.yaml", Some("https://acme.io/rules/main.yaml"), None),
            ExtendsSource::Remote("https://acme.io/rules/other.yaml".to_string())
        );
        assert_eq!(
            ExtendsSource::classify("https://acme.io/r.yaml", None, Some(base)),
            ExtendsSource::Remote("https://acme.io/r.yaml".to_string())
        );
    }

    #[test]
    fn test_preset_selectors() {
        let recommended = Preset::Oas.rules(None);
        let all = Preset::Oas.rules(Some(Selector::All));
        assert!(recommended.len() < all.len());
        assert!(Preset::Oas.rules(Some(Selector::Off)).is_empty());
        assert!(Preset::Owasp.rules(None).iter().all(|r| r.id.starts_with("owasp-")));
        assert!(all.iter().any(|r| r.id == "owasp-integer-limit"));
    }

    #[test]
    fn test_graph_cycles() {
        let mut graph = ExtendsGraph::new();
        graph.add_edge("a.yaml", "b.yaml");
        graph.add_edge("a.yaml", "preset:oas");
        assert!(graph.cycle_through("a.yaml", "b.yaml").is_none());
        assert!(graph.cycle_through("a.yaml", "preset:oas").is_none());

        graph.add_edge("b.yaml", "c.yaml");
        graph.add_edge("c.yaml", "a.yaml");
        assert_eq!(
            graph.cycle_through("c.yaml", "a.yaml"),
            Some(vec!["c.yaml", "a.yaml", "b.yaml", "c.yaml"])
        );

        graph.add_edge("d.yaml", "d.yaml");
        assert_eq!(graph.cycle_through("d.yaml", "d.yaml"), Some(vec!["d.yaml", "d.yaml"]));
    }
}
