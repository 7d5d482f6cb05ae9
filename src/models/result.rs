use super::ignore::IgnoreList;
use super::rule::{Rule, RuleCategory, Severity};
use crate::document::path::operation_path;
use crate::document::{Document, NodeId, Position};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a result came from when it sits in an imported file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub filename: String,
    pub line: usize,
    pub column: usize,
}

/// A single diagnostic produced by a rule function
#[derive(Debug, Clone, Serialize)]
pub struct RuleFunctionResult {
    pub rule_id: String,
    pub severity: Severity,
    pub category: RuleCategory,
    pub message: String,

    /// Canonical JSONPath of the offending location
    pub path: String,

    /// Other paths that reach the same location through `$ref`s
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,

    #[serde(rename = "start")]
    pub start_node: Position,

    #[serde(rename = "end")]
    pub end_node: Position,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,

    pub rule: Arc<Rule>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_fixed: bool,

    /// Node the result starts at, for inline-ignore checks
    #[serde(skip)]
    pub node: Option<NodeId>,
}

impl RuleFunctionResult {
    pub fn new(rule: &Arc<Rule>, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            rule_id: rule.id.clone(),
            severity: rule.severity,
            category: rule.category,
            message: message.into(),
            path: path.into(),
            paths: Vec::new(),
            start_node: Position::default(),
            end_node: Position::default(),
            origin: None,
            rule: Arc::clone(rule),
            auto_fixed: false,
            node: None,
        }
    }

    /// Anchor the result on a node: span, and origin when the node lives in another file
    pub fn with_node(mut self, document: &Document, node: NodeId) -> Self {
        self.start_node = document.position(node);
        self.end_node = document.end_position(node);
        let file = document.file(node);
        self.origin = (file != 0).then(|| Origin {
            filename: document.file_location(file).to_string(),
            line: self.start_node.line,
            column: self.start_node.column,
        });
        self.node = Some(node);
        self
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = paths;
        self
    }

    /// Copy rule metadata onto the result
    pub fn stamp(&mut self, rule: &Arc<Rule>) {
        self.rule_id = rule.id.clone();
        self.severity = rule.severity;
        self.category = rule.category;
        self.rule = Arc::clone(rule);
    }

    pub fn filename(&self) -> &str {
        self.origin.as_ref().map(|o| o.filename.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warn: usize,
    pub info: usize,
    pub hint: usize,
}

/// Ordered collection of results with grouping helpers
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RuleFunctionResultSet {
    pub results: Vec<RuleFunctionResult>,
}

impl RuleFunctionResultSet {
    pub fn new(results: Vec<RuleFunctionResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleFunctionResult> {
        self.results.iter()
    }

    /// Stable sort by filename (root file first), line, then column
    pub fn sort_by_line(&mut self) {
        self.results.sort_by(|a, b| {
            (a.filename(), a.start_node.line, a.start_node.column).cmp(&(
                b.filename(),
                b.start_node.line,
                b.start_node.column,
            ))
        });
    }

    /// Total order: position, then rule id, message and path
    pub fn sort_total(&mut self) {
        self.results.sort_by(|a, b| {
            (
                a.filename(),
                a.start_node.line,
                a.start_node.column,
                &a.rule_id,
                &a.message,
                &a.path,
            )
                .cmp(&(
                    b.filename(),
                    b.start_node.line,
                    b.start_node.column,
                    &b.rule_id,
                    &b.message,
                    &b.path,
                ))
        });
    }

    pub fn by_severity(&self) -> BTreeMap<Severity, Vec<&RuleFunctionResult>> {
        let mut groups: BTreeMap<Severity, Vec<&RuleFunctionResult>> = BTreeMap::new();
        for result in &self.results {
            groups.entry(result.severity).or_default().push(result);
        }
        groups
    }

    pub fn by_category(&self) -> BTreeMap<&'static str, Vec<&RuleFunctionResult>> {
        let mut groups: BTreeMap<&'static str, Vec<&RuleFunctionResult>> = BTreeMap::new();
        for result in &self.results {
            groups.entry(result.category.id()).or_default().push(result);
        }
        groups
    }

    pub fn by_rule(&self) -> BTreeMap<&str, Vec<&RuleFunctionResult>> {
        let mut groups: BTreeMap<&str, Vec<&RuleFunctionResult>> = BTreeMap::new();
        for result in &self.results {
            groups.entry(result.rule_id.as_str()).or_default().push(result);
        }
        groups
    }

    /// Results grouped by the operation path template they sit under
    pub fn by_operation_path(&self) -> BTreeMap<&str, Vec<&RuleFunctionResult>> {
        let mut groups: BTreeMap<&str, Vec<&RuleFunctionResult>> = BTreeMap::new();
        for result in &self.results {
            if let Some(path) = operation_path(&result.path) {
                groups.entry(path).or_default().push(result);
            }
        }
        groups
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for result in &self.results {
            match result.severity {
                Severity::Error => counts.error += 1,
                Severity::Warn => counts.warn += 1,
                Severity::Info => counts.info += 1,
                Severity::Hint => counts.hint += 1,
                Severity::Off => {}
            }
        }
        counts
    }

    /// Concatenate another set onto this one
    pub fn merge(&mut self, other: RuleFunctionResultSet) {
        self.results.extend(other.results);
    }

    /// Split off results matched by the ignore list; returns the ignored ones
    pub fn filter_ignored(&mut self, ignore: &IgnoreList) -> Vec<RuleFunctionResult> {
        if ignore.is_empty() {
            return Vec::new();
        }
        let (ignored, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.results)
            .into_iter()
            .partition(|r| ignore.matches(r));
        self.results = kept;
        ignored
    }
}

impl IntoIterator for RuleFunctionResultSet {
    type Item = RuleFunctionResult;
    type IntoIter = std::vec::IntoIter<RuleFunctionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl From<Vec<RuleFunctionResult>> for RuleFunctionResultSet {
    fn from(results: Vec<RuleFunctionResult>) -> Self {
        Self::new(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(
        rule: &str,
        severity: Severity,
        line: usize,
        column: usize,
        path: &str,
    ) -> RuleFunctionResult {
        let rule = Arc::new(Rule::new(rule).with_severity(severity));
        let mut r = RuleFunctionResult::new(&rule, format!("{} failed", rule.id), path);
        r.start_node = Position::new(line, column);
        r
    }

    fn sample() -> RuleFunctionResultSet {
        RuleFunctionResultSet::new(vec![
            result("b", Severity::Warn, 10, 3, "$.paths['/b'].get"),
            result("a", Severity::Error, 2, 1, "$.info"),
            result("c", Severity::Hint, 10, 1, "$.paths['/a'].post"),
            result("a", Severity::Error, 10, 1, "$.paths['/a'].get"),
        ])
    }

    #[test]
    fn test_sort_by_line_is_stable() {
        let mut set = sample();
        set.sort_by_line();
        let order: Vec<_> = set.iter().map(|r| (r.start_node.line, r.rule_id.as_str())).collect();
        assert_eq!(order, vec![(2, "a"), (10, "c"), (10, "a"), (10, "b")]);
    }

    #[test]
    fn test_sort_by_line_puts_root_file_first() {
        let mut set = sample();
        set.results[1].origin = Some(Origin {
            filename: "other.yaml".to_string(),
            line: 2,
            column: 1,
        });
        set.sort_by_line();
        assert_eq!(set.results.last().unwrap().filename(), "other.yaml");
    }

    #[test]
    fn test_total_sort_is_deterministic() {
        let mut first = sample();
        let mut second = sample();
        second.results.reverse();
        first.sort_total();
        second.sort_total();
        let a: Vec<_> = first.iter().map(|r| (&r.rule_id, &r.path)).collect();
        let b: Vec<_> = second.iter().map(|r| (&r.rule_id, &r.path)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_severity_partitions_cover_everything() {
        let set = sample();
        let groups = set.by_severity();
        let total: usize = groups.values().map(Vec::len).sum();
        assert_eq!(total, set.len());
        assert_eq!(groups[&Severity::Error].len(), 2);

        let counts = set.severity_counts();
        assert_eq!(
            counts,
            SeverityCounts {
                error: 2,
                warn: 1,
                info: 0,
                hint: 1
            }
        );
    }

    #[test]
    fn test_group_by_rule_and_operation() {
        let set = sample();
        assert_eq!(set.by_rule()["a"].len(), 2);
        let by_op = set.by_operation_path();
        assert_eq!(by_op["/a"].len(), 2);
        assert_eq!(by_op["/b"].len(), 1);
        assert!(!by_op.contains_key("$.info"));
        assert_eq!(set.by_category()["validation"].len(), 4);
    }

    #[test]
    fn test_merge_keeps_duplicates() {
        let mut set = sample();
        set.merge(sample());
        assert_eq!(set.len(), 8);
    }

    #[test]
    fn test_filter_ignored() {
        let mut set = sample();
        let mut ignore = IgnoreList::default();
        ignore.insert("a", "$.info");
        let ignored = set.filter_ignored(&ignore);
        assert_eq!(ignored.len(), 1);
        assert_eq!(set.len(), 3);
    }
}
