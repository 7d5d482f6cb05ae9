use super::result::RuleFunctionResult;
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Rule id → canonical paths whose results should be dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoreList(IndexMap<String, Vec<String>>);

impl IgnoreList {
    /// Parse an ignore file (`<rule-id>: [<path>, ...]`)
    pub fn from_yaml(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_slice(bytes)?)
    }

    pub fn insert(&mut self, rule_id: impl Into<String>, path: impl Into<String>) {
        self.0.entry(rule_id.into()).or_default().push(path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self, rule_id: &str) -> &[String] {
        self.0.get(rule_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exact match on rule id and on the result's path or any alternate path
    pub fn matches(&self, result: &RuleFunctionResult) -> bool {
        let paths = self.paths(&result.rule_id);
        paths
            .iter()
            .any(|p| *p == result.path || result.paths.iter().any(|alt| alt == p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rule;
    use std::sync::Arc;

    #[test]
    fn test_parse_and_match() {
        let ignore = IgnoreList::from_yaml(
            br#"
operation-description:
  - $.paths['/pets'].get
owasp-string-limit:
  - $.components.schemas['Name']
"#,
        )
        .unwrap();

        let rule = Arc::new(Rule::new("operation-description"));
        let hit = RuleFunctionResult::new(&rule, "missing", "$.paths['/pets'].get");
        let miss = RuleFunctionResult::new(&rule, "missing", "$.paths['/pets'].post");
        assert!(ignore.matches(&hit));
        assert!(!ignore.matches(&miss));

        let owasp = Arc::new(Rule::new("owasp-string-limit"));
        let via_alternate =
            RuleFunctionResult::new(&owasp, "unbounded", "$.paths['/x'].post.requestBody")
                .with_paths(vec!["$.components.schemas['Name']".to_string()]);
        assert!(ignore.matches(&via_alternate));
    }

    #[test]
    fn test_empty_file() {
        assert!(IgnoreList::from_yaml(b"\n").unwrap().is_empty());
    }
}
