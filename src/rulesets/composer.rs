use super::catalogue;
use super::extends::{ExtendsGraph, ExtendsSource, Preset};
use super::loader::{load_ruleset, parse_ruleset};
use super::precompile;
use crate::error::{LintError, Result};
use crate::functions::{FunctionMap, FunctionRegistry};
use crate::models::{Extends, Rule, RuleDefinition, RuleSet, Selector};
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DOCUMENTATION_URL: &str = "https://quobix.com/vacuum/rulesets";

/// Key of a ruleset handed over as bytes
const ROOT_KEY: &str = "<root>";

type RuleMap = IndexMap<String, Arc<Rule>>;

/// Turns ruleset documents into runnable [`RuleSet`]s.
///
/// Walks `extends` depth first (presets, local files and remote URLs), then
/// applies each ruleset's own `rules` on top of what it inherited.
#[derive(Debug, Clone, Default)]
pub struct RuleSetComposer {
    base_path: Option<PathBuf>,
    http_client: Option<reqwest::Client>,
    registry: FunctionRegistry,
    cancellation: CancellationToken,
}

/// State of one composition walk
#[derive(Default)]
struct Walk {
    /// Finished sources, reused when extended twice
    composed: HashMap<String, RuleMap>,
    graph: ExtendsGraph,
}

impl RuleSetComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory relative `extends` of a top-level ruleset resolve against
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Functions rules may reference besides the built-ins
    pub fn with_custom_functions(mut self, functions: FunctionMap) -> Self {
        self.registry = self.registry.with_custom(functions);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Parse and compose a ruleset document
    pub async fn compose(&self, bytes: &[u8]) -> Result<RuleSet> {
        let ruleset = parse_ruleset(bytes)?;
        self.compose_ruleset(ruleset, None).await
    }

    /// Compose the ruleset file at `path`; its relative `extends` resolve
    /// against its own directory
    pub async fn compose_file(&self, path: impl AsRef<Path>) -> Result<RuleSet> {
        let raw = path.as_ref().to_string_lossy();
        let source = ExtendsSource::classify(&raw, None, self.base_path.as_deref());
        let ruleset = load_ruleset(&source, self.http_client.as_ref(), &self.cancellation).await?;
        self.compose_ruleset(ruleset, Some(source.key())).await
    }

    /// Merge a caller-built ruleset onto the presets its `extends` names
    pub async fn generate_from_supplied(&self, user: RuleSet) -> Result<RuleSet> {
        self.compose_ruleset(user, None).await
    }

    /// The curated `recommended` preset
    pub fn generate_openapi_recommended() -> RuleSet {
        preset_ruleset(
            "Recommended rules for a high quality specification",
            Preset::Oas.rules(Some(Selector::Recommended)),
        )
    }

    /// Every built-in rule, OWASP family included
    pub fn generate_openapi_default() -> RuleSet {
        preset_ruleset(
            "Every rule available, for the strictest of specifications",
            Preset::Oas.rules(Some(Selector::All)),
        )
    }

    async fn compose_ruleset(&self, ruleset: RuleSet, location: Option<String>) -> Result<RuleSet> {
        if ruleset.rule_definitions.is_empty() && ruleset.extends.is_none() {
            return Err(LintError::EmptyRuleset);
        }

        let key = location.clone().unwrap_or_else(|| ROOT_KEY.to_string());
        let mut walk = Walk::default();
        let rules = self.walk(&ruleset, &key, location.as_deref(), &mut walk).await;

        let rules = self.finish(rules)?;
        tracing::debug!("Composed ruleset with {} rules", rules.len());
        Ok(RuleSet { rules, ..ruleset })
    }

    /// Compose one ruleset: inherited rules first, its own definitions on top
    fn walk<'a>(
        &'a self,
        ruleset: &'a RuleSet,
        key: &'a str,
        location: Option<&'a str>,
        walk: &'a mut Walk,
    ) -> BoxFuture<'a, RuleMap> {
        async move {
            let mut rules = RuleMap::new();
            let entries = ruleset.extends.as_ref().map(Extends::entries).unwrap_or_default();

            for (raw, selector) in entries {
                let source = ExtendsSource::classify(&raw, location, self.base_path.as_deref());
                let source_key = source.key();
                walk.graph.add_edge(key, &source_key);

                let inherited = match &source {
                    ExtendsSource::Preset(preset, implied) => preset.rules(selector.or(*implied)),
                    ExtendsSource::Local(_) | ExtendsSource::Remote(_) => {
                        if let Some(chain) = walk.graph.cycle_through(key, &source_key) {
                            let cycle = LintError::CircularExtends {
                                chain: chain.join(" -> "),
                            };
                            tracing::warn!("{}, skipping {}", cycle, source_key);
                            continue;
                        }

                        let composed = match walk.composed.get(&source_key) {
                            Some(done) => done.clone(),
                            None => {
                                let loaded = load_ruleset(
                                    &source,
                                    self.http_client.as_ref(),
                                    &self.cancellation,
                                )
                                .await;
                                let child = match loaded {
                                    Ok(child) => child,
                                    Err(e) => {
                                        tracing::warn!(
                                            "Skipping extended ruleset {}: {}",
                                            source_key,
                                            e
                                        );
                                        continue;
                                    }
                                };
                                let composed = self
                                    .walk(&child, &source_key, Some(&source_key), &mut *walk)
                                    .await;
                                walk.composed.insert(source_key.clone(), composed.clone());
                                composed
                            }
                        };
                        select(composed, selector)
                    }
                };

                for rule in inherited {
                    rules.insert(rule.id.clone(), rule);
                }
            }

            apply_definitions(&mut rules, ruleset);
            rules
        }
        .boxed()
    }

    /// Check every rule can run and compile its pattern hint
    fn finish(&self, rules: RuleMap) -> Result<RuleMap> {
        let mut finished = RuleMap::with_capacity(rules.len());
        for (id, rule) in rules {
            if rule.given.is_empty() {
                return Err(LintError::RulesetParse(format!(
                    "rule '{}' has no 'given' locator",
                    id
                )));
            }
            if rule.then.is_empty() {
                return Err(LintError::RulesetParse(format!(
                    "rule '{}' has no 'then' actions",
                    id
                )));
            }
            if let Some(action) = rule.then.iter().find(|a| !self.registry.contains(&a.function)) {
                return Err(LintError::UnknownFunction {
                    rule: id,
                    function: action.function.clone(),
                });
            }

            let rule = if rule.precompiled_pattern.is_none() && rule.pattern_hint().is_some() {
                let mut compiled = (*rule).clone();
                precompile(&mut compiled);
                Arc::new(compiled)
            } else {
                rule
            };
            finished.insert(id, rule);
        }
        Ok(finished)
    }
}

fn preset_ruleset(description: &str, rules: Vec<Arc<Rule>>) -> RuleSet {
    RuleSet {
        documentation_url: Some(DOCUMENTATION_URL.to_string()),
        description: Some(description.to_string()),
        rules: rules.into_iter().map(|rule| (rule.id.clone(), rule)).collect(),
        ..Default::default()
    }
}

/// Narrow an extended ruleset by the selector written next to it
fn select(rules: RuleMap, selector: Option<Selector>) -> Vec<Arc<Rule>> {
    match selector {
        Some(Selector::Off) => Vec::new(),
        Some(Selector::Recommended) => rules
            .into_values()
            .filter(|rule| rule.recommended)
            .collect(),
        Some(Selector::All) | None => rules.into_values().collect(),
    }
}

/// A known rule: inherited, or else from the built-in catalogue
fn known_rule(rules: &RuleMap, id: &str) -> Option<Arc<Rule>> {
    rules.get(id).cloned().or_else(|| catalogue::rule(id))
}

/// Apply a ruleset's own `rules` over what it inherited
fn apply_definitions(rules: &mut RuleMap, ruleset: &RuleSet) {
    for (id, definition) in &ruleset.rule_definitions {
        match definition {
            RuleDefinition::Enabled(false) => {
                rules.shift_remove(id);
            }
            RuleDefinition::Severity(severity) if severity.is_off() => {
                rules.shift_remove(id);
            }
            RuleDefinition::Enabled(true) => {
                if rules.contains_key(id) {
                    continue;
                }
                match catalogue::rule(id) {
                    Some(rule) => {
                        rules.insert(id.clone(), rule);
                    }
                    None => tracing::warn!("Rule '{}' is enabled but is not defined anywhere", id),
                }
            }
            RuleDefinition::Severity(severity) => match known_rule(rules, id) {
                Some(existing) => {
                    let mut rule = (*existing).clone();
                    rule.severity = *severity;
                    rules.insert(id.clone(), Arc::new(rule));
                }
                None => tracing::warn!("Cannot set severity of unknown rule '{}'", id),
            },
            RuleDefinition::Rule(definition) => {
                let rule = match known_rule(rules, id) {
                    // no actions: adjust the known rule rather than replace it
                    Some(existing) if definition.then.is_empty() => adjust(&existing, definition),
                    _ => {
                        let mut rule = (**definition).clone();
                        rule.id = id.clone();
                        if rule.formats.is_empty() {
                            rule.formats = ruleset.formats.clone();
                        }
                        rule
                    }
                };
                if rule.severity.is_off() {
                    rules.shift_remove(id);
                } else {
                    rules.insert(id.clone(), Arc::new(rule));
                }
            }
        }
    }
}

fn adjust(existing: &Rule, changes: &Rule) -> Rule {
    let mut rule = existing.clone();
    rule.severity = changes.severity;
    if !changes.description.is_empty() {
        rule.description = changes.description.clone();
    }
    if changes.message.is_some() {
        rule.message = changes.message.clone();
    }
    if !changes.given.is_empty() {
        rule.given = changes.given.clone();
    }
    if !changes.formats.is_empty() {
        rule.formats = changes.formats.clone();
    }
    if changes.how_to_fix.is_some() {
        rule.how_to_fix = changes.how_to_fix.clone();
    }
    rule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
    use crate::models::{RuleFunctionResult, Severity};
    use crate::document::NodeId;

    async fn compose(source: &str) -> Result<RuleSet> {
        RuleSetComposer::new().compose(source.as_bytes()).await
    }

    #[tokio::test]
    async fn test_empty_ruleset() {
        assert!(matches!(
            compose("description: nothing here\n").await,
            Err(LintError::EmptyRuleset)
        ));
        assert!(matches!(compose("").await, Err(LintError::EmptyRuleset)));
        assert!(matches!(compose("rules: [").await, Err(LintError::RulesetParse(_))));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let result = compose(
            r#"
rules:
  my-rule:
    given: $.info
    then:
      function: doesNotExist
"#,
        )
        .await;
        match result {
            Err(LintError::UnknownFunction { rule, function }) => {
                assert_eq!(rule, "my-rule");
                assert_eq!(function, "doesNotExist");
            }
            other => panic!("unexpected {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn test_override_to_off() {
        let ruleset = compose(
            r#"
extends: spectral:oas
rules:
  operation-tags: false
  info-contact: off
  info-description: error
"#,
        )
        .await
        .unwrap();
        assert!(ruleset.rule("operation-tags").is_none());
        assert!(ruleset.rule("info-contact").is_none());
        assert_eq!(ruleset.rule("info-description").unwrap().severity, Severity::Error);
        assert!(ruleset.rule("operation-success-response").is_some());
        assert!(ruleset.rules.values().all(|r| !r.severity.is_off()));
    }

    #[tokio::test]
    async fn test_enable_from_catalogue() {
        let ruleset = compose(
            r#"
extends: [[vacuum:oas, off]]
rules:
  owasp-integer-limit: true
  paths-kebab-case: hint
  not-a-rule: true
"#,
        )
        .await
        .unwrap();
        let ids: Vec<&str> = ruleset.rules.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["owasp-integer-limit", "paths-kebab-case"]);
        assert_eq!(ruleset.rule("paths-kebab-case").unwrap().severity, Severity::Hint);
    }

    #[tokio::test]
    async fn test_selectors() {
        let all = compose("extends: [[spectral:oas, all]]\n").await.unwrap();
        let recommended = compose("extends: recommended\n").await.unwrap();
        let owasp = compose("extends: vacuum:owasp\n").await.unwrap();
        assert_eq!(all.len(), RuleSetComposer::generate_openapi_default().len());
        assert_eq!(recommended.len(), RuleSetComposer::generate_openapi_recommended().len());
        assert!(owasp.rules.keys().all(|id| id.starts_with("owasp-")));
        assert!(recommended.rules.keys().all(|id| all.rules.contains_key(id)));
    }

    #[tokio::test]
    async fn test_full_object_replaces_and_inherits_formats() {
        let ruleset = compose(
            r#"
formats: [oas3]
extends: spectral:oas
rules:
  info-description:
    description: Needs words
    severity: error
    given: $.info
    then:
      field: description
      function: length
      functionOptions:
        min: 20
"#,
        )
        .await
        .unwrap();
        let rule = ruleset.rule("info-description").unwrap();
        assert_eq!(rule.then[0].function, "length");
        assert_eq!(rule.formats, vec!["oas3"]);
        assert_eq!(rule.id, "info-description");
    }

    #[tokio::test]
    async fn test_object_without_then_adjusts() {
        let ruleset = compose(
            r#"
extends: spectral:oas
rules:
  operation-description:
    description: Every operation explains itself
    severity: error
"#,
        )
        .await
        .unwrap();
        let rule = ruleset.rule("operation-description").unwrap();
        assert_eq!(rule.severity, Severity::Error);
        assert_eq!(rule.description, "Every operation explains itself");
        assert_eq!(rule.then[0].function, "truthy");
    }

    #[tokio::test]
    async fn test_missing_given_is_rejected() {
        let result = compose("rules:\n  lonely:\n    then:\n      function: truthy\n").await;
        assert!(matches!(result, Err(LintError::RulesetParse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_extends_are_skipped() {
        let ruleset = compose(
            r#"
extends:
  - ./does-not-exist.yaml
rules:
  local-rule:
    given: $.info
    then:
      field: title
      function: truthy
"#,
        )
        .await
        .unwrap();
        assert_eq!(ruleset.len(), 1);
    }

    #[tokio::test]
    async fn test_pattern_hint_compiled() {
        let ruleset = compose(
            r#"
rules:
  title-case:
    given: $.info
    then:
      field: title
      function: pattern
      functionOptions:
        match: "^[A-Z]"
"#,
        )
        .await
        .unwrap();
        let rule = ruleset.rule("title-case").unwrap();
        assert_eq!(rule.precompiled_pattern.as_ref().map(|r| r.as_str()), Some("^[A-Z]"));
    }

    #[tokio::test]
    async fn test_composition_is_repeatable() {
        let source = "extends: [[spectral:oas, all]]\nrules:\n  info-contact: error\n";
        let first = compose(source).await.unwrap();
        let second = compose(source).await.unwrap();
        assert_eq!(first.rules, second.rules);
    }

    struct Always;

    impl RuleFunction for Always {
        fn schema(&self) -> RuleFunctionSchema {
            RuleFunctionSchema::new("always")
        }

        fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
            nodes.iter().map(|n| ctx.result("always", *n)).collect()
        }
    }

    #[tokio::test]
    async fn test_custom_functions() {
        let mut custom = FunctionMap::new();
        custom.insert("always".to_string(), Arc::new(Always) as Arc<dyn RuleFunction>);
        let composer = RuleSetComposer::new().with_custom_functions(custom);
        let ruleset = composer
            .compose(b"rules:\n  custom:\n    given: $\n    then:\n      function: always\n")
            .await
            .unwrap();
        assert!(ruleset.rule("custom").is_some());
    }

    #[tokio::test]
    async fn test_generate_from_supplied() {
        let user: RuleSet = serde_yaml::from_str(
            "extends: [[spectral:oas, recommended]]\nrules:\n  info-license: false\n",
        )
        .unwrap();
        let ruleset = RuleSetComposer::new().generate_from_supplied(user).await.unwrap();
        assert!(ruleset.rule("info-license").is_none());
        assert!(ruleset.rule("info-contact").is_some());
    }
}
