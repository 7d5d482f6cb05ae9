//! The execution engine: prepares a document once, then runs every rule of a
//! composed ruleset against it in parallel.
//!
//! Each rule is one tokio task. Locator evaluation and function work are
//! CPU-bound and run on the blocking pool; the task itself only waits on them
//! under the rule and lookup budgets. Results from a rule are published in a
//! single batch once the rule has finished, so a rule that times out or is
//! cancelled contributes nothing.

mod dispatch;
pub mod structure;

pub use structure::{STRUCTURE_RULE_ID, check_structure, structure_rule};

use crate::document::resolver::{
    ResolveOptions, build_resolved_view, is_remote, load_rolodex, normalize,
};
use crate::document::{Document, Locator, NodeId, View};
use crate::error::LintError;
use crate::functions::{FunctionMap, FunctionRegistry};
use crate::models::{IgnoreList, Rule, RuleFunctionResult, RuleSet};
use crate::openapi::{DoctorDocument, SpecIndex, SpecInfo};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_NODE_LOOKUP_TIMEOUT: Duration = Duration::from_millis(500);

const INLINE_IGNORE_MESSAGE: &str = "Rule ignored due to inline ignore directive";

/// Everything one run of the engine needs
#[derive(Clone)]
pub struct RuleSetExecution {
    pub rule_set: Arc<RuleSet>,
    pub spec: Vec<u8>,
    /// Name used for the root document in diagnostics and `$ref` resolution
    pub spec_file_name: String,
    /// Budget for each rule
    pub timeout: Duration,
    /// Budget for each `given` expression
    pub node_lookup_timeout: Duration,
    pub custom_functions: FunctionMap,
    /// Fetch remote `$ref` targets
    pub allow_lookup: bool,
    pub skip_document_check: bool,
    pub ignore_circular_array_ref: bool,
    pub ignore_circular_polymorphic_ref: bool,
    pub extract_references_from_extensions: bool,
    /// Directory or URL the spec is resolved relative to
    pub base: Option<String>,
    pub http_client: Option<reqwest::Client>,
    pub ignored_results: IgnoreList,
    pub cancellation: CancellationToken,
}

impl Default for RuleSetExecution {
    fn default() -> Self {
        Self {
            rule_set: Arc::new(RuleSet::default()),
            spec: Vec::new(),
            spec_file_name: "openapi.yaml".to_string(),
            timeout: DEFAULT_TIMEOUT,
            node_lookup_timeout: DEFAULT_NODE_LOOKUP_TIMEOUT,
            custom_functions: FunctionMap::new(),
            allow_lookup: false,
            skip_document_check: false,
            ignore_circular_array_ref: false,
            ignore_circular_polymorphic_ref: false,
            extract_references_from_extensions: false,
            base: None,
            http_client: None,
            ignored_results: IgnoreList::default(),
            cancellation: CancellationToken::new(),
        }
    }
}

impl RuleSetExecution {
    pub fn new(rule_set: impl Into<Arc<RuleSet>>, spec: impl Into<Vec<u8>>) -> Self {
        Self {
            rule_set: rule_set.into(),
            spec: spec.into(),
            ..Default::default()
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.spec_file_name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_node_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.node_lookup_timeout = timeout;
        self
    }

    pub fn with_custom_functions(mut self, functions: FunctionMap) -> Self {
        self.custom_functions = functions;
        self
    }

    pub fn with_allow_lookup(mut self, allow: bool) -> Self {
        self.allow_lookup = allow;
        self
    }

    pub fn with_skip_document_check(mut self, skip: bool) -> Self {
        self.skip_document_check = skip;
        self
    }

    pub fn with_ignore_circular_array_ref(mut self, ignore: bool) -> Self {
        self.ignore_circular_array_ref = ignore;
        self
    }

    pub fn with_ignore_circular_polymorphic_ref(mut self, ignore: bool) -> Self {
        self.ignore_circular_polymorphic_ref = ignore;
        self
    }

    pub fn with_extract_references_from_extensions(mut self, extract: bool) -> Self {
        self.extract_references_from_extensions = extract;
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_ignored_results(mut self, ignored: IgnoreList) -> Self {
        self.ignored_results = ignored;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Location of the root document, joined onto `base` when one is set
    fn root_location(&self) -> String {
        match self.base.as_deref() {
            Some(base) if is_remote(base) => {
                let directory = if base.ends_with('/') {
                    base.to_string()
                } else {
                    format!("{}/", base)
                };
                reqwest::Url::parse(&directory)
                    .and_then(|url| url.join(&self.spec_file_name))
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| self.spec_file_name.clone())
            }
            Some(base) => normalize(&Path::new(base).join(&self.spec_file_name))
                .to_string_lossy()
                .into_owned(),
            None => self.spec_file_name.clone(),
        }
    }
}

impl std::fmt::Debug for RuleSetExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSetExecution")
            .field("rules", &self.rule_set.rules.len())
            .field("spec_file_name", &self.spec_file_name)
            .field("timeout", &self.timeout)
            .field("node_lookup_timeout", &self.node_lookup_timeout)
            .field("custom_functions", &self.custom_functions.keys().collect::<Vec<_>>())
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// What a run produced
#[derive(Debug, Default)]
pub struct RuleSetExecutionResult {
    pub results: Vec<RuleFunctionResult>,
    /// Results suppressed by inline directives or the external ignore list
    pub ignored_results: Vec<RuleFunctionResult>,
    /// Problems found while preparing the document
    pub errors: Vec<LintError>,
    pub index: Option<Arc<SpecIndex>>,
    pub spec_info: Option<SpecInfo>,
    pub doctor_document: Option<Arc<DoctorDocument>>,
    /// Kept for auto-fix drivers; the engine never fills it
    pub fixed_results: Vec<RuleFunctionResult>,
}

/// Shared, read-only state for the rule tasks of one run
pub(crate) struct RunContext {
    pub(crate) locator: Locator,
    pub(crate) registry: FunctionRegistry,
    pub(crate) index: Arc<SpecIndex>,
    pub(crate) doctor: Arc<DoctorDocument>,
    pub(crate) spec_info: SpecInfo,
    pub(crate) base: Option<String>,
    pub(crate) http_client: Option<reqwest::Client>,
    node_lookup_timeout: Duration,
}

/// Run every rule of the execution's ruleset against its spec
pub async fn apply_rules(execution: &RuleSetExecution) -> RuleSetExecutionResult {
    let mut outcome = RuleSetExecutionResult::default();
    let location = execution.root_location();

    let (mut document, parse_error) = Document::parse_partial(&execution.spec, location.as_str());
    let parsed = parse_error.is_none();
    if let Some(error) = parse_error {
        tracing::warn!("Spec {} could not be fully parsed: {}", location, error);
        outcome.results.push(structure::parse_failure(&error));
        outcome.errors.push(error);
        if document.root(View::Unresolved).is_none() {
            return outcome;
        }
    }

    let options = ResolveOptions {
        allow_lookup: execution.allow_lookup,
        extract_references_from_extensions: execution.extract_references_from_extensions,
    };
    let http_client = execution
        .http_client
        .clone()
        .or_else(|| execution.allow_lookup.then(reqwest::Client::new));
    outcome
        .errors
        .extend(load_rolodex(&mut document, &options, http_client.as_ref()).await);
    let report = build_resolved_view(&mut document, &options);

    let spec_info = SpecInfo::detect(&document, &execution.spec);
    let index = Arc::new(SpecIndex::build(
        &document,
        &report,
        execution.extract_references_from_extensions,
    ));
    let doctor = Arc::new(DoctorDocument::build(&document, &index, spec_info.format));
    outcome.errors.extend(reference_errors(execution, &index));

    // A truncated tree would only repeat the parse failure
    if parsed && !execution.skip_document_check {
        match check_structure(&document, &spec_info) {
            Ok(results) => outcome.results.extend(results),
            Err(error) => {
                tracing::warn!("Structural check skipped: {}", error);
                outcome.errors.push(error);
            }
        }
    }

    // Build both JSON projections before the locator is shared
    let _ = document.json(View::Unresolved);
    let _ = document.json(View::Resolved);

    let run = Arc::new(RunContext {
        locator: Locator::new(Arc::new(document)),
        registry: FunctionRegistry::new().with_custom(execution.custom_functions.clone()),
        index: Arc::clone(&index),
        doctor: Arc::clone(&doctor),
        spec_info: spec_info.clone(),
        base: execution.base.clone(),
        http_client,
        node_lookup_timeout: execution.node_lookup_timeout,
    });

    let produced = run_rules(&run, execution).await;
    let (kept, inline_ignored) = partition_inline_ignores(run.locator.document(), produced);
    outcome.results.extend(kept);
    outcome.ignored_results.extend(inline_ignored);

    if !execution.ignored_results.is_empty() {
        let (ignored, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut outcome.results)
            .into_iter()
            .partition(|result| execution.ignored_results.matches(result));
        outcome.results = kept;
        outcome.ignored_results.extend(ignored);
    }

    tracing::info!(
        results = outcome.results.len(),
        ignored = outcome.ignored_results.len(),
        errors = outcome.errors.len(),
        "Linted {}",
        location
    );
    outcome.index = Some(index);
    outcome.spec_info = Some(spec_info);
    outcome.doctor_document = Some(doctor);
    outcome
}

fn reference_errors(execution: &RuleSetExecution, index: &SpecIndex) -> Vec<LintError> {
    let circular = index
        .circular_references()
        .iter()
        .filter(|circular| {
            circular.infinite
                || (circular.array && !execution.ignore_circular_array_ref)
                || (circular.polymorphic && !execution.ignore_circular_polymorphic_ref)
        })
        .map(|circular| LintError::CircularReference {
            definition: circular.definition.clone(),
            path: circular.path.clone(),
        });
    let unresolved = index
        .unresolved_references()
        .iter()
        .map(|unresolved| LintError::UnresolvedReference {
            definition: unresolved.definition.clone(),
            path: unresolved.path.clone(),
        });
    circular.chain(unresolved).collect()
}

/// Whether a rule applies to documents of this dialect
fn applies_to(rule: &Rule, info: &SpecInfo) -> bool {
    rule.formats.is_empty() || rule.formats.iter().any(|format| info.format.matches(format))
}

async fn run_rules(run: &Arc<RunContext>, execution: &RuleSetExecution) -> Vec<RuleFunctionResult> {
    let aggregate = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = JoinSet::new();

    for rule in execution.rule_set.rules.values() {
        if rule.severity.is_off() || !applies_to(rule, &run.spec_info) {
            continue;
        }
        let run = Arc::clone(run);
        let rule = Arc::clone(rule);
        let aggregate = Arc::clone(&aggregate);
        let token = execution.cancellation.child_token();
        let timeout = execution.timeout;

        tasks.spawn(async move {
            let finished = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(rule = %rule.id, "Rule abandoned, run cancelled");
                    return;
                }
                finished = tokio::time::timeout(timeout, run_rule(&run, &rule, &token)) => finished,
            };
            match finished {
                Ok(batch) => {
                    aggregate
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(batch);
                }
                Err(_) => {
                    // stops cooperative functions still running on the blocking pool
                    token.cancel();
                    tracing::debug!("{}", LintError::RuleTimeout { rule: rule.id.clone() });
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!("Rule task failed: {}", e);
        }
    }

    let mut results = aggregate.lock().unwrap_or_else(PoisonError::into_inner);
    std::mem::take(&mut *results)
}

async fn run_rule(
    run: &Arc<RunContext>,
    rule: &Arc<Rule>,
    token: &CancellationToken,
) -> Vec<RuleFunctionResult> {
    let view = if rule.resolved { View::Resolved } else { View::Unresolved };
    let mut results = Vec::new();

    for given in &rule.given {
        let nodes = locate(run, rule, view, given).await;
        if nodes.is_empty() {
            continue;
        }

        let (run, rule, given, token) =
            (Arc::clone(run), Arc::clone(rule), given.clone(), token.clone());
        let batch = tokio::task::spawn_blocking(move || {
            dispatch::run_actions(&run, &rule, &given, view, &nodes, &token)
        })
        .await;
        match batch {
            Ok(batch) => results.extend(batch),
            Err(e) => tracing::warn!("Rule function panicked: {}", e),
        }
    }
    results
}

/// Nodes for one `given`, minus inline-ignore directives, within the lookup budget
async fn locate(run: &Arc<RunContext>, rule: &Rule, view: View, given: &str) -> Vec<NodeId> {
    let lookup = {
        let run = Arc::clone(run);
        let given = given.to_string();
        tokio::task::spawn_blocking(move || run.locator.locate(view, &given))
    };

    let nodes = match tokio::time::timeout(run.node_lookup_timeout, lookup).await {
        Ok(Ok(Ok(nodes))) => nodes,
        Ok(Ok(Err(error))) => {
            tracing::warn!(rule = %rule.id, "{}", error);
            return Vec::new();
        }
        Ok(Err(e)) => {
            tracing::warn!(rule = %rule.id, "Locator task failed: {}", e);
            return Vec::new();
        }
        Err(_) => {
            tracing::warn!(
                rule = %rule.id,
                "Lookup of '{}' exceeded {:?}",
                given,
                run.node_lookup_timeout
            );
            return Vec::new();
        }
    };

    let document = run.locator.document();
    nodes
        .iter()
        .copied()
        .filter(|node| !document.is_inline_ignore_directive(*node))
        .collect()
}

/// Split off results whose node sits in a mapping that ignores their rule
fn partition_inline_ignores(
    document: &Document,
    results: Vec<RuleFunctionResult>,
) -> (Vec<RuleFunctionResult>, Vec<RuleFunctionResult>) {
    let mut kept = Vec::with_capacity(results.len());
    let mut ignored = Vec::new();

    for mut result in results {
        let suppressed = result.node.is_some_and(|node| {
            std::iter::once(node)
                .chain(document.ancestors(node))
                .any(|candidate| {
                    document
                        .inline_ignores(candidate)
                        .contains(&result.rule_id.as_str())
                })
        });
        if suppressed {
            result.message = INLINE_IGNORE_MESSAGE.to_string();
            ignored.push(result);
        } else {
            kept.push(result);
        }
    }
    (kept, ignored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
    use crate::models::{RuleAction, Severity};
    use indexmap::IndexMap;
    use serde_json::json;

    const SPEC: &str = r#"openapi: 3.0.3
info:
  title: Pets
  version: '1'
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
"#;

    fn ruleset(rules: Vec<Rule>) -> RuleSet {
        RuleSet {
            rules: rules
                .into_iter()
                .map(|rule| (rule.id.clone(), Arc::new(rule)))
                .collect::<IndexMap<_, _>>(),
            ..Default::default()
        }
    }

    fn info_description() -> Rule {
        Rule::new("info-description")
            .with_given("$.info")
            .with_severity(Severity::Error)
            .with_action(RuleAction::new("truthy").with_field("description"))
    }

    struct Sleepy;

    impl RuleFunction for Sleepy {
        fn schema(&self) -> RuleFunctionSchema {
            RuleFunctionSchema::new("sleepy")
        }

        fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
            std::thread::sleep(Duration::from_millis(100));
            nodes.iter().map(|node| ctx.result("slept", *node)).collect()
        }
    }

    #[tokio::test]
    async fn test_rule_results_are_stamped() {
        let execution = RuleSetExecution::new(ruleset(vec![info_description()]), SPEC);
        let outcome = apply_rules(&execution).await;

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.results.len(), 1);
        let result = &outcome.results[0];
        assert_eq!(result.rule_id, "info-description");
        assert_eq!(result.severity, Severity::Error);
        assert_eq!(result.path, "$.info");
        assert_eq!(outcome.spec_info.map(|i| i.version), Some("3.0.3".to_string()));
    }

    #[tokio::test]
    async fn test_inline_ignore() {
        let spec = "openapi: 3.1.0\ninfo:\n  title: T\n  version: '1'\n  x-lint-ignore: [info-description]\ncomponents: {}\n";
        let execution = RuleSetExecution::new(ruleset(vec![info_description()]), spec);
        let outcome = apply_rules(&execution).await;

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.ignored_results.len(), 1);
        assert_eq!(outcome.ignored_results[0].rule_id, "info-description");
        assert_eq!(outcome.ignored_results[0].message, INLINE_IGNORE_MESSAGE);
    }

    #[tokio::test]
    async fn test_inline_ignore_directive_is_not_a_target() {
        let spec = "openapi: 3.1.0\ninfo:\n  title: T\n  version: '1'\n  x-lint-ignore: other-rule\ncomponents: {}\n";
        let rule = Rule::new("info-values-start-with-t")
            .with_given("$.info[*]")
            .with_action(RuleAction::new("pattern").with_options(json!({"match": "^T$"})));
        let execution = RuleSetExecution::new(ruleset(vec![rule]), spec);
        let outcome = apply_rules(&execution).await;

        // only `version` fails; the directive value is never handed to the function
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].path, "$.info.version");
    }

    #[tokio::test]
    async fn test_timeout_is_silent() {
        let rule = Rule::new("sleepy-rule")
            .with_given("$")
            .with_action(RuleAction::new("sleepy"));
        let mut custom = FunctionMap::new();
        custom.insert("sleepy".to_string(), Arc::new(Sleepy) as Arc<dyn RuleFunction>);

        let execution = RuleSetExecution::new(ruleset(vec![rule]), SPEC)
            .with_custom_functions(custom)
            .with_timeout(Duration::from_millis(20));
        let outcome = apply_rules(&execution).await;

        assert!(outcome.results.is_empty());
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let execution =
            RuleSetExecution::new(ruleset(vec![info_description()]), SPEC).with_cancellation(token);
        let outcome = apply_rules(&execution).await;
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_options_yield_one_result() {
        let rule = Rule::new("needs-options")
            .with_given("$.paths[*]")
            .with_action(RuleAction::new("xor"));
        let execution = RuleSetExecution::new(ruleset(vec![rule]), SPEC);
        let outcome = apply_rules(&execution).await;

        let expected = FunctionRegistry::new().get("xor").unwrap().schema().error_message;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].message, expected);
    }

    #[tokio::test]
    async fn test_formats_filter() {
        let rule = info_description().with_formats(&["oas2"]);
        let execution = RuleSetExecution::new(ruleset(vec![rule]), SPEC);
        assert!(apply_rules(&execution).await.results.is_empty());
    }

    #[tokio::test]
    async fn test_message_template() {
        let rule = info_description().with_message("{{property}} is required at {{path}}");
        let execution = RuleSetExecution::new(ruleset(vec![rule]), SPEC);
        let outcome = apply_rules(&execution).await;
        assert_eq!(outcome.results[0].message, "description is required at $.info");
    }

    #[tokio::test]
    async fn test_structural_check_and_skip() {
        let spec = "openapi: 3.0.0\ninfo:\n  title: T\n  version: '1'\n";
        let outcome = apply_rules(&RuleSetExecution::new(ruleset(vec![]), spec)).await;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].rule_id, STRUCTURE_RULE_ID);

        let skipped = RuleSetExecution::new(ruleset(vec![]), spec).with_skip_document_check(true);
        assert!(apply_rules(&skipped).await.results.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_document() {
        let execution = RuleSetExecution::new(ruleset(vec![info_description()]), "a: [1, 2");
        let outcome = apply_rules(&execution).await;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].rule_id, STRUCTURE_RULE_ID);
        assert!(matches!(outcome.errors[0], LintError::DocumentParse(_)));
    }

    #[tokio::test]
    async fn test_rules_run_against_partial_parse() {
        let spec = "openapi: 3.0.3\ninfo:\n  title: Pets\n  version: '1'\npaths:\n  /a: [1, 2\n";
        let execution = RuleSetExecution::new(ruleset(vec![info_description()]), spec);
        let outcome = apply_rules(&execution).await;

        let ids: Vec<&str> = outcome.results.iter().map(|r| r.rule_id.as_str()).collect();
        assert!(ids.contains(&STRUCTURE_RULE_ID));
        assert!(ids.contains(&"info-description"));
        assert_eq!(ids.iter().filter(|id| **id == STRUCTURE_RULE_ID).count(), 1);
        assert!(matches!(outcome.errors[0], LintError::DocumentParse(_)));
        assert!(outcome.spec_info.is_some());
    }

    #[tokio::test]
    async fn test_external_ignore_list() {
        let mut ignored = IgnoreList::default();
        ignored.insert("info-description", "$.info");
        let execution = RuleSetExecution::new(ruleset(vec![info_description()]), SPEC)
            .with_ignored_results(ignored);
        let outcome = apply_rules(&execution).await;
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.ignored_results.len(), 1);
    }

    #[test]
    fn test_root_location() {
        let local = RuleSetExecution::default().with_base("/specs/./v1").with_file_name("api.yaml");
        assert_eq!(local.root_location(), "/specs/v1/api.yaml");

        let remote = RuleSetExecution::default()
            .with_base("https://acme.io/specs")
            .with_file_name("api.yaml");
        assert_eq!(remote.root_location(), "https://acme.io/specs/api.yaml");
    }
}
