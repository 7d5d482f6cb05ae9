use oaslint::document::NodeId;
use oaslint::functions::{FunctionMap, RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use oaslint::models::{RuleFunctionResult, Severity};
use oaslint::{RuleSetComposer, RuleSetExecution, apply_rules};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn test_minimal_failure_with_all_rules() {
    let spec = "openapi: \"3.1.0\"\ninfo: {title: T, version: \"1\"}\ncomponents:\n  schemas:\n    T: {type: [integer]}\n";
    let execution = RuleSetExecution::new(RuleSetComposer::generate_openapi_default(), spec);
    let outcome = apply_rules(&execution).await;

    for rule_id in ["owasp-integer-limit", "owasp-integer-format"] {
        assert!(
            outcome
                .results
                .iter()
                .any(|r| r.rule_id == rule_id && r.path == "$.components.schemas['T']"),
            "missing {}",
            rule_id
        );
    }
}

#[tokio::test]
async fn test_inline_ignore_scenario() {
    let ruleset = br#"
rules:
  info-description:
    description: Info must be described
    given: $.info
    severity: error
    then:
      field: description
      function: truthy
"#;
    let rule_set = RuleSetComposer::new().compose(ruleset).await.unwrap();
    let spec = "openapi: 3.1.0\ninfo: {title: T, version: \"1\", x-lint-ignore: [\"info-description\"]}\npaths: {}\n";
    let outcome = apply_rules(&RuleSetExecution::new(rule_set, spec)).await;

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.ignored_results.len(), 1);
    assert_eq!(outcome.ignored_results[0].rule_id, "info-description");
}

#[tokio::test]
async fn test_extends_cycle_terminates() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("A.yaml"),
        "extends: [B.yaml]\nrules:\n  rule-a:\n    given: $.info\n    then:\n      function: truthy\n      field: title\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("B.yaml"),
        "extends: [A.yaml]\nrules:\n  rule-b:\n    given: $.info\n    then:\n      function: truthy\n      field: version\n",
    )
    .unwrap();

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let rule_set = RuleSetComposer::new()
        .compose_file(dir.path().join("A.yaml"))
        .await
        .unwrap();
    let ids: Vec<&str> = rule_set.rules.keys().map(String::as_str).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"rule-a"));
    assert!(ids.contains(&"rule-b"));

    let written = logs.contents();
    let warning = written
        .lines()
        .find(|line| line.contains("Circular extends detected"))
        .unwrap_or_else(|| panic!("no cycle warning in {:?}", written));
    assert!(warning.contains("WARN"));
    assert!(warning.contains("B.yaml -> "));
    assert!(warning.contains("A.yaml"));
}

/// Log sink shared with a test subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_inline_ignore_directive_is_not_a_key_target() {
    let ruleset = br#"
rules:
  info-keys-lowercase:
    description: Info keys are lowercase
    given: $.info
    then:
      field: "@key"
      function: pattern
      functionOptions:
        match: ^[a-z]+$
"#;
    let rule_set = RuleSetComposer::new().compose(ruleset).await.unwrap();
    let spec = "openapi: 3.1.0\ninfo: {title: T, version: \"1\", x-lint-ignore: some-other-rule}\npaths: {}\n";
    let outcome = apply_rules(&RuleSetExecution::new(rule_set, spec)).await;

    assert!(outcome.results.is_empty(), "{:?}", outcome.results);
    assert!(outcome.ignored_results.is_empty());
}

#[tokio::test]
async fn test_rules_still_run_after_parse_error() {
    let spec = "openapi: 3.0.3\ninfo:\n  title: T\n  version: '1'\npaths:\n  /a: [1, 2\n";
    let execution = RuleSetExecution::new(RuleSetComposer::generate_openapi_recommended(), spec);
    let outcome = apply_rules(&execution).await;

    assert!(matches!(outcome.errors.first(), Some(oaslint::LintError::DocumentParse(_))));
    let ids: Vec<&str> = outcome.results.iter().map(|r| r.rule_id.as_str()).collect();
    assert!(ids.contains(&"oas-schema-check"));
    assert!(ids.contains(&"info-description"));
}

struct Sleepy;

impl RuleFunction for Sleepy {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("sleepy")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        std::thread::sleep(Duration::from_millis(100));
        nodes.iter().map(|node| ctx.result("woke up", *node)).collect()
    }
}

#[tokio::test]
async fn test_timeout_silence() {
    let mut custom = FunctionMap::new();
    custom.insert("sleepy".to_string(), Arc::new(Sleepy) as Arc<dyn RuleFunction>);

    let rule_set = RuleSetComposer::new()
        .with_custom_functions(custom.clone())
        .compose(b"rules:\n  slow:\n    given: $\n    then:\n      function: sleepy\n")
        .await
        .unwrap();
    let spec = "openapi: 3.1.0\ninfo: {title: T, version: \"1\"}\npaths: {}\n";
    let execution = RuleSetExecution::new(rule_set, spec)
        .with_custom_functions(custom)
        .with_timeout(Duration::from_millis(20));
    let outcome = apply_rules(&execution).await;

    assert!(outcome.results.is_empty());
    assert!(outcome.errors.is_empty());
}

#[tokio::test]
async fn test_extends_with_override_to_off() {
    let rule_set = RuleSetComposer::new()
        .compose(b"extends: spectral:oas\nrules:\n  info-contact: false\n")
        .await
        .unwrap();
    assert!(!rule_set.rules.contains_key("info-contact"));
    assert!(rule_set.rules.contains_key("info-description"));
    assert_eq!(rule_set.rules["info-description"].severity, Severity::Warn);
}

#[tokio::test]
async fn test_schema_force_validation() {
    let ruleset = br#"
rules:
  info-license-object:
    description: Info license
    given: $.info
    then:
      field: license
      function: schema
      functionOptions:
        forceValidation: true
        schema:
          type: object
"#;
    let rule_set = RuleSetComposer::new().compose(ruleset).await.unwrap();
    let spec = "openapi: 3.1.0\ninfo: {title: T, version: \"1\"}\npaths: {}\n";
    let outcome = apply_rules(&RuleSetExecution::new(rule_set, spec)).await;

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0].message.contains("`license`, is missing and is required"));
    assert_eq!(outcome.results[0].path, "$.info[0]");
}
