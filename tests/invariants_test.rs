use indexmap::IndexMap;
use oaslint::functions::FunctionRegistry;
use oaslint::models::{RuleFunctionResultSet, RuleSet};
use oaslint::rulesets::catalogue;
use oaslint::{RuleSetComposer, RuleSetExecution, apply_rules};
use std::collections::HashSet;
use std::sync::Arc;

const PETSTORE: &str = "tests/fixtures/petstore.yaml";

async fn lint_petstore(rule_set: RuleSet) -> RuleFunctionResultSet {
    let spec = std::fs::read(PETSTORE).unwrap();
    let execution = RuleSetExecution::new(rule_set, spec)
        .with_base("tests/fixtures")
        .with_file_name("petstore.yaml");
    RuleFunctionResultSet::new(apply_rules(&execution).await.results)
}

fn sort_keys(set: &RuleFunctionResultSet) -> Vec<(String, usize, usize, String, String)> {
    set.iter()
        .map(|r| {
            (
                r.filename().to_string(),
                r.start_node.line,
                r.start_node.column,
                r.rule_id.clone(),
                r.message.clone(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_sorted_results_are_deterministic() {
    let mut first = lint_petstore(RuleSetComposer::generate_openapi_default()).await;
    let mut second = lint_petstore(RuleSetComposer::generate_openapi_default()).await;
    first.sort_total();
    second.sort_total();

    assert!(!first.is_empty());
    assert_eq!(sort_keys(&first), sort_keys(&second));
}

#[tokio::test]
async fn test_severity_partition_reproduces_results() {
    let results = lint_petstore(RuleSetComposer::generate_openapi_default()).await;
    let partitioned: usize = results.by_severity().values().map(Vec::len).sum();
    assert_eq!(partitioned, results.len());

    let mut original = sort_keys(&results);
    let mut rebuilt: Vec<_> = results
        .by_severity()
        .into_values()
        .flatten()
        .map(|r| {
            (
                r.filename().to_string(),
                r.start_node.line,
                r.start_node.column,
                r.rule_id.clone(),
                r.message.clone(),
            )
        })
        .collect();
    original.sort();
    rebuilt.sort();
    assert_eq!(original, rebuilt);
}

#[tokio::test]
async fn test_composition_is_repeatable() {
    let source = b"extends: [[spectral:oas, all]]\nrules:\n  info-contact: error\n  operation-tags: off\n";
    let composer = RuleSetComposer::new();
    let first = composer.compose(source).await.unwrap();
    let second = composer.compose(source).await.unwrap();

    assert_eq!(first.rules.len(), second.rules.len());
    for ((id_a, rule_a), (id_b, rule_b)) in first.rules.iter().zip(second.rules.iter()) {
        assert_eq!(id_a, id_b);
        assert_eq!(rule_a, rule_b);
    }
}

#[test]
fn test_recommended_is_subset_of_all() {
    let recommended: HashSet<String> = RuleSetComposer::generate_openapi_recommended()
        .rules
        .into_keys()
        .collect();
    let all: HashSet<String> = RuleSetComposer::generate_openapi_default()
        .rules
        .into_keys()
        .collect();
    assert!(recommended.is_subset(&all));
    assert!(recommended.len() < all.len());
}

#[tokio::test]
async fn test_missing_required_option_yields_error_message() {
    let registry = FunctionRegistry::new();
    let mut rules = IndexMap::new();
    let mut expected = Vec::new();

    for rule in catalogue::rules() {
        for action in &rule.then {
            let Some(function) = registry.get(&action.function) else {
                continue;
            };
            let schema = function.schema();
            let Some(required) = schema.required.first() else {
                continue;
            };

            let mut stripped = action.clone();
            stripped.function_options.remove(required);
            let mut stripped_rule = (**rule).clone();
            stripped_rule.id = format!("{}--{}", rule.id, action.function);
            stripped_rule.given = vec!["$".to_string()];
            stripped_rule.then = vec![stripped];
            stripped_rule.message = None;
            stripped_rule.formats.clear();

            expected.push((stripped_rule.id.clone(), schema.error_message.clone()));
            rules.insert(stripped_rule.id.clone(), Arc::new(stripped_rule));
        }
    }
    assert!(!expected.is_empty());

    let rule_set = RuleSet {
        rules,
        ..Default::default()
    };
    let results = lint_petstore(rule_set).await;
    for (rule_id, message) in expected {
        let produced: Vec<_> = results.iter().filter(|r| r.rule_id == rule_id).collect();
        assert_eq!(produced.len(), 1, "{}", rule_id);
        assert_eq!(produced[0].message, message);
    }
}
