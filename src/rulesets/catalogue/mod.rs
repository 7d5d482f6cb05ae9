//! The built-in rules every preset is cut from.

mod openapi;
mod owasp;

use super::precompile;
use crate::models::Rule;
use indexmap::IndexMap;
use std::sync::{Arc, LazyLock};

/// `$.paths` operations, one per HTTP method
pub(crate) const OPERATIONS: &str =
    "$.paths[*]['get','put','post','delete','options','head','patch','trace']";

static CATALOGUE: LazyLock<IndexMap<String, Arc<Rule>>> = LazyLock::new(|| {
    openapi::rules()
        .into_iter()
        .chain(owasp::rules())
        .map(|mut rule| {
            precompile(&mut rule);
            (rule.id.clone(), Arc::new(rule))
        })
        .collect()
});

/// Every built-in rule, in catalogue order
pub fn rules() -> impl Iterator<Item = &'static Arc<Rule>> {
    CATALOGUE.values()
}

pub fn rule(id: &str) -> Option<Arc<Rule>> {
    CATALOGUE.get(id).cloned()
}

/// The curated subset switched on by `recommended`
pub fn recommended() -> impl Iterator<Item = &'static Arc<Rule>> {
    rules().filter(|rule| rule.recommended)
}

/// The OWASP API security family
pub fn owasp() -> impl Iterator<Item = &'static Arc<Rule>> {
    rules().filter(|rule| rule.id.starts_with("owasp-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRegistry;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_ids_unique() {
        let count = openapi::rules().len() + owasp::rules().len();
        assert_eq!(CATALOGUE.len(), count);
    }

    #[test]
    fn test_every_function_is_registered() {
        let registry = FunctionRegistry::new();
        for rule in rules() {
            assert!(!rule.given.is_empty(), "{} has no given", rule.id);
            for action in &rule.then {
                assert!(
                    registry.contains(&action.function),
                    "{} uses {}",
                    rule.id,
                    action.function
                );
                let function = registry.get(&action.function).unwrap();
                assert!(function.schema().validate(action).is_ok(), "{} has bad options", rule.id);
            }
        }
    }

    #[test]
    fn test_recommended_is_subset() {
        let all: HashSet<&str> = rules().map(|r| r.id.as_str()).collect();
        let recommended: Vec<&str> = recommended().map(|r| r.id.as_str()).collect();
        assert!(recommended.len() >= 30);
        assert!(recommended.iter().all(|id| all.contains(id)));
        assert!(owasp().all(|r| !r.recommended));
    }

    #[test]
    fn test_patterns_precompiled() {
        let rule = rule("operation-operationId-valid-in-url").unwrap();
        assert!(rule.precompiled_pattern.is_some());
    }
}
