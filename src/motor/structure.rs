//! Structural validation of a document against the embedded OpenAPI meta-schemas.

use crate::document::{Document, NodeId, PathSegment, View};
use crate::error::{LintError, Result};
use crate::models::{Rule, RuleCategory, RuleFunctionResult, Severity};
use crate::openapi::{SpecFormat, SpecInfo};
use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::sync::{Arc, LazyLock};

pub const STRUCTURE_RULE_ID: &str = "oas-schema-check";

const OAS2_SCHEMA: &str = include_str!("schemas/oas2.json");
const OAS3_SCHEMA: &str = include_str!("schemas/oas3.json");

static STRUCTURE_RULE: LazyLock<Arc<Rule>> = LazyLock::new(|| {
    Arc::new(
        Rule::new(STRUCTURE_RULE_ID)
            .with_description("document must match the OpenAPI specification structure")
            .with_given("$")
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Validation)
            .with_recommended(true)
            .with_resolved(false)
            .with_type("validation"),
    )
});

static OAS2_VALIDATOR: LazyLock<Option<Validator>> = LazyLock::new(|| build_validator(OAS2_SCHEMA));
static OAS3_VALIDATOR: LazyLock<Option<Validator>> = LazyLock::new(|| build_validator(OAS3_SCHEMA));

fn build_validator(source: &str) -> Option<Validator> {
    let schema: Value = match serde_json::from_str(source) {
        Ok(schema) => schema,
        Err(e) => {
            tracing::error!("Embedded meta-schema is not valid JSON: {}", e);
            return None;
        }
    };
    match jsonschema::options().with_draft(Draft::Draft7).build(&schema) {
        Ok(validator) => Some(validator),
        Err(e) => {
            tracing::error!("Embedded meta-schema failed to compile: {}", e);
            None
        }
    }
}

/// The synthetic rule structural and parse failures are reported under
pub fn structure_rule() -> Arc<Rule> {
    Arc::clone(&STRUCTURE_RULE)
}

/// Validate the raw document against the meta-schema for its declared version
pub fn check_structure(document: &Document, info: &SpecInfo) -> Result<Vec<RuleFunctionResult>> {
    let validator = match info.format {
        SpecFormat::Oas2 => OAS2_VALIDATOR.as_ref(),
        SpecFormat::Oas3_0 | SpecFormat::Oas3_1 => OAS3_VALIDATOR.as_ref(),
        SpecFormat::Unknown if info.version.is_empty() => {
            return Err(LintError::UnsupportedSpecVersion(
                "no 'openapi' or 'swagger' version declared".to_string(),
            ));
        }
        SpecFormat::Unknown => {
            return Err(LintError::UnsupportedSpecVersion(format!(
                "{} {}",
                info.spec_type, info.version
            )));
        }
    };
    let (Some(validator), Some(root)) = (validator, document.root(View::Unresolved)) else {
        return Ok(Vec::new());
    };

    let rule = structure_rule();
    let json = document.json(View::Unresolved);
    let results = validator
        .iter_errors(json)
        .map(|error| {
            let node = locate_pointer(document, root, &error.instance_path.to_string());
            RuleFunctionResult::new(
                &rule,
                format!("OpenAPI specification is invalid: {}", error),
                document.path_of(node),
            )
            .with_node(document, node)
        })
        .collect();
    Ok(results)
}

/// A single result standing in for a document that could not be parsed
pub fn parse_failure(error: &LintError) -> RuleFunctionResult {
    RuleFunctionResult::new(&structure_rule(), error.to_string(), "$")
}

/// Deepest node reachable along a JSON pointer
fn locate_pointer(document: &Document, root: NodeId, pointer: &str) -> NodeId {
    let mut current = root;
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        let segment = match token.parse::<usize>() {
            Ok(index) if document.is_sequence(current) => PathSegment::Index(index),
            _ => PathSegment::Key(token),
        };
        match document.descend(current, std::slice::from_ref(&segment)) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str) -> Result<Vec<RuleFunctionResult>> {
        let document = Document::parse(source.as_bytes(), "spec.yaml").unwrap();
        let info = SpecInfo::detect(&document, source.as_bytes());
        check_structure(&document, &info)
    }

    #[test]
    fn test_valid_oas3() {
        let results = check(
            "openapi: 3.0.3\ninfo:\n  title: Pets\n  version: '1'\npaths:\n  /pets:\n    get:\n      responses:\n        '200':\n          description: ok\n",
        )
        .unwrap();
        assert!(results.is_empty(), "{:?}", results.iter().map(|r| &r.message).collect::<Vec<_>>());
    }

    #[test]
    fn test_oas30_requires_paths() {
        let results = check("openapi: 3.0.0\ninfo:\n  title: T\n  version: '1'\n").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_id, STRUCTURE_RULE_ID);
        assert_eq!(results[0].severity, Severity::Error);
        assert_eq!(results[0].path, "$");
    }

    #[test]
    fn test_oas31_accepts_components_only() {
        let results = check(
            "openapi: 3.1.0\ninfo:\n  title: T\n  version: '1'\ncomponents:\n  schemas:\n    T:\n      type: [integer]\n",
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_errors_anchor_on_offending_node() {
        let results = check(
            "swagger: '2.0'\ninfo:\n  title: T\n  version: '1'\npaths:\n  /pets:\n    get:\n      responses:\n        '200': {}\n",
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "$.paths['/pets'].get.responses['200']");
        assert_eq!(results[0].start_node.line, 9);
    }

    #[test]
    fn test_unknown_version() {
        assert!(matches!(
            check("openapi: 4.0.0\n"),
            Err(LintError::UnsupportedSpecVersion(_))
        ));
        assert!(matches!(check("title: nope\n"), Err(LintError::UnsupportedSpecVersion(_))));
    }
}
