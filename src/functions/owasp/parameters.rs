use crate::document::{Document, NodeId};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use crate::openapi::doctor::Parameter;
use regex::Regex;
use std::sync::LazyLock;

/// Identifier parameters must not be guessable integers
pub struct NoNumericIds;

/// Credentials must not travel in the path or query
pub struct NoCredentialsInUrl;

/// `id`, `*-id`, `*_id` and `*id` in any case
static ID_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)id$").expect("Invalid regex"));

static CREDENTIALS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*(client_?secret|token|access_?token|refresh_?token|id_?token|password|secret|api-?key).*$")
        .expect("Invalid regex")
});

/// The node carrying a parameter's `type`: its `schema` in OpenAPI 3, itself in swagger 2
fn type_holder(document: &Document, parameter: &Parameter) -> (NodeId, String) {
    match document.get(parameter.node, "schema") {
        Some(schema) => (document.follow(schema), format!("{}.schema", parameter.json_path)),
        None => (parameter.node, parameter.json_path.clone()),
    }
}

impl RuleFunction for NoNumericIds {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspNoNumericIds")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let mut results = Vec::new();
        for parameter in &ctx.doctor.parameters {
            if !ID_NAME.is_match(&parameter.name) {
                continue;
            }
            let (holder, holder_path) = type_holder(document, parameter);
            let Some(type_node) = document.get(holder, "type") else {
                continue;
            };
            let integer = if document.is_sequence(type_node) {
                document
                    .items(type_node)
                    .iter()
                    .any(|t| document.as_str(*t) == Some("integer"))
            } else {
                document.value(type_node) == "integer"
            };
            if integer {
                results.push(ctx.result_at(
                    format!(
                        "{}: parameter `{}` uses an integer identifier, use random IDs that cannot be guessed (UUIDs are preferred)",
                        ctx.description(),
                        parameter.name
                    ),
                    type_node,
                    format!("{}.type", holder_path),
                ));
            }
        }
        results
    }
}

impl RuleFunction for NoCredentialsInUrl {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspNoCredentialsInUrl")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        ctx.doctor
            .parameters
            .iter()
            .filter(|p| matches!(p.location.as_str(), "path" | "query"))
            .filter(|p| CREDENTIALS_NAME.is_match(&p.name))
            .map(|p| {
                ctx.result_at(
                    format!(
                        "{}: parameter `{}` in `{}` looks like a credential, do not pass credentials in the URL",
                        ctx.description(),
                        p.name,
                        p.location
                    ),
                    p.node,
                    p.json_path.clone(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::Fixture;
    use crate::models::RuleAction;

    const SPEC: &str = r#"
openapi: 3.0.3
paths:
  /pets/{id}:
    get:
      parameters:
        - {name: id, in: path, required: true, schema: {type: integer}}
        - {name: owner_id, in: query, schema: {type: string}}
        - {name: storeId, in: query, schema: {type: [integer, "null"]}}
        - {name: paid, in: query, schema: {type: integer}}
        - {name: access_token, in: query, schema: {type: string}}
        - {name: X-Api-Key, in: header, schema: {type: string}}
      responses: {}
"#;

    #[test]
    fn test_no_numeric_ids() {
        let fixture = Fixture::new(SPEC);
        let results = fixture.run(&NoNumericIds, "$", RuleAction::new("owaspNoNumericIds"));
        let paths: Vec<_> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "$.paths['/pets/{id}'].get.parameters[0].schema.type",
                "$.paths['/pets/{id}'].get.parameters[2].schema.type",
                "$.paths['/pets/{id}'].get.parameters[3].schema.type"
            ]
        );
    }

    #[test]
    fn test_no_credentials_in_url() {
        let fixture = Fixture::new(SPEC);
        let action = RuleAction::new("owaspNoCredentialsInUrl");
        let results = fixture.run(&NoCredentialsInUrl, "$", action);
        assert_eq!(results.len(), 1);
        assert!(results[0].message.contains("`access_token`"));
    }
}
