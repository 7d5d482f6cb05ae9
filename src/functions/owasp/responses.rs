use super::header_names;
use crate::document::{Document, NodeId};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use serde::Deserialize;
use serde_json::Value;

/// A configured error response exists and carries a schema
pub struct CheckErrorResponse;

/// Operations declare a 400, 422 or 4XX response
pub struct DefineErrorDefinition;

/// 2xx and 4xx responses carry rate-limit headers
pub struct HeaderDefinition;

/// 429 responses tell clients when to retry
pub struct RatelimitRetryAfter;

/// Whether a response object defines a body schema in either spec version
fn has_schema(document: &Document, response: NodeId) -> bool {
    if document.has(response, "schema") {
        return true;
    }
    document.get(response, "content").is_some_and(|content| {
        document
            .entries(content)
            .any(|(_, media)| document.has(media, "schema"))
    })
}

#[derive(Debug, Deserialize)]
struct CheckErrorResponseOptions {
    code: Value,
}

impl RuleFunction for CheckErrorResponse {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspCheckErrorResponse")
            .with_required(&["code"])
            .with_property("code", "Response code every operation must define")
            .with_error_message("'owaspCheckErrorResponse' function has invalid options supplied. Set 'code' to a response code")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let Some(options) = ctx.options::<CheckErrorResponseOptions>() else {
            return Vec::new();
        };
        let code = match options.code {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let document = ctx.document;
        let mut results = Vec::new();

        for (i, operation) in ctx.doctor.operations.iter().enumerate() {
            let Some(response) = ctx.doctor.responses_of(i).find(|r| r.code == code) else {
                let anchor = document
                    .get_key(operation.node, "responses")
                    .unwrap_or(operation.node);
                results.push(ctx.result_at(
                    format!(
                        "{}: `{}` operation at `{}` is missing a `{}` response",
                        ctx.description(),
                        operation.method,
                        operation.path,
                        code
                    ),
                    anchor,
                    format!("{}.responses", operation.json_path),
                ));
                continue;
            };
            if !has_schema(document, response.node) {
                results.push(ctx.result_at(
                    format!("{}: `{}` response must define a schema", ctx.description(), code),
                    response.node,
                    response.json_path.clone(),
                ));
            }
        }
        results
    }
}

impl RuleFunction for DefineErrorDefinition {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspDefineErrorDefinition")
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
        for (i, operation) in ctx.doctor.operations.iter().enumerate() {
            let Some(responses) = document.get_key(operation.node, "responses") else {
                continue;
            };
            let defined = ctx
                .doctor
                .responses_of(i)
                .any(|r| matches!(r.code.to_ascii_uppercase().as_str(), "400" | "422" | "4XX"));
            if !defined {
                results.push(ctx.result_at(
                    format!(
                        "{}: `{}` operation at `{}` must define a `400`, `422` or `4XX` response",
                        ctx.description(),
                        operation.method,
                        operation.path
                    ),
                    responses,
                    format!("{}.responses", operation.json_path),
                ));
            }
        }
        results
    }
}

/// One or more header sets; a plain string is a set of one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HeaderSet {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct HeaderDefinitionOptions {
    headers: Vec<HeaderSet>,
}

impl RuleFunction for HeaderDefinition {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspHeaderDefinition")
            .with_required(&["headers"])
            .with_property("headers", "Header sets, at least one of which every response must carry")
            .with_error_message("'owaspHeaderDefinition' function has invalid options supplied. Set 'headers' to a list of header sets")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let Some(options) = ctx.options::<HeaderDefinitionOptions>() else {
            return Vec::new();
        };
        let sets: Vec<Vec<String>> = options
            .headers
            .into_iter()
            .map(|set| match set {
                HeaderSet::One(name) => vec![name.to_ascii_lowercase()],
                HeaderSet::Many(names) => names.iter().map(|n| n.to_ascii_lowercase()).collect(),
            })
            .filter(|set| !set.is_empty())
            .collect();
        if sets.is_empty() {
            return Vec::new();
        }
        let wanted = sets
            .iter()
            .map(|set| set.join(" + "))
            .collect::<Vec<_>>()
            .join("` or `");

        let document = ctx.document;
        let mut results = Vec::new();
        for response in &ctx.doctor.responses {
            if !response.code.starts_with(['2', '4']) {
                continue;
            }
            let present = header_names(document, response.node);
            if sets.iter().any(|set| set.iter().all(|h| present.contains(h))) {
                continue;
            }
            results.push(ctx.result_at(
                format!(
                    "{}: `{}` response must define the headers `{}`",
                    ctx.description(),
                    response.code,
                    wanted
                ),
                response.node,
                response.json_path.clone(),
            ));
        }
        results
    }
}

impl RuleFunction for RatelimitRetryAfter {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspRatelimitRetryAfter")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        ctx.doctor
            .responses
            .iter()
            .filter(|r| r.code == "429")
            .filter(|r| !header_names(document, r.node).iter().any(|h| h == "retry-after"))
            .map(|r| {
                ctx.result_at(
                    format!("{}: `429` response must define a `Retry-After` header", ctx.description()),
                    r.node,
                    r.json_path.clone(),
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
    use serde_json::json;

    const SPEC: &str = r#"
openapi: 3.0.3
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          headers:
            X-RateLimit-Limit: {schema: {type: integer}}
            X-RateLimit-Reset: {schema: {type: integer}}
        '401':
          description: unauthorised
          content:
            application/json:
              schema: {type: object}
        '429':
          description: slow down
          headers:
            Retry-After: {schema: {type: integer}}
    post:
      responses:
        '201':
          description: created
          headers:
            RateLimit: {schema: {type: string}}
        '401':
          description: unauthorised
        '422':
          description: invalid
        '429':
          description: slow down
"#;

    fn run(function: &dyn RuleFunction, action: RuleAction) -> Vec<RuleFunctionResult> {
        Fixture::new(SPEC).run(function, "$", action)
    }

    #[test]
    fn test_check_error_response() {
        let results = run(
            &CheckErrorResponse,
            RuleAction::new("owaspCheckErrorResponse").with_options(json!({"code": 401})),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "$.paths['/pets'].post.responses['401']");

        let missing = run(
            &CheckErrorResponse,
            RuleAction::new("owaspCheckErrorResponse").with_options(json!({"code": "500"})),
        );
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn test_define_error_definition() {
        let results = run(&DefineErrorDefinition, RuleAction::new("owaspDefineErrorDefinition"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "$.paths['/pets'].get.responses");
    }

    #[test]
    fn test_header_definition() {
        let action = RuleAction::new("owaspHeaderDefinition").with_options(json!({
            "headers": [["X-RateLimit-Limit", "X-RateLimit-Reset"], "RateLimit"]
        }));
        let results = run(&HeaderDefinition, action);
        let paths: Vec<_> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "$.paths['/pets'].get.responses['401']",
                "$.paths['/pets'].get.responses['429']",
                "$.paths['/pets'].post.responses['401']",
                "$.paths['/pets'].post.responses['422']",
                "$.paths['/pets'].post.responses['429']"
            ]
        );
    }

    #[test]
    fn test_ratelimit_retry_after() {
        let results = run(&RatelimitRetryAfter, RuleAction::new("owaspRatelimitRetryAfter"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "$.paths['/pets'].post.responses['429']");
    }
}
