use crate::document::{NodeId, View};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema, lenient_bool};
use crate::models::{RuleCategory, RuleFunctionResult};
use serde::Deserialize;

/// API keys must not travel in the URL
pub struct NoApiKeyInUrl;

/// No HTTP basic or negotiate authentication
pub struct NoBasicAuth;

/// No HTTP `negotiate` or `oauth` schemes
pub struct AuthInsecureSchemes;

/// OAuth2 and JWT schemes reference RFC8725
pub struct JwtBestPractice;

/// Operations using the configured methods must be secured
pub struct CheckSecurity;

impl RuleFunction for NoApiKeyInUrl {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspNoApiKeyInUrl")
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
        for scheme in &ctx.doctor.security_schemes {
            if document.get_str(scheme.node, "type") != Some("apiKey") {
                continue;
            }
            let Some(location) = document.get(scheme.node, "in") else {
                continue;
            };
            if matches!(document.value(location), "query" | "path") {
                results.push(ctx.result_at(
                    format!(
                        "{}: API key `{}` is passed in the `{}`, use a header or cookie instead",
                        ctx.description(),
                        scheme.name,
                        document.value(location)
                    ),
                    location,
                    format!("{}.in", scheme.json_path),
                ));
            }
        }
        results
    }
}

/// The `scheme` of an `http` security scheme, lower-cased
fn http_scheme(ctx: &RuleFunctionContext<'_>, scheme: NodeId) -> Option<(NodeId, String)> {
    let document = ctx.document;
    if document.get_str(scheme, "type") != Some("http") {
        return None;
    }
    let node = document.get(scheme, "scheme")?;
    Some((node, document.value(node).to_ascii_lowercase()))
}

impl RuleFunction for NoBasicAuth {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspNoBasicAuth")
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
        for scheme in &ctx.doctor.security_schemes {
            // swagger 2 spells it as its own type
            if document.get_str(scheme.node, "type") == Some("basic") {
                results.push(ctx.result_at(
                    format!("{}: security scheme `{}` uses basic authentication", ctx.description(), scheme.name),
                    scheme.node,
                    scheme.json_path.clone(),
                ));
                continue;
            }
            if let Some((node, value)) = http_scheme(ctx, scheme.node)
                && matches!(value.as_str(), "basic" | "negotiate")
            {
                results.push(ctx.result_at(
                    format!(
                        "{}: security scheme `{}` uses the `{}` HTTP scheme",
                        ctx.description(),
                        scheme.name,
                        value
                    ),
                    node,
                    format!("{}.scheme", scheme.json_path),
                ));
            }
        }
        results
    }
}

impl RuleFunction for AuthInsecureSchemes {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspAuthInsecureSchemes")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        ctx.doctor
            .security_schemes
            .iter()
            .filter_map(|scheme| {
                let (node, value) = http_scheme(ctx, scheme.node)?;
                matches!(value.as_str(), "negotiate" | "oauth").then(|| {
                    ctx.result_at(
                        format!(
                            "{}: security scheme `{}` uses the deprecated `{}` HTTP scheme",
                            ctx.description(),
                            scheme.name,
                            value
                        ),
                        node,
                        format!("{}.scheme", scheme.json_path),
                    )
                })
            })
            .collect()
    }
}

impl RuleFunction for JwtBestPractice {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspJWTBestPractice")
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
        for scheme in &ctx.doctor.security_schemes {
            let oauth = document.get_str(scheme.node, "type") == Some("oauth2");
            let jwt = document
                .get_str(scheme.node, "bearerFormat")
                .is_some_and(|f| f.eq_ignore_ascii_case("jwt"));
            if !oauth && !jwt {
                continue;
            }
            let mentions = document
                .get_str(scheme.node, "description")
                .is_some_and(|d| d.contains("RFC8725"));
            if !mentions {
                results.push(ctx.result_at(
                    format!(
                        "{}: security scheme `{}` must explain that it follows RFC8725 in its `description`",
                        ctx.description(),
                        scheme.name
                    ),
                    scheme.node,
                    scheme.json_path.clone(),
                ));
            }
        }
        results
    }
}

#[derive(Debug, Deserialize)]
struct CheckSecurityOptions {
    methods: Vec<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    nullable: bool,
}

impl RuleFunction for CheckSecurity {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspCheckSecurity")
            .with_required(&["methods"])
            .with_property("methods", "HTTP methods whose operations must be secured")
            .with_property("nullable", "Accept empty security requirements (optional authentication)")
            .with_error_message("'owaspCheckSecurity' function has invalid options supplied. Set 'methods' to a list of HTTP methods")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let Some(options) = ctx.options::<CheckSecurityOptions>() else {
            return Vec::new();
        };
        let document = ctx.document;
        let global = document
            .root(View::Unresolved)
            .and_then(|root| document.get(root, "security"));
        let mut results = Vec::new();

        for operation in &ctx.doctor.operations {
            if !options.methods.iter().any(|m| m.eq_ignore_ascii_case(&operation.method)) {
                continue;
            }
            let own = document.get(operation.node, "security");
            let path = format!("{}.security", operation.json_path);
            let Some(security) = own.or(global) else {
                results.push(ctx.result_at(
                    format!(
                        "{}: `{}` operation at `{}` has no `security` defined",
                        ctx.description(),
                        operation.method,
                        operation.path
                    ),
                    operation.node,
                    operation.json_path.clone(),
                ));
                continue;
            };
            let anchor = if own.is_some() { security } else { operation.node };

            let requirements = document.items(security);
            if requirements.is_empty() {
                results.push(ctx.result_at(
                    format!(
                        "{}: `{}` operation at `{}` has an empty `security` list",
                        ctx.description(),
                        operation.method,
                        operation.path
                    ),
                    anchor,
                    path,
                ));
                continue;
            }
            if options.nullable {
                continue;
            }
            for (i, requirement) in requirements.iter().enumerate() {
                if document.is_null(*requirement) || document.len_of(*requirement) == 0 {
                    results.push(ctx.result_at(
                        format!(
                            "{}: `{}` operation at `{}` allows unauthenticated access through an empty security requirement",
                            ctx.description(),
                            operation.method,
                            operation.path
                        ),
                        if own.is_some() { *requirement } else { anchor },
                        format!("{}[{}]", path, i),
                    ));
                }
            }
        }
        results
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
      responses: {}
    post:
      security: []
      responses: {}
    put:
      security:
        - {}
      responses: {}
    delete:
      security:
        - key: []
      responses: {}
components:
  securitySchemes:
    key: {type: apiKey, in: query, name: key}
    header: {type: apiKey, in: header, name: X-Key}
    basic: {type: http, scheme: Basic}
    legacy: {type: http, scheme: negotiate}
    jwt: {type: http, scheme: bearer, bearerFormat: JWT}
    oauth:
      type: oauth2
      description: Tokens follow RFC8725
      flows: {}
"#;

    fn run(function: &dyn RuleFunction, action: RuleAction) -> Vec<RuleFunctionResult> {
        Fixture::new(SPEC).run(function, "$", action)
    }

    #[test]
    fn test_api_key_in_url() {
        let results = run(&NoApiKeyInUrl, RuleAction::new("owaspNoApiKeyInUrl"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "$.components.securitySchemes['key'].in");
    }

    #[test]
    fn test_basic_and_insecure_schemes() {
        let basic = run(&NoBasicAuth, RuleAction::new("owaspNoBasicAuth"));
        assert_eq!(basic.len(), 2);
        let insecure = run(&AuthInsecureSchemes, RuleAction::new("owaspAuthInsecureSchemes"));
        assert_eq!(insecure.len(), 1);
        assert!(insecure[0].message.contains("`legacy`"));
    }

    #[test]
    fn test_jwt_best_practice() {
        let results = run(&JwtBestPractice, RuleAction::new("owaspJWTBestPractice"));
        assert_eq!(results.len(), 1);
        assert!(results[0].message.contains("`jwt`"));
    }

    #[test]
    fn test_check_security() {
        let action = RuleAction::new("owaspCheckSecurity")
            .with_options(json!({"methods": ["get", "post", "put", "delete"]}));
        let results = run(&CheckSecurity, action);
        let paths: Vec<_> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "$.paths['/pets'].get",
                "$.paths['/pets'].post.security",
                "$.paths['/pets'].put.security[0]"
            ]
        );
    }

    #[test]
    fn test_check_security_nullable() {
        let action = RuleAction::new("owaspCheckSecurity")
            .with_options(json!({"methods": ["put"], "nullable": true}));
        assert!(run(&CheckSecurity, action).is_empty());
    }
}
