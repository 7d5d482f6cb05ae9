use crate::document::{Document, NodeId, View};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use std::collections::HashSet;

/// Parameters are unique per (name, in) and body/formData are not mixed
pub struct OpParams;

/// Path template variables and `in: path` parameters line up
pub struct PathParam;

/// `(site, followed parameter)` pairs of a `parameters` list
fn parameter_list(document: &Document, holder: NodeId) -> Vec<(NodeId, NodeId)> {
    document
        .get(holder, "parameters")
        .map(|list| {
            document
                .items(list)
                .iter()
                .map(|site| (*site, document.follow(*site)))
                .collect()
        })
        .unwrap_or_default()
}

fn name_and_location(document: &Document, parameter: NodeId) -> Option<(&str, &str)> {
    Some((document.get_str(parameter, "name")?, document.get_str(parameter, "in")?))
}

/// Variables named in a path template, in order
pub(crate) fn template_variables(path: &str) -> Vec<&str> {
    let mut variables = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        variables.push(&rest[start + 1..start + end]);
        rest = &rest[start + end + 1..];
    }
    variables
}

/// `in: path` parameters must appear in the template and be required
fn check_declared(
    ctx: &RuleFunctionContext<'_>,
    template: &str,
    variables: &HashSet<&str>,
    list: &[(NodeId, NodeId)],
    list_path: &str,
) -> Vec<RuleFunctionResult> {
    let document = ctx.document;
    let mut results = Vec::new();
    for (i, (site, parameter)) in list.iter().enumerate() {
        let Some((name, "path")) = name_and_location(document, *parameter) else {
            continue;
        };
        let path = format!("{}.parameters[{}]", list_path, i);
        if !variables.contains(name) {
            results.push(ctx.result_at(
                format!(
                    "{}: parameter `{}` must be used in path `{}`",
                    ctx.description(),
                    name,
                    template
                ),
                *site,
                path.clone(),
            ));
        }
        if document.get(*parameter, "required").and_then(|r| document.as_bool(r)) != Some(true) {
            results.push(ctx.result_at(
                format!(
                    "{}: path parameter `{}` must have `required` set to `true`",
                    ctx.description(),
                    name
                ),
                *site,
                path,
            ));
        }
    }
    results
}

impl RuleFunction for OpParams {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasOpParams")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Operations
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let mut results = Vec::new();

        let mut holders: Vec<(NodeId, String)> = Vec::new();
        let mut seen_items = HashSet::new();
        for operation in &ctx.doctor.operations {
            if seen_items.insert(operation.path_item) {
                holders.push((operation.path_item, document.path_of(operation.path_item)));
            }
            holders.push((operation.node, operation.json_path.clone()));
        }

        for (holder, holder_path) in holders {
            let parameters = parameter_list(document, holder);
            let mut seen = HashSet::new();
            let mut body = 0;
            let mut form_data = false;

            for (i, (site, parameter)) in parameters.iter().enumerate() {
                let Some((name, location)) = name_and_location(document, *parameter) else {
                    continue;
                };
                let path = format!("{}.parameters[{}]", holder_path, i);
                if !seen.insert((name, location)) {
                    results.push(ctx.result_at(
                        format!(
                            "{}: a parameter named `{}` in `{}` is already defined for this operation",
                            ctx.description(),
                            name,
                            location
                        ),
                        *site,
                        path.clone(),
                    ));
                }
                match location {
                    "body" => {
                        body += 1;
                        if body > 1 {
                            results.push(ctx.result_at(
                                format!("{}: operations cannot have more than one `body` parameter", ctx.description()),
                                *site,
                                path.clone(),
                            ));
                        }
                    }
                    "formData" => form_data = true,
                    _ => {}
                }
            }

            if body > 0 && form_data {
                results.push(ctx.result_at(
                    format!(
                        "{}: operations cannot have both `body` and `formData` parameters",
                        ctx.description()
                    ),
                    holder,
                    format!("{}.parameters", holder_path),
                ));
            }
        }
        results
    }
}

impl RuleFunction for PathParam {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasPathParam")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Operations
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let Some(paths) = document
            .root(View::Unresolved)
            .and_then(|root| document.get(root, "paths"))
        else {
            return Vec::new();
        };
        let mut results = Vec::new();

        for (key, site) in document.lint_entries(paths) {
            let template = document.value(key);
            let item = document.follow(site);
            let item_path = document.path_of(site);
            let variables = template_variables(template);

            let mut unique = HashSet::new();
            for variable in &variables {
                if !unique.insert(*variable) {
                    results.push(ctx.result_at(
                        format!(
                            "{}: path `{}` must not use parameter `{{{}}}` multiple times",
                            ctx.description(),
                            template,
                            variable
                        ),
                        key,
                        item_path.clone(),
                    ));
                }
            }

            let shared = parameter_list(document, item);
            results.extend(check_declared(ctx, template, &unique, &shared, &item_path));

            for operation in ctx.doctor.operations.iter().filter(|o| o.path_item == item) {
                let own = parameter_list(document, operation.node);
                results.extend(check_declared(ctx, template, &unique, &own, &operation.json_path));

                let declared: HashSet<&str> = shared
                    .iter()
                    .chain(own.iter())
                    .filter_map(|(_, p)| name_and_location(document, *p))
                    .filter(|(_, location)| *location == "path")
                    .map(|(name, _)| name)
                    .collect();
                for variable in unique.iter().filter(|v| !declared.contains(**v)) {
                    results.push(ctx.result_at(
                        format!(
                            "{}: operation must define parameter `{{{}}}` as expected by path `{}`",
                            ctx.description(),
                            variable,
                            template
                        ),
                        operation.node,
                        operation.json_path.clone(),
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

    #[test]
    fn test_template_variables() {
        assert_eq!(template_variables("/pets/{id}/toys/{toyId}"), vec!["id", "toyId"]);
        assert!(template_variables("/pets").is_empty());
    }

    #[test]
    fn test_op_params() {
        let fixture = Fixture::new(
            r#"
swagger: "2.0"
paths:
  /pets:
    post:
      parameters:
        - {name: a, in: query}
        - {name: a, in: query}
        - {name: body, in: body}
        - {name: form, in: formData}
      responses: {}
"#,
        );
        let results = fixture.run(&OpParams, "$", RuleAction::new("oasOpParams"));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, "$.paths['/pets'].post.parameters[1]");
        assert!(results[1].message.contains("both `body` and `formData`"));
    }

    #[test]
    fn test_path_params() {
        let fixture = Fixture::new(
            r#"
openapi: 3.0.3
paths:
  /pets/{id}:
    get:
      parameters:
        - {name: id, in: path, required: true}
        - {name: extra, in: path, required: true}
      responses: {}
    put:
      responses: {}
  /owners/{a}/{a}:
    parameters:
      - {name: a, in: path}
    get:
      responses: {}
"#,
        );
        let results = fixture.run(&PathParam, "$", RuleAction::new("oasPathParam"));
        let messages: Vec<_> = results.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(results.len(), 4, "{:?}", messages);
        assert!(messages[0].contains("parameter `extra` must be used in path `/pets/{id}`"));
        assert!(messages[1].contains("must define parameter `{id}`"));
        assert!(messages[2].contains("must not use parameter `{a}` multiple times"));
        assert!(messages[3].contains("`a` must have `required` set to `true`"));
    }
}
