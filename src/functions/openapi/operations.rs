use super::operation_label;
use crate::document::NodeId;
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use std::collections::HashMap;

/// Every operation defines a 2xx or 3xx response
pub struct OpSuccessResponse;

/// Every operation defines a 4xx response
pub struct OpErrorResponse;

/// operationIds are unique across the document
pub struct OpIdUnique;

/// An operation's summary does not repeat its description
pub struct DescriptionDuplication;

fn response_codes(ctx: &RuleFunctionContext<'_>, operation: NodeId) -> Option<Vec<String>> {
    let document = ctx.document;
    let responses = document.get(operation, "responses")?;
    Some(
        document
            .entries(responses)
            .map(|(code, _)| document.value(code).to_ascii_uppercase())
            .collect(),
    )
}

fn check_responses(
    ctx: &RuleFunctionContext<'_>,
    wanted: &[char],
    describe: &str,
) -> Vec<RuleFunctionResult> {
    let document = ctx.document;
    let mut results = Vec::new();
    for operation in &ctx.doctor.operations {
        let codes = response_codes(ctx, operation.node);
        let found = codes
            .as_ref()
            .is_some_and(|codes| codes.iter().any(|c| c.starts_with(wanted)));
        if found {
            continue;
        }
        let message = format!(
            "{}: operation {} must define at least one {} response",
            ctx.description(),
            operation_label(document, operation),
            describe
        );
        match document.get_key(operation.node, "responses") {
            Some(key) => {
                let path = format!("{}.responses", operation.json_path);
                results.push(ctx.result_at(message, key, path));
            }
            None => {
                results.push(ctx.result_at(message, operation.node, operation.json_path.clone()))
            }
        }
    }
    results
}

impl RuleFunction for OpSuccessResponse {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasOpSuccessResponse")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Operations
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        check_responses(ctx, &['2', '3'], "`2xx` or `3xx`")
    }
}

impl RuleFunction for OpErrorResponse {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasOpErrorResponse")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Operations
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        check_responses(ctx, &['4'], "`4xx`")
    }
}

impl RuleFunction for OpIdUnique {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasOpIdUnique")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Operations
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut results = Vec::new();

        for operation in &ctx.doctor.operations {
            let Some(id_node) = document.get(operation.node, "operationId") else {
                continue;
            };
            let id = document.value(id_node);
            if id.is_empty() {
                continue;
            }
            match seen.get(id) {
                Some(first) => results.push(ctx.result_at(
                    format!(
                        "{}: the `operationId` `{}` must be unique amongst all operations (first used at `{}`)",
                        ctx.description(),
                        id,
                        first
                    ),
                    id_node,
                    format!("{}.operationId", operation.json_path),
                )),
                None => {
                    seen.insert(id, &operation.path);
                }
            }
        }
        results
    }
}

impl RuleFunction for DescriptionDuplication {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasDescriptionDuplication")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Descriptions
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let mut results = Vec::new();
        for operation in &ctx.doctor.operations {
            let summary = document.get_str(operation.node, "summary").map(str::trim);
            let Some(description) = document.get(operation.node, "description") else {
                continue;
            };
            if summary.is_some_and(|s| !s.is_empty() && s == document.value(description).trim()) {
                results.push(ctx.result_at(
                    format!(
                        "{}: operation {} has a `description` identical to its `summary`",
                        ctx.description(),
                        operation_label(document, operation)
                    ),
                    description,
                    format!("{}.description", operation.json_path),
                ));
            }
        }
        results
    }
}
