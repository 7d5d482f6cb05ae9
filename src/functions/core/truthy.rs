use crate::document::NodeId;
use crate::functions::{FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::RuleFunctionResult;

/// The field must be present and truthy
pub struct Truthy;

/// The field, when present, must be falsy
pub struct Falsy;

impl RuleFunction for Truthy {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("truthy")
            .with_max_properties(0)
            .with_error_message("'truthy' takes no options")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let message = || format!("{}: `{}` must be set", ctx.description(), ctx.field_name());
        let mut results = Vec::new();
        for node in nodes {
            match ctx.resolve_field(*node) {
                FieldTarget::Missing => results.push(ctx.result(message(), *node)),
                FieldTarget::Value(value) | FieldTarget::Node(value)
                    if !ctx.document.is_truthy(value) =>
                {
                    results.push(ctx.result(message(), value));
                }
                _ => {}
            }
        }
        results
    }
}

impl RuleFunction for Falsy {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("falsy")
            .with_max_properties(0)
            .with_error_message("'falsy' takes no options")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let mut results = Vec::new();
        for node in nodes {
            match ctx.resolve_field(*node) {
                FieldTarget::Value(value) | FieldTarget::Node(value)
                    if ctx.document.is_truthy(value) =>
                {
                    results.push(ctx.result(
                        format!("{}: `{}` must be falsy", ctx.description(), ctx.field_name()),
                        value,
                    ));
                }
                _ => {}
            }
        }
        results
    }
}
