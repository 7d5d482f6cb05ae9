use crate::document::NodeId;
use crate::functions::{FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::RuleFunctionResult;

pub struct Defined;

pub struct Undefined;

impl RuleFunction for Defined {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("defined")
            .with_max_properties(0)
            .with_requires_field()
            .with_error_message("'defined' needs a field and takes no options")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        nodes
            .iter()
            .filter(|node| ctx.resolve_field(**node) == FieldTarget::Missing)
            .map(|node| {
                ctx.result(
                    format!("{}: `{}` must be defined", ctx.description(), ctx.field_name()),
                    *node,
                )
            })
            .collect()
    }
}

impl RuleFunction for Undefined {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("undefined")
            .with_max_properties(0)
            .with_requires_field()
            .with_error_message("'undefined' needs a field and takes no options")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let mut results = Vec::new();
        for node in nodes {
            if let FieldTarget::Value(value) = ctx.resolve_field(*node) {
                results.push(ctx.result(
                    format!("{}: `{}` must be undefined", ctx.description(), ctx.field_name()),
                    value,
                ));
            }
        }
        results
    }
}
