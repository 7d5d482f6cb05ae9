use crate::document::NodeId;
use crate::functions::{FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::RuleFunctionResult;
use serde::Deserialize;

/// Exactly one of two properties must be present
pub struct Xor;

#[derive(Debug, Deserialize)]
struct XorOptions {
    properties: Vec<String>,
}

impl RuleFunction for Xor {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("xor")
            .with_required(&["properties"])
            .with_min_properties(1)
            .with_max_properties(1)
            .with_property("properties", "The two property names to check")
            .with_error_message("'xor' function has invalid options supplied. Set 'properties' to exactly two names")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let Some(options) = ctx.options::<XorOptions>() else {
            return Vec::new();
        };
        let [first, second] = options.properties.as_slice() else {
            let message = self.schema().error_message;
            return nodes.first().map(|n| ctx.result(message, *n)).into_iter().collect();
        };
        let document = ctx.document;

        let mut results = Vec::new();
        for node in nodes {
            let target = match ctx.resolve_field(*node) {
                FieldTarget::Node(n) | FieldTarget::Value(n) => n,
                _ => continue,
            };
            if !document.is_mapping(target) {
                continue;
            }
            let present = [first, second].iter().filter(|p| document.has(target, p)).count();
            if present != 1 {
                results.push(ctx.result(
                    format!(
                        "{}: `{}` and `{}` must not be both defined or both undefined",
                        ctx.description(),
                        first,
                        second
                    ),
                    target,
                ));
            }
        }
        results
    }
}
