use crate::document::NodeId;
use crate::functions::{
    FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema, lenient_bool,
};
use crate::models::RuleFunctionResult;
use jsonschema::Draft;
use serde::Deserialize;
use serde_json::Value;

/// Validate nodes against an inline JSON Schema
pub struct Schema;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaOptions {
    schema: Value,
    #[serde(default, deserialize_with = "lenient_bool")]
    unpack: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    force_validation: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    force_validation_on_current_node: bool,
}

fn build_validator(schema: &Value) -> Result<jsonschema::Validator, String> {
    let declares_draft = schema.get("$schema").is_some();
    let options = if declares_draft {
        jsonschema::options()
    } else {
        jsonschema::options().with_draft(Draft::Draft7)
    };
    options.build(schema).map_err(|e| e.to_string())
}

impl RuleFunction for Schema {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("schema")
            .with_required(&["schema"])
            .with_min_properties(1)
            .with_max_properties(4)
            .with_property("schema", "The JSON Schema to validate against")
            .with_property("unpack", "Validate each item of an array on its own")
            .with_property("forceValidation", "Report a missing field instead of skipping it")
            .with_property("forceValidationOnCurrentNode", "Ignore the field and validate the located node")
            .with_error_message("'schema' function has invalid options supplied. Set 'schema' to a JSON Schema")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let Some(options) = ctx.options::<SchemaOptions>() else {
            return Vec::new();
        };
        let document = ctx.document;

        let validator = match build_validator(&options.schema) {
            Ok(validator) => validator,
            Err(e) => {
                let message = format!("{}: schema is invalid: {}", ctx.description(), e);
                return nodes.first().map(|n| ctx.result(message, *n)).into_iter().collect();
            }
        };

        let mut results = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            if ctx.is_cancelled() {
                return Vec::new();
            }

            let target = if options.force_validation_on_current_node {
                *node
            } else {
                match ctx.resolve_field(*node) {
                    FieldTarget::Node(n) | FieldTarget::Value(n) => n,
                    FieldTarget::Missing if options.force_validation => {
                        results.push(ctx.result_at(
                            format!("{}, `{}`, is missing and is required", ctx.description(), ctx.field_name()),
                            *node,
                            format!("{}[{}]", ctx.given, index),
                        ));
                        continue;
                    }
                    _ => continue,
                }
            };

            let instances: Vec<NodeId> = if options.unpack && document.is_sequence(target) {
                document.items(target).to_vec()
            } else {
                vec![target]
            };

            for instance in instances {
                let json = document.to_json(instance);
                for error in validator.iter_errors(&json) {
                    results.push(ctx.result(format!("{}: {}", ctx.description(), error), instance));
                }
            }
        }
        results
    }
}
