use crate::document::{Document, NodeId, NodeKind, ScalarType};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use serde_json::Value;

/// `enum` values agree with the schema's declared `type`
pub struct TypedEnum;

/// `enum` values are unique
pub struct DuplicatedEnum;

fn matches_type(document: &Document, value: NodeId, type_name: &str) -> bool {
    match document.kind(value) {
        NodeKind::Mapping => type_name == "object",
        NodeKind::Sequence => type_name == "array",
        _ => matches!(
            (document.scalar_type(value), type_name),
            (Some(ScalarType::Str), "string")
                | (Some(ScalarType::Int), "integer" | "number")
                | (Some(ScalarType::Float), "number")
                | (Some(ScalarType::Bool), "boolean")
                | (Some(ScalarType::Null), "null")
        ),
    }
}

impl RuleFunction for TypedEnum {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("typedEnum")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schemas
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let mut results = Vec::new();

        for schema in &ctx.doctor.schemas {
            let Some(values) = document.get(schema.node, "enum") else {
                continue;
            };
            let types = schema.types(document);
            if types.is_empty() {
                continue;
            }
            let nullable = document
                .get(schema.node, "nullable")
                .and_then(|n| document.as_bool(n))
                .unwrap_or(false);

            for (i, value) in document.items(values).iter().enumerate() {
                if nullable && document.is_null(*value) {
                    continue;
                }
                if types.iter().any(|t| matches_type(document, *value, t)) {
                    continue;
                }
                results.push(ctx.result_at(
                    format!(
                        "{}: enum value `{}` must be of type `{}`",
                        ctx.description(),
                        document.value(*value),
                        types.join("`, `")
                    ),
                    *value,
                    format!("{}.enum[{}]", schema.json_path, i),
                ));
            }
        }
        results
    }
}

impl RuleFunction for DuplicatedEnum {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("duplicatedEnum")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schemas
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let mut results = Vec::new();

        for schema in &ctx.doctor.schemas {
            let Some(values) = document.get(schema.node, "enum") else {
                continue;
            };
            let mut seen: Vec<Value> = Vec::new();
            for (i, value) in document.items(values).iter().enumerate() {
                let json = document.to_json(*value);
                if seen.contains(&json) {
                    results.push(ctx.result_at(
                        format!("{}: enum contains a duplicate value `{}`", ctx.description(), json),
                        *value,
                        format!("{}.enum[{}]", schema.json_path, i),
                    ));
                } else {
                    seen.push(json);
                }
            }
        }
        results
    }
}
