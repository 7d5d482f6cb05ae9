use crate::document::NodeId;
use crate::functions::openapi::schema_result;
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use crate::openapi::doctor::Schema;

/// Integers are bounded on both sides
pub struct IntegerLimit;

/// Integers declare `int32` or `int64`
pub struct IntegerFormat;

/// Arrays accepted from clients declare `maxItems`
pub struct ArrayLimit;

/// Strings accepted from clients are bounded
pub struct StringLimit;

/// Strings are constrained by format, pattern or a fixed set
pub struct StringRestricted;

/// Objects do not accept arbitrary extra properties
pub struct NoAdditionalProperties;

/// Open objects cap how many properties they accept
pub struct AdditionalPropertiesConstrained;

/// Run `check` over `schemas`, producing one result per failing schema
fn check_schemas<'s>(
    ctx: &RuleFunctionContext<'_>,
    schemas: impl Iterator<Item = &'s Schema>,
    check: impl Fn(&Schema) -> Option<String>,
) -> Vec<RuleFunctionResult> {
    schemas
        .filter_map(|schema| {
            let message = check(schema)?;
            Some(schema_result(ctx, schema, format!("{}: {}", ctx.description(), message)))
        })
        .collect()
}

impl RuleFunction for IntegerLimit {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspIntegerLimit")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        check_schemas(ctx, ctx.doctor.schemas.iter(), |schema| {
            if !schema.is_type(document, "integer") {
                return None;
            }
            let has = |key: &str| document.has(schema.node, key);
            let (min, max) = (has("minimum"), has("maximum"));
            let (exclusive_min, exclusive_max) = (has("exclusiveMinimum"), has("exclusiveMaximum"));
            let bounded = (min && max)
                || (min && exclusive_max)
                || (max && exclusive_min)
                || (exclusive_min && exclusive_max);
            (!bounded).then(|| {
                "integer schema must specify `minimum` and `maximum` (or `exclusiveMinimum` and `exclusiveMaximum`)".to_string()
            })
        })
    }
}

impl RuleFunction for IntegerFormat {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspIntegerFormat")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        check_schemas(ctx, ctx.doctor.schemas.iter(), |schema| {
            if !schema.is_type(document, "integer") {
                return None;
            }
            match document.get_str(schema.node, "format") {
                Some("int32" | "int64") => None,
                _ => Some("integer schema must specify a `format` of `int32` or `int64`".to_string()),
            }
        })
    }
}

impl RuleFunction for ArrayLimit {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspArrayLimit")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        check_schemas(ctx, ctx.doctor.request_schemas(), |schema| {
            (schema.is_type(document, "array") && !document.has(schema.node, "maxItems"))
                .then(|| "array schema must specify `maxItems`".to_string())
        })
    }
}

impl RuleFunction for StringLimit {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspStringLimit")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        check_schemas(ctx, ctx.doctor.request_schemas(), |schema| {
            if !schema.is_type(document, "string") {
                return None;
            }
            let limited = ["maxLength", "const", "enum"]
                .iter()
                .any(|k| document.has(schema.node, k));
            (!limited)
                .then(|| "string schema must specify `maxLength`, `const` or `enum`".to_string())
        })
    }
}

impl RuleFunction for StringRestricted {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspStringRestricted")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        check_schemas(ctx, ctx.doctor.schemas.iter(), |schema| {
            if !schema.is_type(document, "string") {
                return None;
            }
            let restricted = ["format", "pattern", "const", "enum"]
                .iter()
                .any(|k| document.has(schema.node, k));
            (!restricted).then(|| {
                "string schema must specify a `format`, `pattern`, `const` or `enum`".to_string()
            })
        })
    }
}

impl RuleFunction for NoAdditionalProperties {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspNoAdditionalProperties")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        check_schemas(ctx, ctx.doctor.schemas.iter(), |schema| {
            let additional = document.get(schema.node, "additionalProperties")?;
            let open =
                document.is_mapping(additional) || document.as_bool(additional) == Some(true);
            open.then(|| {
                "`additionalProperties` must not be allowed, set it to `false`".to_string()
            })
        })
    }
}

impl RuleFunction for AdditionalPropertiesConstrained {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspAdditionalPropertiesConstrained")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        check_schemas(ctx, ctx.doctor.schemas.iter(), |schema| {
            let additional = document.get(schema.node, "additionalProperties")?;
            (document.is_mapping(additional) && !document.has(schema.node, "maxProperties"))
                .then(|| {
                    "objects with `additionalProperties` must also specify `maxProperties`"
                        .to_string()
                })
        })
    }
}
