use crate::document::{Document, NodeId};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};

/// A discriminator names a declared, required property
pub struct Discriminator;

/// The schema itself plus its `allOf` members
fn composed(document: &Document, schema: NodeId) -> Vec<NodeId> {
    let mut parts = vec![schema];
    if let Some(all_of) = document.get(schema, "allOf") {
        parts.extend(document.items(all_of).iter().map(|p| document.follow(*p)));
    }
    parts
}

fn declares(document: &Document, parts: &[NodeId], property: &str) -> bool {
    parts.iter().any(|p| {
        document
            .get(*p, "properties")
            .is_some_and(|props| document.has(props, property))
    })
}

fn requires(document: &Document, parts: &[NodeId], property: &str) -> bool {
    parts.iter().any(|p| {
        document.get(*p, "required").is_some_and(|required| {
            document
                .items(required)
                .iter()
                .any(|r| document.as_str(*r) == Some(property))
        })
    })
}

impl RuleFunction for Discriminator {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasDiscriminator")
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
            let Some(discriminator) = document.get(schema.node, "discriminator") else {
                continue;
            };
            let path = format!("{}.discriminator", schema.json_path);
            // swagger 2 uses a plain string, OpenAPI 3 an object with `propertyName`
            let property = if document.is_mapping(discriminator) {
                document.get_str(discriminator, "propertyName")
            } else {
                document.as_str(discriminator)
            };
            let Some(property) = property.filter(|p| !p.is_empty()) else {
                results.push(ctx.result_at(
                    format!("{}: discriminator must name a property", ctx.description()),
                    discriminator,
                    path,
                ));
                continue;
            };

            let parts = composed(document, schema.node);
            if !declares(document, &parts, property) {
                results.push(ctx.result_at(
                    format!(
                        "{}: discriminator property `{}` is not defined in the schema's `properties`",
                        ctx.description(),
                        property
                    ),
                    discriminator,
                    path,
                ));
            } else if !requires(document, &parts, property) {
                results.push(ctx.result_at(
                    format!(
                        "{}: discriminator property `{}` must be listed in `required`",
                        ctx.description(),
                        property
                    ),
                    discriminator,
                    path,
                ));
            }
        }
        results
    }
}
