use crate::document::{NodeId, View};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use std::collections::HashSet;

/// Components nothing points at
pub struct UnusedComponent;

/// Components carry a description
pub struct ComponentDescriptions;

/// Kinds that are used through `$ref`; security schemes are used by name
const REFERENCED_KINDS: &[&str] = &[
    "schemas",
    "definitions",
    "parameters",
    "responses",
    "examples",
    "requestBodies",
    "headers",
    "links",
    "callbacks",
    "pathItems",
];

const DESCRIBED_KINDS: &[&str] = &[
    "parameters",
    "responses",
    "examples",
    "requestBodies",
    "headers",
    "links",
    "securitySchemes",
    "securityDefinitions",
];

/// Schema names reached through a discriminator mapping instead of `$ref`
fn discriminator_targets(ctx: &RuleFunctionContext<'_>) -> HashSet<String> {
    let document = ctx.document;
    let mut targets = HashSet::new();
    for schema in &ctx.doctor.schemas {
        let Some(mapping) = document
            .get(schema.node, "discriminator")
            .and_then(|d| document.get(d, "mapping"))
        else {
            continue;
        };
        for (_, value) in document.lint_entries(mapping) {
            let target = document.value(value);
            targets.insert(target.rsplit('/').next().unwrap_or(target).to_string());
        }
    }
    targets
}

impl RuleFunction for UnusedComponent {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasUnusedComponent")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schemas
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let mapped = discriminator_targets(ctx);
        ctx.index
            .components()
            .iter()
            .filter(|c| REFERENCED_KINDS.contains(&c.kind.as_str()))
            .filter(|c| !ctx.index.is_referenced(c.node) && !mapped.contains(&c.name))
            .map(|c| {
                ctx.result_at(
                    format!("{}: `{}` is potentially unused or has been orphaned", ctx.description(), c.path),
                    c.node,
                    c.path.clone(),
                )
            })
            .collect()
    }
}

impl RuleFunction for ComponentDescriptions {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasComponentDescriptions")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Descriptions
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let root_file = document.root(View::Unresolved).map(|r| document.file(r));
        let mut results = Vec::new();

        for component in ctx.index.components() {
            if !DESCRIBED_KINDS.contains(&component.kind.as_str())
                || Some(document.file(component.node)) != root_file
            {
                continue;
            }
            let target = document.follow(component.node);
            let described = document
                .get_str(target, "description")
                .is_some_and(|d| !d.trim().is_empty());
            if !described {
                results.push(ctx.result_at(
                    format!(
                        "{}: component `{}` in `{}` is missing a description",
                        ctx.description(),
                        component.name,
                        component.kind
                    ),
                    component.node,
                    component.path.clone(),
                ));
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

    const SPEC: &str = r##"
openapi: 3.0.3
paths:
  /pets:
    get:
      parameters:
        - $ref: '#/components/parameters/Limit'
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
components:
  parameters:
    Limit: {name: limit, in: query, description: page size}
    Offset: {name: offset, in: query}
  schemas:
    Pet:
      type: object
      discriminator:
        propertyName: kind
        mapping:
          dog: '#/components/schemas/Dog'
    Dog: {type: object}
    Orphan: {type: string}
"##;

    #[test]
    fn test_unused_components() {
        let fixture = Fixture::new(SPEC);
        let results = fixture.run(&UnusedComponent, "$", RuleAction::new("oasUnusedComponent"));
        let paths: Vec<_> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["$.components.schemas['Orphan']", "$.components.parameters['Offset']"]
        );
    }

    #[test]
    fn test_component_descriptions() {
        let fixture = Fixture::new(SPEC);
        let action = RuleAction::new("oasComponentDescriptions");
        let results = fixture.run(&ComponentDescriptions, "$", action);
        assert_eq!(results.len(), 1);
        assert!(results[0].message.contains("`Offset` in `parameters`"));
    }
}
