use crate::document::{NodeId, View};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};

/// Keys placed beside a `$ref` are ignored by tooling
pub struct RefSiblings;

impl RuleFunction for RefSiblings {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("refSiblings")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schemas
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let root_file = document.root(View::Unresolved).map(|r| document.file(r));
        let mut results = Vec::new();

        for site in ctx.index.references() {
            if Some(document.file(site.node)) != root_file {
                continue;
            }
            for (key, _) in document.entries(site.node) {
                let name = document.value(key);
                if name == "$ref" {
                    continue;
                }
                results.push(ctx.result(
                    format!(
                        "{}: `{}` cannot be placed next to a `$ref`, it will be ignored",
                        ctx.description(),
                        name
                    ),
                    key,
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

    #[test]
    fn test_ref_siblings() {
        let fixture = Fixture::new(
            r##"
openapi: 3.0.3
components:
  schemas:
    Pet:
      $ref: '#/components/schemas/Animal'
      description: a pet
    Cat:
      $ref: '#/components/schemas/Animal'
    Animal: {type: object}
"##,
        );
        let results = fixture.run(&RefSiblings, "$", RuleAction::new("refSiblings"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "$.components.schemas['Pet'].description");
    }
}
