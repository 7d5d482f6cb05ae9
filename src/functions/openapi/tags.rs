use crate::document::NodeId;
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use std::collections::HashSet;

/// Operation tags must be declared in the global `tags`
pub struct TagDefined;

impl RuleFunction for TagDefined {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasTagDefined")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Tags
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let declared: HashSet<&str> = ctx.doctor.tags.iter().map(|t| t.name.as_str()).collect();
        let mut results = Vec::new();

        for operation in &ctx.doctor.operations {
            let Some(tags) = document.get(operation.node, "tags") else {
                continue;
            };
            for (i, tag) in document.items(tags).iter().enumerate() {
                let Some(name) = document.as_str(*tag) else {
                    continue;
                };
                if declared.contains(name) {
                    continue;
                }
                results.push(ctx.result_at(
                    format!(
                        "{}: the `{}` operation at path `{}` contains a tag `{}` that is not defined in the global document tags",
                        ctx.description(),
                        operation.method,
                        operation.path,
                        name
                    ),
                    *tag,
                    format!("{}.tags[{}]", operation.json_path, i),
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
    fn test_undeclared_tag() {
        let fixture = Fixture::new(
            r#"
openapi: 3.1.0
tags:
  - name: pets
paths:
  /pets:
    get:
      tags: [pets, stores]
"#,
        );
        let results = fixture.run(&TagDefined, "$", RuleAction::new("oasTagDefined"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "$.paths['/pets'].get.tags[1]");
        assert!(results[0].message.contains("tag `stores`"));
    }
}
