use crate::document::{NodeId, View};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};
use crate::openapi::SpecFormat;
use std::collections::HashSet;

/// Security requirements may only name declared security schemes
pub struct OpSecurityDefined;

impl RuleFunction for OpSecurityDefined {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasOpSecurityDefined")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Security
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let Some(root) = document.root(View::Unresolved) else {
            return Vec::new();
        };
        let declared: HashSet<&str> = ctx
            .doctor
            .security_schemes
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        let container = if ctx.spec_info.format == SpecFormat::Oas2 {
            "securityDefinitions"
        } else {
            "components.securitySchemes"
        };

        let mut holders = vec![(root, "$".to_string())];
        holders.extend(ctx.doctor.operations.iter().map(|o| (o.node, o.json_path.clone())));

        let mut results = Vec::new();
        for (holder, holder_path) in holders {
            let Some(security) = document.get(holder, "security") else {
                continue;
            };
            for (i, requirement) in document.items(security).iter().enumerate() {
                for (key, _) in document.entries(*requirement) {
                    let name = document.value(key);
                    if declared.contains(name) {
                        continue;
                    }
                    results.push(ctx.result_at(
                        format!(
                            "{}: security requirement `{}` is not defined in `{}`",
                            ctx.description(),
                            name,
                            container
                        ),
                        key,
                        format!("{}.security[{}]", holder_path, i),
                    ));
                }
            }
        }
        results
    }
}
