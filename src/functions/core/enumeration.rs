use crate::document::NodeId;
use crate::functions::{FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::RuleFunctionResult;
use serde::Deserialize;
use serde_json::Value;

/// Value must be one of a fixed list
pub struct Enumeration;

#[derive(Debug, Deserialize)]
struct EnumerationOptions {
    values: Value,
}

impl EnumerationOptions {
    /// `values` may be a comma-separated string or a list
    fn allowed(&self) -> Vec<String> {
        match &self.values {
            Value::String(s) => s
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl RuleFunction for Enumeration {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("enumeration")
            .with_required(&["values"])
            .with_min_properties(1)
            .with_max_properties(1)
            .with_property("values", "Comma-separated list of allowed values")
            .with_error_message("'enumeration' function has invalid options supplied. Set 'values' to a comma-separated list")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let Some(options) = ctx.options::<EnumerationOptions>() else {
            return Vec::new();
        };
        let allowed = options.allowed();
        let document = ctx.document;

        let mut results = Vec::new();
        for node in nodes {
            let target = match ctx.resolve_field(*node) {
                FieldTarget::Node(n) | FieldTarget::Value(n) => n,
                _ => continue,
            };
            if !document.is_scalar(target) {
                continue;
            }
            let value = document.value(target);
            if !allowed.iter().any(|a| a == value) {
                results.push(ctx.result(
                    format!(
                        "{}: `{}` must equal to one of: [{}]",
                        ctx.description(),
                        value,
                        allowed.join(", ")
                    ),
                    target,
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
    use serde_json::json;

    #[test]
    fn test_enumeration() {
        let fixture = Fixture::new("schemes: [https, ftp]\n");
        let comma = fixture.run(
            &Enumeration,
            "$.schemes[*]",
            RuleAction::new("enumeration").with_options(json!({"values": "http, https"})),
        );
        assert_eq!(comma.len(), 1);
        assert!(comma[0].message.contains("`ftp` must equal to one of: [http, https]"));

        let list = fixture.run(
            &Enumeration,
            "$.schemes[*]",
            RuleAction::new("enumeration").with_options(json!({"values": ["https", "ftp"]})),
        );
        assert!(list.is_empty());
    }
}
