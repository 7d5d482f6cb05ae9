use super::{format_number, node_label};
use crate::document::{NodeId, NodeKind, ScalarType};
use crate::functions::{
    FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema, lenient_number,
};
use crate::models::RuleFunctionResult;
use serde::Deserialize;

/// Size bounds on strings, numbers, maps and arrays
pub struct Length;

#[derive(Debug, Default, Deserialize)]
struct LengthOptions {
    #[serde(default, deserialize_with = "lenient_number")]
    min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    max: Option<f64>,
}

impl RuleFunction for Length {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("length")
            .with_min_properties(1)
            .with_max_properties(2)
            .with_property("min", "Minimum length or value")
            .with_property("max", "Maximum length or value")
            .with_error_message("'length' needs 'min' or 'max' (or both) set")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let Some(options) = ctx.options::<LengthOptions>() else {
            return Vec::new();
        };
        if options.min.is_none() && options.max.is_none() {
            return Vec::new();
        }
        let document = ctx.document;
        let mut results = Vec::new();

        for node in nodes {
            let target = match ctx.resolve_field(*node) {
                FieldTarget::Node(n) | FieldTarget::Value(n) => n,
                _ => continue,
            };
            let (size, noun) = match document.kind(target) {
                NodeKind::Mapping => (document.lint_entries(target).count() as f64, "entries"),
                NodeKind::Sequence => (document.len_of(target) as f64, "items"),
                NodeKind::Scalar => match document.scalar_type(target) {
                    Some(ScalarType::Str) => {
                        (document.value(target).chars().count() as f64, "characters")
                    }
                    Some(ScalarType::Int | ScalarType::Float) => match document.as_f64(target) {
                        Some(value) => (value, ""),
                        None => continue,
                    },
                    _ => continue,
                },
            };
            let label = node_label(document, target, ctx.field_name());

            if let Some(min) = options.min
                && size < min
            {
                let bound = if noun.is_empty() {
                    format!("less than {}", format_number(min))
                } else {
                    format!("shorter than {} {}", format_number(min), noun)
                };
                results.push(ctx.result(
                    format!("{}: `{}` must not be {}", ctx.description(), label, bound),
                    target,
                ));
            }
            if let Some(max) = options.max
                && size > max
            {
                let bound = if noun.is_empty() {
                    format!("greater than {}", format_number(max))
                } else {
                    format!("longer than {} {}", format_number(max), noun)
                };
                results.push(ctx.result(
                    format!("{}: `{}` must not be {}", ctx.description(), label, bound),
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

    const SPEC: &str = r#"
title: Pet Store
count: 7
ratio: 0.5
list: [a, b, c]
map: {a: 1, b: 2}
"#;

    fn run(field: &str, options: serde_json::Value) -> usize {
        let fixture = Fixture::new(SPEC);
        fixture
            .run(&Length, "$", RuleAction::new("length").with_field(field).with_options(options))
            .len()
    }

    #[test]
    fn test_containers_between_bounds() {
        for (k, expected) in [(1, 1), (2, 0), (3, 0), (4, 1)] {
            assert_eq!(run("list", json!({"min": k, "max": k + 1})), expected, "k = {}", k);
        }
        assert_eq!(run("map", json!({"max": 1})), 1);
    }

    #[test]
    fn test_strings_and_numbers() {
        assert_eq!(run("title", json!({"max": 5})), 1);
        assert_eq!(run("title", json!({"min": 1, "max": "20"})), 0);
        assert_eq!(run("count", json!({"max": 6})), 1);
        assert_eq!(run("ratio", json!({"min": 1})), 1);
        assert_eq!(run("missing", json!({"min": 1})), 0);
    }

    #[test]
    fn test_message() {
        let fixture = Fixture::new(SPEC);
        let results = fixture.run(
            &Length,
            "$",
            RuleAction::new("length").with_field("title").with_options(json!({"max": 3})),
        );
        assert_eq!(results[0].message, "test rule: `title` must not be longer than 3 characters");
    }
}
