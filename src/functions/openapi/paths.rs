use crate::document::{NodeId, View};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};

/// Path templates that could match the same request
pub struct AmbiguousPaths;

#[derive(Debug, PartialEq, Eq)]
enum Overlap {
    None,
    /// Same shape with variables renamed
    Equivalent,
    /// Each path has a literal where the other has a variable
    Ambiguous,
}

fn is_variable(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

fn overlap(a: &str, b: &str) -> Overlap {
    let left: Vec<&str> = a.trim_end_matches('/').split('/').collect();
    let right: Vec<&str> = b.trim_end_matches('/').split('/').collect();
    if left.len() != right.len() {
        return Overlap::None;
    }

    let mut left_variable = false;
    let mut right_variable = false;
    for (l, r) in left.iter().zip(&right) {
        match (is_variable(l), is_variable(r)) {
            (false, false) if l != r => return Overlap::None,
            (true, false) => left_variable = true,
            (false, true) => right_variable = true,
            _ => {}
        }
    }
    match (left_variable, right_variable) {
        (false, false) => Overlap::Equivalent,
        (true, true) => Overlap::Ambiguous,
        // a literal segment takes precedence over a variable one
        _ => Overlap::None,
    }
}

impl RuleFunction for AmbiguousPaths {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("ambiguousPaths")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Operations
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let Some(paths) = document
            .root(View::Unresolved)
            .and_then(|root| document.get(root, "paths"))
        else {
            return Vec::new();
        };
        let keys: Vec<NodeId> = document.lint_entries(paths).map(|(k, _)| k).collect();

        let mut results = Vec::new();
        for (i, later) in keys.iter().enumerate() {
            let later_path = document.value(*later);
            for earlier in &keys[..i] {
                let earlier_path = document.value(*earlier);
                let described = match overlap(earlier_path, later_path) {
                    Overlap::None => continue,
                    Overlap::Equivalent => "equivalent",
                    Overlap::Ambiguous => "ambiguous",
                };
                results.push(ctx.result(
                    format!(
                        "{}: paths `{}` and `{}` are {}",
                        ctx.description(),
                        earlier_path,
                        later_path,
                        described
                    ),
                    *later,
                ));
            }
        }
        results
    }
}
