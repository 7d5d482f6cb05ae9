use crate::document::NodeId;
use crate::error::{LintError, Result};
use crate::functions::{FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::RuleFunctionResult;
use dashmap::DashMap;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Regex `match` / `notMatch` against scalar values
pub struct Pattern;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternOptions {
    #[serde(default, rename = "match")]
    must_match: Option<String>,
    #[serde(default)]
    not_match: Option<String>,
}

static COMPILED: LazyLock<DashMap<String, Regex>> = LazyLock::new(DashMap::new);

/// Turn `/expr/flags` into an inline-flag regex; anything else compiles as written.
///
/// Only a trailing run of `i`, `m`, `s` counts as flags, so `/admin/[0-9]+`
/// stays a plain expression.
fn normalize(pattern: &str) -> String {
    if let Some(rest) = pattern.strip_prefix('/')
        && let Some(end) = rest.rfind('/')
    {
        let (body, flags) = (&rest[..end], &rest[end + 1..]);
        if !flags.chars().all(|c| matches!(c, 'i' | 'm' | 's')) {
            return pattern.to_string();
        }
        if flags.is_empty() {
            return body.to_string();
        }
        return format!("(?{}){}", flags, body);
    }
    pattern.to_string()
}

/// Compile a pattern once and intern it
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    let source = normalize(pattern);
    if let Some(hit) = COMPILED.get(&source) {
        return Ok(hit.value().clone());
    }
    let compiled = Regex::new(&source).map_err(|e| LintError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    COMPILED.insert(source, compiled.clone());
    Ok(compiled)
}

impl RuleFunction for Pattern {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("pattern")
            .with_min_properties(1)
            .with_max_properties(2)
            .with_property("match", "Regular expression the value must match")
            .with_property("notMatch", "Regular expression the value must not match")
            .with_error_message("'pattern' needs 'match' or 'notMatch' (or both) set")
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let Some(options) = ctx.options::<PatternOptions>() else {
            return Vec::new();
        };
        let document = ctx.document;
        let anchor = nodes.first().copied();

        let compile = |source: &str| -> std::result::Result<Regex, RuleFunctionResult> {
            // Rules built with a `pattern` hint carry the compiled form already
            if let Some(pattern) = ctx.pattern
                && pattern.as_str() == normalize(source)
            {
                return Ok(pattern.clone());
            }
            compile_pattern(source).map_err(|e| {
                let message = format!("{}: cannot run pattern rule, {}", ctx.description(), e);
                match anchor {
                    Some(node) => ctx.result(message, node),
                    None => RuleFunctionResult::new(ctx.rule, message, ctx.given),
                }
            })
        };

        let must_match = match options.must_match.as_deref().map(&compile).transpose() {
            Ok(p) => p,
            Err(result) => return vec![result],
        };
        let not_match = match options.not_match.as_deref().map(&compile).transpose() {
            Ok(p) => p,
            Err(result) => return vec![result],
        };

        let mut targets = Vec::new();
        for node in nodes {
            match ctx.resolve_field(*node) {
                FieldTarget::Node(n) | FieldTarget::Value(n) => targets.push(n),
                FieldTarget::Keys(keys) => targets.extend(keys),
                FieldTarget::Missing => {}
            }
        }

        let mut results = Vec::new();
        for target in targets.into_iter().filter(|n| document.is_scalar(*n)) {
            let value = document.value(target);
            if let (Some(regex), Some(source)) = (&must_match, &options.must_match)
                && !regex.is_match(value)
            {
                results.push(ctx.result(
                    format!(
                        "{}: `{}` does not match the expression `{}`",
                        ctx.description(),
                        value,
                        source
                    ),
                    target,
                ));
            }
            if let (Some(regex), Some(source)) = (&not_match, &options.not_match)
                && regex.is_match(value)
            {
                results.push(ctx.result(
                    format!("{}: `{}` matches the expression `{}`", ctx.description(), value, source),
                    target,
                ));
            }
        }
        results
    }
}
