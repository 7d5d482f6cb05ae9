use super::RunContext;
use crate::document::{NodeId, View};
use crate::error::LintError;
use crate::functions::RuleFunctionContext;
use crate::models::{Rule, RuleFunctionResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run every `then` action of `rule` over the nodes located by `given`
pub(crate) fn run_actions(
    run: &RunContext,
    rule: &Arc<Rule>,
    given: &str,
    view: View,
    nodes: &[NodeId],
    cancellation: &CancellationToken,
) -> Vec<RuleFunctionResult> {
    let document = run.locator.document();
    let mut results = Vec::new();

    for action in &rule.then {
        if cancellation.is_cancelled() {
            return Vec::new();
        }
        let Some(function) = run.registry.get(&action.function) else {
            tracing::warn!(rule = %rule.id, "Function '{}' is not registered", action.function);
            continue;
        };

        let schema = function.schema();
        if let Err(problem) = schema.validate(action) {
            let error = LintError::FunctionContextSchema {
                function: action.function.clone(),
                message: problem,
            };
            tracing::debug!(rule = %rule.id, "{}", error);
            let mut result = RuleFunctionResult::new(rule, schema.error_message.clone(), given);
            if let Some(anchor) = nodes.first().copied().or_else(|| document.root(view)) {
                result = result.with_node(document, anchor);
                result.path = given.to_string();
            }
            results.push(result);
            continue;
        }

        let ctx = RuleFunctionContext {
            rule,
            action,
            given,
            options: &action.function_options,
            document,
            view,
            index: &run.index,
            doctor: &run.doctor,
            spec_info: &run.spec_info,
            pattern: rule.precompiled_pattern.as_ref(),
            base: run.base.as_deref(),
            http_client: run.http_client.as_ref(),
            cancellation,
        };

        tracing::debug!(
            rule = %rule.id,
            function = %action.function,
            nodes = nodes.len(),
            "Dispatching"
        );
        let property = ctx.field_name().to_string();
        for mut result in function.run(nodes, &ctx) {
            result.stamp(rule);
            if let Some(template) = &rule.message {
                result.message = render_message(template, rule, &result, &property);
            }
            results.push(result);
        }
    }
    results
}

/// Substitute `{{error}}`, `{{description}}`, `{{path}}` and `{{property}}`
pub(crate) fn render_message(
    template: &str,
    rule: &Rule,
    result: &RuleFunctionResult,
    property: &str,
) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    let property = if property.is_empty() {
        last_segment(&result.path)
    } else {
        property
    };
    template
        .replace("{{error}}", &result.message)
        .replace("{{description}}", rule.display_text())
        .replace("{{path}}", &result.path)
        .replace("{{property}}", property)
}

/// Final key or index of a canonical path
fn last_segment(path: &str) -> &str {
    if let Some(stripped) = path.strip_suffix("']")
        && let Some(start) = stripped.rfind("['")
    {
        return &stripped[start + 2..];
    }
    if let Some(stripped) = path.strip_suffix(']')
        && let Some(start) = stripped.rfind('[')
    {
        return &stripped[start + 1..];
    }
    path.rsplit('.').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("$.info.contact"), "contact");
        assert_eq!(last_segment("$.components.schemas['Pet']"), "Pet");
        assert_eq!(last_segment("$.tags[2]"), "2");
        assert_eq!(last_segment("$"), "$");
    }

    #[test]
    fn test_render_message() {
        let rule = Rule::new("info-contact").with_description("Info must have contact");
        let mut result =
            RuleFunctionResult::new(&Arc::new(rule.clone()), "`contact` is missing", "$.info");
        result.message = "`contact` is missing".to_string();

        assert_eq!(
            render_message("{{description}}: {{error}} at {{path}}", &rule, &result, ""),
            "Info must have contact: `contact` is missing at $.info"
        );
        assert_eq!(
            render_message("{{property}} wrong", &rule, &result, "contact"),
            "contact wrong"
        );
        assert_eq!(render_message("{{property}} wrong", &rule, &result, ""), "info wrong");
        assert_eq!(render_message("plain", &rule, &result, ""), "plain");
    }
}
