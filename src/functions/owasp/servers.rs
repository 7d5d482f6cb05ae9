use crate::document::{NodeId, View};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};

/// Servers are only reachable over TLS
pub struct HostsHttps;

impl RuleFunction for HostsHttps {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("owaspHostsHttps")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Owasp
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let mut results: Vec<RuleFunctionResult> = ctx
            .doctor
            .servers
            .iter()
            .filter(|s| !s.url.to_ascii_lowercase().starts_with("https"))
            .map(|s| {
                let anchor = document.get(s.node, "url").unwrap_or(s.node);
                ctx.result_at(
                    format!("{}: server URL `{}` must use `https`", ctx.description(), s.url),
                    anchor,
                    format!("{}.url", s.json_path),
                )
            })
            .collect();

        // swagger 2 lists transports instead of URLs
        if let Some(schemes) = document
            .root(View::Unresolved)
            .and_then(|root| document.get(root, "schemes"))
        {
            for scheme in document.items(schemes) {
                let value = document.value(*scheme);
                if !value.eq_ignore_ascii_case("https") && !value.eq_ignore_ascii_case("wss") {
                    results.push(ctx.result(
                        format!("{}: scheme `{}` must be `https`", ctx.description(), value),
                        *scheme,
                    ));
                }
            }
        }
        results
    }
}
