use crate::document::{NodeId, View};
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::{RuleCategory, RuleFunctionResult};

/// The root `servers` list exists and every entry has a usable URL
pub struct Servers;

impl RuleFunction for Servers {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("oasAPIServers")
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Information
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let document = ctx.document;
        let Some(root) = document.root(View::Unresolved) else {
            return Vec::new();
        };

        let servers = match document.get(root, "servers") {
            Some(servers) if document.len_of(servers) > 0 => servers,
            Some(servers) => {
                return vec![ctx.result_at(
                    format!("{}: the `servers` list is empty", ctx.description()),
                    servers,
                    "$.servers",
                )];
            }
            None => {
                return vec![ctx.result_at(
                    format!("{}: no servers are defined for the specification", ctx.description()),
                    root,
                    "$",
                )];
            }
        };

        let mut results = Vec::new();
        for (i, server) in document.items(servers).iter().enumerate() {
            let path = format!("$.servers[{}]", i);
            match document.get_str(*server, "url").map(str::trim) {
                None | Some("") => results.push(ctx.result_at(
                    format!("{}: server definition is missing a `url`", ctx.description()),
                    *server,
                    path,
                )),
                Some(url) if url.ends_with('/') && url != "/" => results.push(ctx.result_at(
                    format!("{}: server URL `{}` must not have a trailing slash", ctx.description(), url),
                    *server,
                    format!("{}.url", path),
                )),
                Some(url) if url.contains("example.com") => results.push(ctx.result_at(
                    format!("{}: server URL `{}` points at example.com", ctx.description(), url),
                    *server,
                    format!("{}.url", path),
                )),
                Some(_) => {}
            }
        }
        results
    }
}
