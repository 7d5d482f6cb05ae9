use crate::document::NodeId;
use crate::functions::{RuleFunction, RuleFunctionContext, RuleFunctionSchema};
use crate::models::RuleFunctionResult;

/// Does nothing. Marks rules whose results come from elsewhere.
pub struct Blank;

impl RuleFunction for Blank {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("blank")
    }

    fn run(&self, _nodes: &[NodeId], _ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        Vec::new()
    }
}
