pub mod ignore;
pub mod result;
pub mod rule;

pub use ignore::IgnoreList;
pub use result::{Origin, RuleFunctionResult, RuleFunctionResultSet, SeverityCounts};
pub use rule::{
    Extends, ExtendsEntry, Rule, RuleAction, RuleCategory, RuleDefinition, RuleSet, Selector,
    Severity,
};
