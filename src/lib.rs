pub mod cli;
pub mod commands;
pub mod document;
pub mod error;
pub mod functions;
pub mod models;
pub mod motor;
pub mod openapi;
pub mod rulesets;
pub mod telemetry;

pub use error::{LintError, Result};
pub use motor::{RuleSetExecution, RuleSetExecutionResult, apply_rules};
pub use rulesets::RuleSetComposer;
