pub mod lint;
pub mod rules;

pub use lint::{LintOptions, execute_lint};
pub use rules::execute_rules;
