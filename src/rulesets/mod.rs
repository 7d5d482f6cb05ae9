//! Ruleset composition: built-in presets, `extends` chains and overrides.

pub mod catalogue;
mod composer;
mod extends;
mod loader;

pub use composer::RuleSetComposer;
pub use extends::{ExtendsGraph, ExtendsSource, Preset};
pub use loader::{load_ruleset, parse_ruleset};

use crate::functions::core::compile_pattern;
use crate::models::Rule;

/// Cache the compiled form of a rule's `pattern` hint on the rule
pub(crate) fn precompile(rule: &mut Rule) {
    let Some(compiled) = rule.pattern_hint().map(compile_pattern) else {
        return;
    };
    match compiled {
        Ok(regex) => rule.precompiled_pattern = Some(regex),
        Err(e) => tracing::warn!(rule = %rule.id, "Pattern hint not compiled: {}", e),
    }
}
