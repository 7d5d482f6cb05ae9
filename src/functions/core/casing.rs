use crate::document::NodeId;
use crate::functions::{
    FieldTarget, RuleFunction, RuleFunctionContext, RuleFunctionSchema, lenient_bool,
};
use crate::models::RuleFunctionResult;
use dashmap::DashMap;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Values (or keys, with `@key`) must follow a naming convention
pub struct Casing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CasingType {
    Flat,
    Camel,
    Pascal,
    PascalKebab,
    Kebab,
    Cobol,
    Snake,
    Macro,
}

impl CasingType {
    pub fn name(&self) -> &'static str {
        match self {
            CasingType::Flat => "flat",
            CasingType::Camel => "camel",
            CasingType::Pascal => "pascal",
            CasingType::PascalKebab => "pascal-kebab",
            CasingType::Kebab => "kebab",
            CasingType::Cobol => "cobol",
            CasingType::Snake => "snake",
            CasingType::Macro => "macro",
        }
    }

    /// Unanchored pattern for one word group
    fn inner(&self, digits: bool) -> String {
        let d = if digits { "0-9" } else { "" };
        match self {
            CasingType::Flat => format!("[a-z][a-z{d}]*"),
            CasingType::Camel => format!("[a-z][a-z{d}]*(?:[A-Z{d}](?:[a-z{d}]+|$))*"),
            CasingType::Pascal => format!("[A-Z][a-z{d}]*(?:[A-Z{d}](?:[a-z{d}]+|$))*"),
            CasingType::PascalKebab => format!("[A-Z][a-z{d}]*(?:-[A-Z][a-z{d}]*)*"),
            CasingType::Kebab => format!("[a-z][a-z{d}]*(?:-[a-z{d}]+)*"),
            CasingType::Cobol => format!("[A-Z][A-Z{d}]*(?:-[A-Z{d}]+)*"),
            CasingType::Snake => format!("[a-z][a-z{d}]*(?:_[a-z{d}]+)*"),
            CasingType::Macro => format!("[A-Z][A-Z{d}]*(?:_[A-Z{d}]+)*"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Separator {
    #[serde(default)]
    char: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    allow_leading: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CasingOptions {
    #[serde(rename = "type")]
    casing: CasingType,
    #[serde(default, deserialize_with = "lenient_bool")]
    disallow_digits: bool,
    #[serde(default)]
    separator: Option<Separator>,
}

static PATTERNS: LazyLock<DashMap<String, Regex>> = LazyLock::new(DashMap::new);

impl CasingOptions {
    fn pattern(&self) -> Option<Regex> {
        let inner = self.casing.inner(!self.disallow_digits);
        let source = match &self.separator {
            Some(separator) if !separator.char.is_empty() => {
                let sep = regex::escape(&separator.char);
                let leading = if separator.allow_leading {
                    format!("(?:{})?", sep)
                } else {
                    String::new()
                };
                format!("^{leading}(?:{inner})(?:{sep}(?:{inner}))*$")
            }
            _ => format!("^(?:{inner})$"),
        };

        if let Some(hit) = PATTERNS.get(&source) {
            return Some(hit.value().clone());
        }
        let compiled = Regex::new(&source).ok()?;
        PATTERNS.insert(source, compiled.clone());
        Some(compiled)
    }
}

impl RuleFunction for Casing {
    fn schema(&self) -> RuleFunctionSchema {
        RuleFunctionSchema::new("casing")
            .with_required(&["type"])
            .with_min_properties(1)
            .with_max_properties(3)
            .with_property("type", "flat, camel, pascal, pascal-kebab, kebab, cobol, snake or macro")
            .with_property("disallowDigits", "Reject digits anywhere in the value")
            .with_property("separator", "Object with 'char' and 'allowLeading'")
            .with_error_message(
                "'casing' function has invalid options supplied. Set 'type' to one of flat, camel, pascal, pascal-kebab, kebab, cobol, snake or macro",
            )
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult> {
        let Some(options) = ctx.options::<CasingOptions>() else {
            return Vec::new();
        };
        let Some(pattern) = options.pattern() else {
            return Vec::new();
        };
        let document = ctx.document;

        let mut targets = Vec::new();
        for node in nodes {
            match ctx.resolve_field(*node) {
                FieldTarget::Node(n) | FieldTarget::Value(n) => targets.push(n),
                FieldTarget::Keys(keys) => targets.extend(keys),
                FieldTarget::Missing => {}
            }
        }

        targets
            .into_iter()
            .filter(|n| document.is_scalar(*n) && !document.value(*n).is_empty())
            .filter(|n| !pattern.is_match(document.value(*n)))
            .map(|n| {
                ctx.result(
                    format!(
                        "{}: `{}` is not {} case",
                        ctx.description(),
                        document.value(n),
                        options.casing.name()
                    ),
                    n,
                )
            })
            .collect()
    }
}
