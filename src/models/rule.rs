use indexmap::IndexMap;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// How loudly a rule reports.
///
/// Ordered so that `Error` is the greatest; `Off` only ever appears on
/// rule definitions, never on results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Off,
    Hint,
    Info,
    #[default]
    Warn,
    Error,
}

impl Severity {
    /// Parse a ruleset alias (`warning`, `information`, `true`, ...)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warn" | "warning" | "true" => Some(Severity::Warn),
            "info" | "information" => Some(Severity::Info),
            "hint" => Some(Severity::Hint),
            "off" | "false" => Some(Severity::Off),
            _ => None,
        }
    }

    /// Numeric levels used by spectral-style rulesets
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            -1 => Some(Severity::Off),
            0 => Some(Severity::Error),
            1 => Some(Severity::Warn),
            2 => Some(Severity::Info),
            3 => Some(Severity::Hint),
            _ => None,
        }
    }

    pub fn is_off(&self) -> bool {
        *self == Severity::Off
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Off => "off",
            Severity::Hint => "hint",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Level(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Severity::Warn),
            Raw::Flag(false) => Ok(Severity::Off),
            Raw::Level(level) => {
                Severity::from_level(level).ok_or_else(|| {
                    D::Error::custom(format!("unknown severity level {}", level))
                })
            }
            Raw::Text(text) => {
                Severity::parse(&text)
                    .ok_or_else(|| D::Error::custom(format!("unknown severity '{}'", text)))
            }
        }
    }
}

/// Grouping used for filtering and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RuleCategory {
    #[default]
    Validation,
    Security,
    Schemas,
    Operations,
    Information,
    Descriptions,
    Tags,
    Examples,
    Owasp,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 9] = [
        RuleCategory::Validation,
        RuleCategory::Security,
        RuleCategory::Schemas,
        RuleCategory::Operations,
        RuleCategory::Information,
        RuleCategory::Descriptions,
        RuleCategory::Tags,
        RuleCategory::Examples,
        RuleCategory::Owasp,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            RuleCategory::Validation => "validation",
            RuleCategory::Security => "security",
            RuleCategory::Schemas => "schemas",
            RuleCategory::Operations => "operations",
            RuleCategory::Information => "information",
            RuleCategory::Descriptions => "descriptions",
            RuleCategory::Tags => "tags",
            RuleCategory::Examples => "examples",
            RuleCategory::Owasp => "owasp",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuleCategory::Validation => "Validation",
            RuleCategory::Security => "Security",
            RuleCategory::Schemas => "Schemas",
            RuleCategory::Operations => "Operations",
            RuleCategory::Information => "Contact Information",
            RuleCategory::Descriptions => "Descriptions",
            RuleCategory::Tags => "Tags",
            RuleCategory::Examples => "Examples",
            RuleCategory::Owasp => "OWASP",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for RuleCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for RuleCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Keyed {
            id: String,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(String),
            Keyed(Keyed),
        }

        let id = match Raw::deserialize(deserializer)? {
            Raw::Id(id) => id,
            Raw::Keyed(keyed) => keyed.id,
        };
        RuleCategory::from_id(&id)
            .ok_or_else(|| D::Error::custom(format!("unknown category '{}'", id)))
    }
}

/// One `then` clause of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuleAction {
    /// Key (or dotted path, or `@key`) to descend into on each located node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Name of the rule function to dispatch to
    pub function: String,

    /// Options handed to the function
    #[serde(default, rename = "functionOptions", skip_serializing_if = "Map::is_empty")]
    pub function_options: Map<String, Value>,
}

impl RuleAction {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        if let Value::Object(map) = options {
            self.function_options = map;
        }
        self
    }
}

fn default_true() -> bool {
    true
}

fn one_or_many<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

/// A declarative lint rule
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique id within a ruleset (filled from the map key)
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Result message; may carry `{{error}}`-style placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Locator expressions
    #[serde(default, deserialize_with = "one_or_many")]
    pub given: Vec<String>,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub category: RuleCategory,

    #[serde(default)]
    pub recommended: bool,

    /// Spec formats this rule applies to; empty means all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,

    /// Run against the `$ref`-resolved view
    #[serde(default = "default_true")]
    pub resolved: bool,

    /// `validation` or `style`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub then: Vec<RuleAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_fix: Option<String>,

    /// Compiled form of the rule's `pattern` hint
    #[serde(skip)]
    pub precompiled_pattern: Option<Regex>,
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.description == other.description
            && self.message == other.message
            && self.given == other.given
            && self.severity == other.severity
            && self.category == other.category
            && self.recommended == other.recommended
            && self.formats == other.formats
            && self.resolved == other.resolved
            && self.rule_type == other.rule_type
            && self.then == other.then
            && self.how_to_fix == other.how_to_fix
            && self.precompiled_pattern.as_ref().map(Regex::as_str)
                == other.precompiled_pattern.as_ref().map(Regex::as_str)
    }
}

impl Rule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resolved: true,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_given(mut self, given: impl Into<String>) -> Self {
        self.given.push(given.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_recommended(mut self, recommended: bool) -> Self {
        self.recommended = recommended;
        self
    }

    pub fn with_formats(mut self, formats: &[&str]) -> Self {
        self.formats = formats.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_resolved(mut self, resolved: bool) -> Self {
        self.resolved = resolved;
        self
    }

    pub fn with_type(mut self, rule_type: impl Into<String>) -> Self {
        self.rule_type = Some(rule_type.into());
        self
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.then.push(action);
        self
    }

    pub fn with_how_to_fix(mut self, how_to_fix: impl Into<String>) -> Self {
        self.how_to_fix = Some(how_to_fix.into());
        self
    }

    /// The `match` option of the first `pattern` action, if any
    pub fn pattern_hint(&self) -> Option<&str> {
        self.then
            .iter()
            .find(|a| a.function == "pattern")
            .and_then(|a| a.function_options.get("match"))
            .and_then(Value::as_str)
    }

    /// Human-readable fallback when `description` is empty
    pub fn display_text(&self) -> &str {
        if self.description.is_empty() {
            &self.id
        } else {
            &self.description
        }
    }
}

/// An entry under a ruleset's `rules` key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleDefinition {
    Enabled(bool),
    Severity(Severity),
    Rule(Box<Rule>),
}

/// Preset applied to a base ruleset in `extends`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Recommended,
    All,
    Off,
}

impl Selector {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "recommended" => Some(Selector::Recommended),
            "all" => Some(Selector::All),
            "off" => Some(Selector::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtendsEntry {
    Source(String),
    WithSelector(Vec<String>),
}

/// `extends`: a single source, or a list of sources and `[source, selector]` pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extends {
    Single(String),
    Many(Vec<ExtendsEntry>),
}

impl Extends {
    /// Normalised `(source, selector)` pairs in declaration order
    pub fn entries(&self) -> Vec<(String, Option<Selector>)> {
        match self {
            Extends::Single(source) => vec![(source.clone(), None)],
            Extends::Many(entries) => {
                // `[source, selector]` written without the outer list
                if let [ExtendsEntry::Source(source), ExtendsEntry::Source(selector)] =
                    entries.as_slice()
                    && let Some(selector) = Selector::parse(selector)
                {
                    return vec![(source.clone(), Some(selector))];
                }
                entries
                    .iter()
                    .filter_map(|entry| match entry {
                        ExtendsEntry::Source(source) => Some((source.clone(), None)),
                        ExtendsEntry::WithSelector(pair) => {
                            let source = pair.first()?.clone();
                            let selector = pair.get(1).and_then(|s| Selector::parse(s));
                            Some((source, selector))
                        }
                    })
                    .collect()
            }
        }
    }
}

/// A ruleset as written, plus its materialised rules after composition
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default formats for contained rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<Extends>,

    /// Raw user-supplied definitions and overrides
    #[serde(default, rename = "rules")]
    pub rule_definitions: IndexMap<String, RuleDefinition>,

    /// Ready-to-run rules, filled in by composition
    #[serde(skip)]
    pub rules: IndexMap<String, Arc<Rule>>,
}

impl RuleSet {
    pub fn from_rules(
        description: impl Into<String>,
        rules: impl IntoIterator<Item = Rule>,
    ) -> Self {
        Self {
            description: Some(description.into()),
            rules: rules.into_iter().map(|r| (r.id.clone(), Arc::new(r))).collect(),
            ..Default::default()
        }
    }

    pub fn rule(&self, id: &str) -> Option<&Arc<Rule>> {
        self.rules.get(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
