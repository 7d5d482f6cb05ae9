//! Rule functions: the closed set of named validators rules dispatch to.

pub mod core;
pub mod openapi;
pub mod owasp;

use crate::document::{Document, NodeId, View};
use crate::models::{Rule, RuleAction, RuleCategory, RuleFunctionResult};
use crate::openapi::{DoctorDocument, SpecIndex, SpecInfo};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tokio_util::sync::CancellationToken;

/// Documented option of a rule function
#[derive(Debug, Clone, Serialize)]
pub struct RuleFunctionProperty {
    pub name: String,
    pub description: String,
}

/// What a function accepts, checked before it runs
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFunctionSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<RuleFunctionProperty>,
    pub error_message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_field: bool,
}

impl RuleFunctionSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            error_message: format!("'{}' function has invalid options supplied", name),
            ..Default::default()
        }
    }

    pub fn with_required(mut self, required: &[&str]) -> Self {
        self.required = required.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_min_properties(mut self, min: usize) -> Self {
        self.min_properties = Some(min);
        self
    }

    pub fn with_max_properties(mut self, max: usize) -> Self {
        self.max_properties = Some(max);
        self
    }

    pub fn with_property(mut self, name: &str, description: &str) -> Self {
        self.properties.push(RuleFunctionProperty {
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn with_requires_field(mut self) -> Self {
        self.requires_field = true;
        self
    }

    /// Check an action against this schema, describing the first problem found
    pub fn validate(&self, action: &RuleAction) -> Result<(), String> {
        let options = &action.function_options;
        for key in &self.required {
            if !options.contains_key(key) {
                return Err(format!("missing required option '{}'", key));
            }
        }
        if let Some(min) = self.min_properties
            && options.len() < min
        {
            return Err(format!("expected at least {} option(s), found {}", min, options.len()));
        }
        if let Some(max) = self.max_properties
            && options.len() > max
        {
            return Err(format!("expected at most {} option(s), found {}", max, options.len()));
        }
        if !self.properties.is_empty()
            && let Some(unknown) = options
                .keys()
                .find(|k| !self.properties.iter().any(|p| &p.name == *k))
        {
            return Err(format!("unknown option '{}'", unknown));
        }
        if self.requires_field && action.field.as_deref().is_none_or(str::is_empty) {
            return Err("a 'field' is required".to_string());
        }
        Ok(())
    }
}

/// Everything a function sees for one action of one rule
pub struct RuleFunctionContext<'a> {
    pub rule: &'a Arc<Rule>,
    pub action: &'a RuleAction,
    /// The locator that produced the nodes
    pub given: &'a str,
    pub options: &'a Map<String, Value>,
    pub document: &'a Document,
    pub view: View,
    pub index: &'a SpecIndex,
    pub doctor: &'a DoctorDocument,
    pub spec_info: &'a SpecInfo,
    /// Compiled `pattern` hint carried on the rule
    pub pattern: Option<&'a Regex>,
    pub base: Option<&'a str>,
    pub http_client: Option<&'a reqwest::Client>,
    pub cancellation: &'a CancellationToken,
}

/// What `field` points at on a located node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// No field: the node itself
    Node(NodeId),
    /// `@key`: the mapping's keys
    Keys(Vec<NodeId>),
    Value(NodeId),
    Missing,
}

impl<'a> RuleFunctionContext<'a> {
    /// A result anchored on `node`, using its canonical path
    pub fn result(&self, message: impl Into<String>, node: NodeId) -> RuleFunctionResult {
        RuleFunctionResult::new(self.rule, message, self.document.path_of(node))
            .with_node(self.document, node)
    }

    pub fn result_at(
        &self,
        message: impl Into<String>,
        node: NodeId,
        path: impl Into<String>,
    ) -> RuleFunctionResult {
        let mut result = self.result(message, node);
        result.path = path.into();
        result
    }

    pub fn description(&self) -> &str {
        self.rule.display_text()
    }

    pub fn field(&self) -> Option<&str> {
        self.action.field.as_deref().filter(|f| !f.is_empty())
    }

    /// Field name for messages: the last dotted segment
    pub fn field_name(&self) -> &str {
        self.field().map(|f| f.rsplit('.').next().unwrap_or(f)).unwrap_or("")
    }

    pub fn resolve_field(&self, node: NodeId) -> FieldTarget {
        resolve_field(self.document, node, self.field())
    }

    /// Parse the options into a typed struct; `None` when they do not fit
    pub fn options<T: DeserializeOwned>(&self) -> Option<T> {
        match serde_json::from_value(Value::Object(self.options.clone())) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(
                    rule = %self.rule.id,
                    function = %self.action.function,
                    "Options rejected: {}",
                    e
                );
                None
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Descend into `field` on `node` (`@key`, plain key or dotted path)
pub fn resolve_field(document: &Document, node: NodeId, field: Option<&str>) -> FieldTarget {
    let Some(field) = field else {
        return FieldTarget::Node(node);
    };
    if field == "@key" {
        return FieldTarget::Keys(document.lint_entries(node).map(|(k, _)| k).collect());
    }
    let found = document.get(node, field).or_else(|| {
        if field.contains('.') {
            document.get_dotted(node, field)
        } else {
            None
        }
    });
    match found {
        Some(value) => FieldTarget::Value(value),
        None => FieldTarget::Missing,
    }
}

/// Numbers that may arrive as strings in hand-written rulesets
pub fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(t)) => t.trim().parse().ok(),
        None => None,
    })
}

/// Booleans that may arrive as strings
pub fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Flag(b)) => b,
        Some(Raw::Text(t)) => t.trim().eq_ignore_ascii_case("true"),
        None => false,
    })
}

/// A named validator
pub trait RuleFunction: Send + Sync {
    fn schema(&self) -> RuleFunctionSchema;

    fn category(&self) -> RuleCategory {
        RuleCategory::Validation
    }

    fn run(&self, nodes: &[NodeId], ctx: &RuleFunctionContext<'_>) -> Vec<RuleFunctionResult>;
}

pub type FunctionMap = HashMap<String, Arc<dyn RuleFunction>>;

fn builtin_functions() -> FunctionMap {
    let functions: Vec<Arc<dyn RuleFunction>> = vec![
        Arc::new(core::Alphabetical),
        Arc::new(core::Blank),
        Arc::new(core::Casing),
        Arc::new(core::Defined),
        Arc::new(core::Enumeration),
        Arc::new(core::Falsy),
        Arc::new(core::Length),
        Arc::new(core::Pattern),
        Arc::new(core::Schema),
        Arc::new(core::Truthy),
        Arc::new(core::Undefined),
        Arc::new(core::Xor),
        Arc::new(openapi::AmbiguousPaths),
        Arc::new(openapi::ComponentDescriptions),
        Arc::new(openapi::DescriptionDuplication),
        Arc::new(openapi::Discriminator),
        Arc::new(openapi::DuplicatedEnum),
        Arc::new(openapi::OpErrorResponse),
        Arc::new(openapi::OpIdUnique),
        Arc::new(openapi::OpParams),
        Arc::new(openapi::OpSecurityDefined),
        Arc::new(openapi::OpSuccessResponse),
        Arc::new(openapi::PathParam),
        Arc::new(openapi::RefSiblings),
        Arc::new(openapi::Servers),
        Arc::new(openapi::TagDefined),
        Arc::new(openapi::TypedEnum),
        Arc::new(openapi::UnusedComponent),
        Arc::new(owasp::AdditionalPropertiesConstrained),
        Arc::new(owasp::ArrayLimit),
        Arc::new(owasp::AuthInsecureSchemes),
        Arc::new(owasp::CheckErrorResponse),
        Arc::new(owasp::CheckSecurity),
        Arc::new(owasp::DefineErrorDefinition),
        Arc::new(owasp::HeaderDefinition),
        Arc::new(owasp::HostsHttps),
        Arc::new(owasp::IntegerFormat),
        Arc::new(owasp::IntegerLimit),
        Arc::new(owasp::JwtBestPractice),
        Arc::new(owasp::NoAdditionalProperties),
        Arc::new(owasp::NoApiKeyInUrl),
        Arc::new(owasp::NoBasicAuth),
        Arc::new(owasp::NoCredentialsInUrl),
        Arc::new(owasp::NoNumericIds),
        Arc::new(owasp::RatelimitRetryAfter),
        Arc::new(owasp::StringLimit),
        Arc::new(owasp::StringRestricted),
    ];
    functions.into_iter().map(|f| (f.schema().name, f)).collect()
}

static BUILTIN: LazyLock<FunctionMap> = LazyLock::new(builtin_functions);

/// Name-keyed lookup over built-in and caller-supplied functions
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    custom: FunctionMap,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom(mut self, custom: FunctionMap) -> Self {
        self.custom.extend(custom);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn RuleFunction>) {
        self.custom.insert(name.into(), function);
    }

    /// Custom functions shadow built-ins of the same name
    pub fn get(&self, name: &str) -> Option<Arc<dyn RuleFunction>> {
        self.custom.get(name).or_else(|| BUILTIN.get(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name) || BUILTIN.contains_key(name)
    }

    pub fn builtin_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = BUILTIN.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixture for function tests.

    use super::*;
    use crate::document::resolver::{ResolveOptions, build_resolved_view};

    pub struct Fixture {
        pub document: Document,
        pub index: SpecIndex,
        pub doctor: DoctorDocument,
        pub info: SpecInfo,
        pub token: CancellationToken,
    }

    impl Fixture {
        pub fn new(source: &str) -> Self {
            let mut document = Document::parse(source.as_bytes(), "spec.yaml").unwrap();
            let report = build_resolved_view(&mut document, &ResolveOptions::default());
            let info = SpecInfo::detect(&document, source.as_bytes());
            let index = SpecIndex::build(&document, &report, false);
            let doctor = DoctorDocument::build(&document, &index, info.format);
            Self {
                document,
                index,
                doctor,
                info,
                token: CancellationToken::new(),
            }
        }

        pub fn locate(&self, expression: &str) -> Vec<NodeId> {
            locate_nodes(&self.document, expression)
        }

        /// Run `function` over the nodes matched by `given`
        pub fn run(
            &self,
            function: &dyn RuleFunction,
            given: &str,
            action: RuleAction,
        ) -> Vec<RuleFunctionResult> {
            let rule = Arc::new(
                Rule::new("test-rule")
                    .with_description("test rule")
                    .with_given(given)
                    .with_action(action.clone()),
            );
            self.run_rule(function, &rule, &action)
        }

        pub fn run_rule(
            &self,
            function: &dyn RuleFunction,
            rule: &Arc<Rule>,
            action: &RuleAction,
        ) -> Vec<RuleFunctionResult> {
            let given = rule.given.first().map(String::as_str).unwrap_or("$");
            let nodes = locate_nodes(&self.document, given);
            let ctx = RuleFunctionContext {
                rule,
                action,
                given,
                options: &action.function_options,
                document: &self.document,
                view: View::Unresolved,
                index: &self.index,
                doctor: &self.doctor,
                spec_info: &self.info,
                pattern: rule.precompiled_pattern.as_ref(),
                base: None,
                http_client: None,
                cancellation: &self.token,
            };
            function.run(&nodes, &ctx)
        }
    }

    /// Evaluate a locator without an owning `Locator`
    pub fn locate_nodes(document: &Document, expression: &str) -> Vec<NodeId> {
        use crate::document::PathSegment;
        use serde_json_path::{JsonPath, PathElement};

        let Some(root) = document.root(View::Unresolved) else {
            return Vec::new();
        };
        if expression.trim() == "$" {
            return vec![root];
        }
        let path = JsonPath::parse(expression).unwrap();
        path.query_located(document.json(View::Unresolved))
            .locations()
            .filter_map(|location| {
                let segments: Vec<PathSegment> = location
                    .iter()
                    .map(|element| match element {
                        PathElement::Name(name) => PathSegment::Key(name.to_string()),
                        PathElement::Index(index) => PathSegment::Index(*index),
                    })
                    .collect();
                document.descend(root, &segments)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_validation() {
        let schema = RuleFunctionSchema::new("length")
            .with_min_properties(1)
            .with_max_properties(2)
            .with_property("min", "minimum")
            .with_property("max", "maximum");

        let ok = RuleAction::new("length").with_options(serde_json::json!({"min": 1}));
        assert!(schema.validate(&ok).is_ok());

        let empty = RuleAction::new("length");
        assert!(schema.validate(&empty).is_err());

        let unknown = RuleAction::new("length").with_options(serde_json::json!({"minimum": 1}));
        assert!(schema.validate(&unknown).is_err());

        let required = RuleFunctionSchema::new("xor").with_required(&["properties"]);
        assert!(required.validate(&RuleAction::new("xor")).is_err());

        let field = RuleFunctionSchema::new("truthy").with_requires_field();
        assert!(field.validate(&RuleAction::new("truthy")).is_err());
        assert!(field.validate(&RuleAction::new("truthy").with_field("x")).is_ok());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = FunctionRegistry::new();
        assert!(registry.contains("truthy"));
        assert!(registry.contains("owaspIntegerLimit"));
        assert!(registry.contains("oasOpSuccessResponse"));
        assert!(!registry.contains("nope"));

        let mut custom = FunctionMap::new();
        custom.insert("truthy".to_string(), Arc::new(core::Falsy) as Arc<dyn RuleFunction>);
        let registry = registry.with_custom(custom);
        assert_eq!(registry.get("truthy").unwrap().schema().name, "falsy");
    }

    #[test]
    fn test_builtin_names_are_unique_and_sorted() {
        let names = FunctionRegistry::builtin_names();
        assert_eq!(names.len(), 47);
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_resolve_field() {
        let doc = Document::parse(b"info:\n  contact:\n    name: n\n", "spec.yaml").unwrap();
        let root = doc.root(View::Unresolved).unwrap();
        assert!(matches!(
            resolve_field(&doc, root, Some("info.contact.name")),
            FieldTarget::Value(_)
        ));
        assert_eq!(resolve_field(&doc, root, Some("missing")), FieldTarget::Missing);
        assert!(matches!(
            resolve_field(&doc, root, Some("@key")),
            FieldTarget::Keys(keys) if keys.len() == 1
        ));
        assert_eq!(resolve_field(&doc, root, None), FieldTarget::Node(root));
    }
}
