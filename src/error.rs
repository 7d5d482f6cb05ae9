use thiserror::Error;

#[derive(Error, Debug)]
pub enum LintError {
    #[error("Failed to parse ruleset: {0}")]
    RulesetParse(String),

    #[error("Ruleset contains no rules and extends nothing")]
    EmptyRuleset,

    #[error("Rule '{rule}' references unknown function '{function}'")]
    UnknownFunction { rule: String, function: String },

    #[error("Failed to fetch remote ruleset {location}: {cause}")]
    RemoteFetch { location: String, cause: String },

    #[error("Failed to read local ruleset {location}: {cause}")]
    LocalRead { location: String, cause: String },

    #[error("Circular extends detected: {chain}")]
    CircularExtends { chain: String },

    #[error("Failed to parse document: {0}")]
    DocumentParse(String),

    #[error("Rule '{rule}' exceeded its timeout")]
    RuleTimeout { rule: String },

    #[error("Failed to evaluate locator '{expression}': {message}")]
    Locator { expression: String, message: String },

    #[error("Function '{function}' rejected its options: {message}")]
    FunctionContextSchema { function: String, message: String },

    #[error("Unsupported specification version: {0}")]
    UnsupportedSpecVersion(String),

    #[error("Circular reference detected: {definition} at {path}")]
    CircularReference { definition: String, path: String },

    #[error("Cannot resolve reference {definition} at {path}")]
    UnresolvedReference { definition: String, path: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LintError>;
