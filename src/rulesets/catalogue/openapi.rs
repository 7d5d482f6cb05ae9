use super::OPERATIONS;
use crate::models::{Rule, RuleAction, RuleCategory, Severity};
use serde_json::json;

const PARAMETERS: [&str; 3] = [
    "$.paths[*].parameters[*]",
    "$.paths[*]['get','put','post','delete','options','head','patch','trace'].parameters[*]",
    "$.components.parameters[*]",
];

fn info_rules() -> Vec<Rule> {
    vec![
        Rule::new("info-contact")
            .with_description("Info section is missing contact details")
            .with_given("$.info")
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Information)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("contact"))
            .with_how_to_fix("Add a `contact` object with a name, URL and email address to `info`"),
        Rule::new("info-description")
            .with_description("Info section is missing a description")
            .with_given("$.info")
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Information)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("description"))
            .with_how_to_fix("Describe what the API does in `info.description`"),
        Rule::new("info-license")
            .with_description("Info section should contain a license")
            .with_given("$.info")
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Information)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("license"))
            .with_how_to_fix("Add a `license` object to `info`"),
        Rule::new("license-url")
            .with_description("License should contain a URL")
            .with_given("$.info.license")
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Information)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("url"))
            .with_how_to_fix("Link to the full license text with `info.license.url`"),
        Rule::new("contact-properties")
            .with_description("Contact details are incomplete")
            .with_given("$.info.contact")
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Information)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("name"))
            .with_action(RuleAction::new("truthy").with_field("url"))
            .with_action(RuleAction::new("truthy").with_field("email"))
            .with_how_to_fix("Fill in `name`, `url` and `email` on `info.contact`"),
    ]
}

fn tag_rules() -> Vec<Rule> {
    vec![
        Rule::new("openapi-tags")
            .with_description("Top level spec `tags` must not be empty")
            .with_given("$")
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Tags)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("tags"))
            .with_how_to_fix("Add a global `tags` list describing how operations are grouped"),
        Rule::new("openapi-tags-alphabetical")
            .with_description("Tags must be in alphabetical order")
            .with_given("$")
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Tags)
            .with_recommended(true)
            .with_type("style")
            .with_action(
                RuleAction::new("alphabetical")
                    .with_field("tags")
                    .with_options(json!({"keyedBy": "name"})),
            )
            .with_how_to_fix("Sort the global `tags` list by `name`"),
        Rule::new("tag-description")
            .with_description("Tag must have a description")
            .with_given("$.tags[*]")
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Tags)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("description"))
            .with_how_to_fix("Explain what each tag groups in its `description`"),
        Rule::new("operation-tags")
            .with_description("Operation `tags` are missing or empty")
            .with_given(OPERATIONS)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Tags)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("truthy").with_field("tags"))
            .with_how_to_fix("Tag every operation so tooling can group it"),
        Rule::new("operation-tag-defined")
            .with_description("Operation tags must be defined in global tags")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Tags)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasTagDefined"))
            .with_how_to_fix("Add the tag to the global `tags` list, or fix its spelling"),
        Rule::new("operation-singular-tag")
            .with_description("Operations should be tagged only once")
            .with_given(OPERATIONS)
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Tags)
            .with_type("style")
            .with_action(
                RuleAction::new("length")
                    .with_field("tags")
                    .with_options(json!({"max": 1})),
            )
            .with_how_to_fix("Keep a single tag on each operation"),
    ]
}

fn operation_rules() -> Vec<Rule> {
    vec![
        Rule::new("operation-success-response")
            .with_description("Operation must have at least one `2xx` or a `3xx` response")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("oasOpSuccessResponse"))
            .with_how_to_fix("Document the response returned when the operation succeeds"),
        Rule::new("operation-4xx-response")
            .with_description("Operation must define at least one 4xx error response")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("oasOpErrorResponse"))
            .with_how_to_fix("Document how the operation reports client errors"),
        Rule::new("operation-operationId")
            .with_description("Operation must contain an `operationId`")
            .with_given(OPERATIONS)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("operationId"))
            .with_how_to_fix("Give each operation a unique `operationId`"),
        Rule::new("operation-operationId-unique")
            .with_description("Every operation must have unique `operationId`")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasOpIdUnique"))
            .with_how_to_fix("Rename one of the operations sharing the `operationId`"),
        Rule::new("operation-operationId-valid-in-url")
            .with_description("OperationId must use URL friendly characters")
            .with_given(OPERATIONS)
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("validation")
            .with_action(
                RuleAction::new("pattern")
                    .with_field("operationId")
                    .with_options(json!({"match": r"^[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=]*$"})),
            )
            .with_how_to_fix("Remove characters that would need escaping in a URL from the `operationId`"),
        Rule::new("operation-operationId-camel-case")
            .with_description("OperationId should be camelCase")
            .with_given(OPERATIONS)
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Operations)
            .with_type("style")
            .with_action(
                RuleAction::new("casing")
                    .with_field("operationId")
                    .with_options(json!({"type": "camel"})),
            )
            .with_how_to_fix("Rename the `operationId` using camelCase"),
        Rule::new("operation-description")
            .with_description("Operation description checks")
            .with_given(OPERATIONS)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Descriptions)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("description"))
            .with_how_to_fix("Describe what the operation does and when to use it"),
        Rule::new("operation-summary")
            .with_description("Operation must have a summary")
            .with_given(OPERATIONS)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Descriptions)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("summary"))
            .with_how_to_fix("Add a short `summary` to the operation"),
        Rule::new("description-duplication")
            .with_description("Summary should not repeat the description")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Descriptions)
            .with_type("style")
            .with_action(RuleAction::new("oasDescriptionDuplication"))
            .with_how_to_fix("Keep the summary short and put the detail in the description"),
        Rule::new("operation-parameters")
            .with_description("Operation parameters are unique and non-repeating")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasOpParams"))
            .with_how_to_fix("Remove the duplicated parameter, and use a single body parameter"),
        Rule::new("path-params")
            .with_description("Path parameters must be defined and valid")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasPathParam"))
            .with_how_to_fix("Declare every path variable as a required `in: path` parameter"),
        Rule::new("parameter-description")
            .with_description("Parameter description checks")
            .with_given(PARAMETERS[0])
            .with_given(PARAMETERS[1])
            .with_given(PARAMETERS[2])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Descriptions)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("description"))
            .with_how_to_fix("Describe what each parameter controls"),
        Rule::new("operation-security-defined")
            .with_description("`security` requirements must reference declared schemes")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Security)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasOpSecurityDefined"))
            .with_how_to_fix("Declare the scheme under `securitySchemes` (or `securityDefinitions`)"),
    ]
}

fn path_rules() -> Vec<Rule> {
    vec![
        Rule::new("path-keys-no-trailing-slash")
            .with_description("Path must not end with a slash")
            .with_given("$.paths")
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("style")
            .with_action(
                RuleAction::new("pattern")
                    .with_field("@key")
                    .with_options(json!({"notMatch": ".+/$"})),
            )
            .with_how_to_fix("Remove the trailing slash from the path"),
        Rule::new("path-not-include-query")
            .with_description("Path must not include query string")
            .with_given("$.paths")
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("validation")
            .with_action(
                RuleAction::new("pattern")
                    .with_field("@key")
                    .with_options(json!({"notMatch": r"\?"})),
            )
            .with_how_to_fix("Model query strings as `in: query` parameters"),
        Rule::new("path-declarations-must-exist")
            .with_description("Path parameter declarations must not be empty, ex. `/api/{}` is invalid")
            .with_given("$.paths")
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("validation")
            .with_action(
                RuleAction::new("pattern")
                    .with_field("@key")
                    .with_options(json!({"notMatch": r"\{\}"})),
            )
            .with_how_to_fix("Name every templated segment of the path"),
        Rule::new("no-ambiguous-paths")
            .with_description("Paths need to resolve unambiguously from one another")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Operations)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("ambiguousPaths"))
            .with_how_to_fix("Make each path distinguishable by at least one literal segment"),
        Rule::new("paths-kebab-case")
            .with_description("Path segments must only use kebab-case")
            .with_given("$.paths")
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Operations)
            .with_type("style")
            .with_action(
                RuleAction::new("pattern")
                    .with_field("@key")
                    .with_options(json!({"match": r"^(/|(/(\{[^/{}]+\}|[a-z0-9.\-]+))+/?)$"})),
            )
            .with_how_to_fix("Rename the path segments using lower-case words joined by hyphens"),
        Rule::new("no-http-verbs-in-path")
            .with_description("Paths should not contain HTTP verbs")
            .with_given("$.paths")
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Operations)
            .with_type("style")
            .with_action(
                RuleAction::new("pattern")
                    .with_field("@key")
                    .with_options(json!({"notMatch": "(?i)/(get|put|post|delete|patch)(/|$)"})),
            )
            .with_how_to_fix("Let the HTTP method carry the verb and name the resource in the path"),
    ]
}

fn schema_rules() -> Vec<Rule> {
    vec![
        Rule::new("typed-enum")
            .with_description("Enum values must respect the specified type")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Schemas)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("typedEnum"))
            .with_how_to_fix("Change the enum value, or the schema `type`, so they agree"),
        Rule::new("duplicated-entry-in-enum")
            .with_description("Enum values must not have duplicate entry")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Schemas)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("duplicatedEnum"))
            .with_how_to_fix("Remove the repeated enum value"),
        Rule::new("oas3-unused-component")
            .with_description("Check for unused components and bad references")
            .with_given("$")
            .with_resolved(false)
            .with_formats(&["oas3"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Schemas)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasUnusedComponent"))
            .with_how_to_fix("Reference the component somewhere, or remove it"),
        Rule::new("oas2-unused-definition")
            .with_description("Check for unused definitions and bad references")
            .with_given("$")
            .with_resolved(false)
            .with_formats(&["oas2"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Schemas)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasUnusedComponent"))
            .with_how_to_fix("Reference the definition somewhere, or remove it"),
        Rule::new("component-description")
            .with_description("Component description check")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Descriptions)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("oasComponentDescriptions"))
            .with_how_to_fix("Describe each reusable component"),
        Rule::new("oas-discriminator")
            .with_description("Discriminators must name a required, declared property")
            .with_given("$")
            .with_resolved(false)
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Schemas)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasDiscriminator"))
            .with_how_to_fix("Declare the discriminator property and list it under `required`"),
        Rule::new("no-$ref-siblings")
            .with_description("`$ref` values cannot be placed next to other properties (like a description)")
            .with_given("$")
            .with_resolved(false)
            .with_formats(&["oas2", "oas3_0"])
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Schemas)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("refSiblings"))
            .with_how_to_fix("Move the sibling keys into the referenced object, or wrap the `$ref` in `allOf`"),
        Rule::new("oas2-anyOf")
            .with_description("`anyOf` was introduced in OpenAPI 3.0, it cannot be used in swagger 2")
            .with_given("$..[?@.anyOf]")
            .with_formats(&["oas2"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Schemas)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("undefined").with_field("anyOf"))
            .with_how_to_fix("Upgrade to OpenAPI 3, or model the schema without `anyOf`"),
        Rule::new("oas2-oneOf")
            .with_description("`oneOf` was introduced in OpenAPI 3.0, it cannot be used in swagger 2")
            .with_given("$..[?@.oneOf]")
            .with_formats(&["oas2"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Schemas)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("undefined").with_field("oneOf"))
            .with_how_to_fix("Upgrade to OpenAPI 3, or model the schema without `oneOf`"),
        Rule::new("schema-names-pascal-case")
            .with_description("Schema names should be PascalCase")
            .with_given("$.components.schemas")
            .with_formats(&["oas3"])
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Schemas)
            .with_type("style")
            .with_action(
                RuleAction::new("casing")
                    .with_field("@key")
                    .with_options(json!({"type": "pascal"})),
            )
            .with_how_to_fix("Rename the schema using PascalCase"),
        Rule::new("oas3-examples-value-or-externalValue")
            .with_description("Examples must use either `value` or `externalValue`, not both")
            .with_given("$.components.examples[*]")
            .with_formats(&["oas3"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Examples)
            .with_recommended(true)
            .with_type("validation")
            .with_action(
                RuleAction::new("xor")
                    .with_options(json!({"properties": ["externalValue", "value"]})),
            )
            .with_how_to_fix("Keep exactly one of `value` and `externalValue`"),
    ]
}

fn server_rules() -> Vec<Rule> {
    vec![
        Rule::new("oas3-api-servers")
            .with_description("Check for valid API servers definition")
            .with_given("$")
            .with_resolved(false)
            .with_formats(&["oas3"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Validation)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("oasAPIServers"))
            .with_how_to_fix("List at least one real server URL, without a trailing slash"),
        Rule::new("oas2-api-host")
            .with_description("`host` should be defined")
            .with_given("$")
            .with_formats(&["oas2"])
            .with_severity(Severity::Info)
            .with_category(RuleCategory::Validation)
            .with_recommended(true)
            .with_type("style")
            .with_action(RuleAction::new("truthy").with_field("host"))
            .with_how_to_fix("Set `host` to where the API is served"),
        Rule::new("oas2-api-schemes")
            .with_description("`schemes` should be defined and not be empty")
            .with_given("$")
            .with_formats(&["oas2"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Validation)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("truthy").with_field("schemes"))
            .with_how_to_fix("List the transports the API is served over"),
        Rule::new("oas2-host-not-example")
            .with_description("Host URL should not point at example.com")
            .with_given("$")
            .with_formats(&["oas2"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Validation)
            .with_recommended(true)
            .with_type("style")
            .with_action(
                RuleAction::new("pattern")
                    .with_field("host")
                    .with_options(json!({"notMatch": r"example\.com"})),
            )
            .with_how_to_fix("Replace the placeholder host with the real one"),
        Rule::new("oas2-host-trailing-slash")
            .with_description("Host URL should not end with a slash")
            .with_given("$")
            .with_formats(&["oas2"])
            .with_severity(Severity::Warn)
            .with_category(RuleCategory::Validation)
            .with_recommended(true)
            .with_type("style")
            .with_action(
                RuleAction::new("pattern")
                    .with_field("host")
                    .with_options(json!({"notMatch": "/$"})),
            )
            .with_how_to_fix("Remove the trailing slash from `host`"),
    ]
}

fn markdown_rules() -> Vec<Rule> {
    vec![
        Rule::new("no-eval-in-markdown")
            .with_description("Markdown descriptions must not have `eval()` statements")
            .with_given("$..description")
            .with_given("$..title")
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Descriptions)
            .with_recommended(true)
            .with_type("validation")
            .with_action(RuleAction::new("pattern").with_options(json!({"notMatch": r"eval\("})))
            .with_how_to_fix("Remove the `eval()` statement from the text"),
        Rule::new("no-script-tags-in-markdown")
            .with_description("Markdown descriptions must not have `<script>` tags")
            .with_given("$..description")
            .with_given("$..title")
            .with_severity(Severity::Error)
            .with_category(RuleCategory::Descriptions)
            .with_recommended(true)
            .with_type("validation")
            .with_action(
                RuleAction::new("pattern").with_options(json!({"notMatch": "(?i)<script"})),
            )
            .with_how_to_fix("Remove the `<script>` tag from the text"),
    ]
}

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = info_rules();
    rules.extend(tag_rules());
    rules.extend(operation_rules());
    rules.extend(path_rules());
    rules.extend(schema_rules());
    rules.extend(server_rules());
    rules.extend(markdown_rules());
    rules
}
