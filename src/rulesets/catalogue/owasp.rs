use crate::models::{Rule, RuleAction, RuleCategory, Severity};
use serde_json::json;

/// An OWASP rule runs once per document over the doctor's typed view
fn owasp_rule(
    id: &str,
    description: &str,
    severity: Severity,
    action: RuleAction,
    how_to_fix: &str,
) -> Rule {
    Rule::new(id)
        .with_description(description)
        .with_given("$")
        .with_resolved(false)
        .with_severity(severity)
        .with_category(RuleCategory::Owasp)
        .with_type("validation")
        .with_action(action)
        .with_how_to_fix(how_to_fix)
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        owasp_rule(
            "owasp-protection-global-unsafe",
            "Check that write operations are protected",
            Severity::Error,
            RuleAction::new("owaspCheckSecurity").with_options(json!({
                "methods": ["post", "put", "patch", "delete"],
                "nullable": true
            })),
            "Add a `security` requirement to every operation that changes state",
        ),
        owasp_rule(
            "owasp-protection-global-unsafe-strict",
            "Check that write operations are protected, without optional authentication",
            Severity::Info,
            RuleAction::new("owaspCheckSecurity").with_options(json!({
                "methods": ["post", "put", "patch", "delete"],
                "nullable": false
            })),
            "Remove empty `{}` security requirements from operations that change state",
        ),
        owasp_rule(
            "owasp-protection-global-safe",
            "Check that read operations are protected",
            Severity::Info,
            RuleAction::new("owaspCheckSecurity")
                .with_options(json!({"methods": ["get", "head"], "nullable": true})),
            "Add a `security` requirement to read operations, or an explicit empty one for public data",
        ),
        owasp_rule(
            "owasp-define-error-responses-401",
            "OWASP API Security recommends defining a `401` response",
            Severity::Warn,
            RuleAction::new("owaspCheckErrorResponse").with_options(json!({"code": "401"})),
            "Document a `401` response with a schema for unauthenticated calls",
        ),
        owasp_rule(
            "owasp-define-error-responses-500",
            "OWASP API Security recommends defining a `500` response",
            Severity::Warn,
            RuleAction::new("owaspCheckErrorResponse").with_options(json!({"code": "500"})),
            "Document a `500` response with a schema for unexpected failures",
        ),
        owasp_rule(
            "owasp-define-error-responses-429",
            "OWASP API Security recommends defining a `429` response",
            Severity::Warn,
            RuleAction::new("owaspCheckErrorResponse").with_options(json!({"code": "429"})),
            "Document a `429` response with a schema for rate-limited calls",
        ),
        owasp_rule(
            "owasp-define-error-validation",
            "Missing error response for validation failures",
            Severity::Warn,
            RuleAction::new("owaspDefineErrorDefinition"),
            "Document a `400`, `422` or `4XX` response describing invalid input",
        ),
        owasp_rule(
            "owasp-rate-limit",
            "Responses should define rate-limit headers",
            Severity::Error,
            RuleAction::new("owaspHeaderDefinition").with_options(json!({
                "headers": [
                    ["X-RateLimit-Limit", "X-RateLimit-Remaining"],
                    ["X-Rate-Limit-Limit", "X-Rate-Limit-Remaining"],
                    ["RateLimit"],
                    ["RateLimit-Limit", "RateLimit-Reset"]
                ]
            })),
            "Return rate-limit headers so clients can pace themselves",
        ),
        owasp_rule(
            "owasp-rate-limit-retry-after",
            "A `429` response should define a `Retry-After` header",
            Severity::Error,
            RuleAction::new("owaspRatelimitRetryAfter"),
            "Add a `Retry-After` header to `429` responses",
        ),
        owasp_rule(
            "owasp-no-numeric-ids",
            "Use random IDs that cannot be guessed. UUIDs are preferred",
            Severity::Error,
            RuleAction::new("owaspNoNumericIds"),
            "Switch identifier parameters to `type: string` with `format: uuid`",
        ),
        owasp_rule(
            "owasp-no-http-basic",
            "Security scheme uses HTTP Basic. Use a more secure authentication method",
            Severity::Error,
            RuleAction::new("owaspNoBasicAuth"),
            "Replace basic authentication with OAuth2 or another token based scheme",
        ),
        owasp_rule(
            "owasp-no-api-keys-in-url",
            "API keys must not be passed via URL parameters",
            Severity::Error,
            RuleAction::new("owaspNoApiKeyInUrl"),
            "Move the API key into a header",
        ),
        owasp_rule(
            "owasp-no-credentials-in-url",
            "Security credentials detected in path or query parameter",
            Severity::Error,
            RuleAction::new("owaspNoCredentialsInUrl"),
            "Pass credentials in headers instead of the URL",
        ),
        owasp_rule(
            "owasp-auth-insecure-schemes",
            "Authentication scheme is considered outdated or insecure",
            Severity::Error,
            RuleAction::new("owaspAuthInsecureSchemes"),
            "Use a current HTTP authentication scheme such as `bearer`",
        ),
        owasp_rule(
            "owasp-jwt-best-practices",
            "Security schemes using JWTs must explicitly declare support for RFC8725",
            Severity::Error,
            RuleAction::new("owaspJWTBestPractice"),
            "State in the scheme `description` that tokens follow RFC8725",
        ),
        owasp_rule(
            "owasp-array-limit",
            "Array size should be limited to mitigate resource exhaustion attacks",
            Severity::Error,
            RuleAction::new("owaspArrayLimit"),
            "Add `maxItems` to arrays accepted from clients",
        ),
        owasp_rule(
            "owasp-string-limit",
            "String size should be limited to mitigate resource exhaustion attacks",
            Severity::Error,
            RuleAction::new("owaspStringLimit"),
            "Add `maxLength`, `enum` or `const` to strings accepted from clients",
        ),
        owasp_rule(
            "owasp-string-restricted",
            "String must specify a `format`, `const`, `enum` or `pattern`",
            Severity::Error,
            RuleAction::new("owaspStringRestricted"),
            "Restrict the accepted values of the string",
        ),
        owasp_rule(
            "owasp-integer-format",
            "Integers should be limited to mitigate resource exhaustion attacks",
            Severity::Error,
            RuleAction::new("owaspIntegerFormat"),
            "Set `format` to `int32` or `int64`",
        ),
        owasp_rule(
            "owasp-integer-limit",
            "Integers should be limited via min/max values",
            Severity::Error,
            RuleAction::new("owaspIntegerLimit"),
            "Set `minimum` and `maximum` (or their exclusive forms)",
        ),
        owasp_rule(
            "owasp-no-additionalProperties",
            "If the `additionalProperties` keyword is used it must be set to false",
            Severity::Warn,
            RuleAction::new("owaspNoAdditionalProperties"),
            "Set `additionalProperties: false`",
        ),
        owasp_rule(
            "owasp-constrained-additionalProperties",
            "Objects should not allow unconstrained `additionalProperties`",
            Severity::Warn,
            RuleAction::new("owaspAdditionalPropertiesConstrained"),
            "Add `maxProperties` next to `additionalProperties`",
        ),
        owasp_rule(
            "owasp-security-hosts-https",
            "All servers defined MUST use https, and no other protocol is permitted",
            Severity::Error,
            RuleAction::new("owaspHostsHttps"),
            "Serve the API over `https` only",
        ),
    ]
}
