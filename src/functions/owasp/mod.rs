//! OWASP API Security Top 10 checks.
//!
//! Like the OpenAPI functions these read the doctor document. Array and
//! string limits only look at schemas data flows into (request side); the
//! rest apply to every schema.

mod auth;
mod parameters;
mod responses;
mod schemas;
mod servers;

pub use auth::{AuthInsecureSchemes, CheckSecurity, JwtBestPractice, NoApiKeyInUrl, NoBasicAuth};
pub use parameters::{NoCredentialsInUrl, NoNumericIds};
pub use responses::{
    CheckErrorResponse, DefineErrorDefinition, HeaderDefinition, RatelimitRetryAfter,
};
pub use schemas::{
    AdditionalPropertiesConstrained, ArrayLimit, IntegerFormat, IntegerLimit,
    NoAdditionalProperties, StringLimit, StringRestricted,
};
pub use servers::HostsHttps;

use crate::document::{Document, NodeId};

/// Header names on a response object, lower-cased
pub(crate) fn header_names(document: &Document, response: NodeId) -> Vec<String> {
    document
        .get(response, "headers")
        .map(|headers| {
            document
                .entries(headers)
                .map(|(k, _)| document.value(k).to_ascii_lowercase())
                .collect()
        })
        .unwrap_or_default()
}
