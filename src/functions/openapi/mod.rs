//! Functions that need OpenAPI semantics. They read the doctor document
//! and index rather than the located nodes, so they run once per rule.

mod components;
mod discriminator;
mod enums;
mod operations;
mod parameters;
mod paths;
mod references;
mod security;
mod servers;
mod tags;

pub use components::{ComponentDescriptions, UnusedComponent};
pub use discriminator::Discriminator;
pub use enums::{DuplicatedEnum, TypedEnum};
pub use operations::{DescriptionDuplication, OpErrorResponse, OpIdUnique, OpSuccessResponse};
pub use parameters::{OpParams, PathParam};
pub use paths::AmbiguousPaths;
pub use references::RefSiblings;
pub use security::OpSecurityDefined;
pub use servers::Servers;
pub use tags::TagDefined;

use crate::document::Document;
use crate::functions::RuleFunctionContext;
use crate::models::RuleFunctionResult;
use crate::openapi::doctor::{Operation, Schema};

/// How an operation is named in messages
pub(crate) fn operation_label(document: &Document, operation: &Operation) -> String {
    match document.get_str(operation.node, "operationId") {
        Some(id) if !id.is_empty() => format!("`{}`", id),
        _ => format!("`{}` at `{}`", operation.method.to_uppercase(), operation.path),
    }
}

/// A result anchored on a schema, carrying its alternate `$ref` paths
pub(crate) fn schema_result(
    ctx: &RuleFunctionContext<'_>,
    schema: &Schema,
    message: String,
) -> RuleFunctionResult {
    ctx.result_at(message, schema.node, schema.json_path.clone())
        .with_paths(schema.referenced_from.clone())
}
