//! Typed walk over a spec: operations, parameters, schemas and friends.
//!
//! Rule functions that need OpenAPI semantics (which schemas are request
//! bodies, which parameters belong to which operation) read this instead of
//! re-walking the raw tree.

use super::index::SpecIndex;
use super::{HTTP_METHODS, SpecFormat};
use crate::document::{Document, NodeId, View};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Operation {
    /// Path template, e.g. `/pets/{id}`
    pub path: String,
    pub method: String,
    pub node: NodeId,
    pub path_item: NodeId,
    pub json_path: String,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    /// The parameter object after following `$ref`s
    pub node: NodeId,
    pub json_path: String,
    pub name: String,
    /// Value of `in`
    pub location: String,
    /// First operation that uses it, if any
    pub operation: Option<usize>,
}

/// A schema reachable from the spec, with the direction data flows through it
#[derive(Debug, Clone)]
pub struct Schema {
    pub node: NodeId,
    pub json_path: String,
    pub request: bool,
    pub response: bool,
    /// Paths of `$ref`s that point at this schema
    pub referenced_from: Vec<String>,
}

impl Schema {
    /// Declared `type`, normalised to a list
    pub fn types<'d>(&self, document: &'d Document) -> Vec<&'d str> {
        match document.get(self.node, "type") {
            Some(t) if document.is_sequence(t) => document
                .items(t)
                .iter()
                .filter_map(|i| document.as_str(*i))
                .collect(),
            Some(t) => document.as_str(t).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn is_type(&self, document: &Document, name: &str) -> bool {
        self.types(document).contains(&name)
    }
}

#[derive(Debug, Clone)]
pub struct SecurityScheme {
    pub name: String,
    pub node: NodeId,
    pub json_path: String,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub url: String,
    /// The server object
    pub node: NodeId,
    pub json_path: String,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub code: String,
    /// The response object after following `$ref`s
    pub node: NodeId,
    /// Path of the entry under `responses`
    pub json_path: String,
    pub operation: usize,
}

#[derive(Debug, Clone)]
pub struct Tag {
    pub name: String,
    pub node: NodeId,
    pub json_path: String,
}

#[derive(Debug, Default)]
pub struct DoctorDocument {
    pub operations: Vec<Operation>,
    pub parameters: Vec<Parameter>,
    pub schemas: Vec<Schema>,
    pub security_schemes: Vec<SecurityScheme>,
    pub servers: Vec<Server>,
    pub responses: Vec<Response>,
    pub tags: Vec<Tag>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct Flow {
    request: bool,
    response: bool,
}

const NEUTRAL: Flow = Flow {
    request: false,
    response: false,
};
const REQUEST: Flow = Flow {
    request: true,
    response: false,
};
const RESPONSE: Flow = Flow {
    request: false,
    response: true,
};

/// Keywords whose value is a single subschema
const SUBSCHEMA_KEYS: &[&str] = &[
    "not",
    "contains",
    "if",
    "then",
    "else",
    "propertyNames",
    "additionalProperties",
    "unevaluatedProperties",
    "unevaluatedItems",
    "additionalItems",
];

/// Keywords whose value maps names to subschemas
const SUBSCHEMA_MAPS: &[&str] = &["properties", "patternProperties", "dependentSchemas", "$defs"];

/// Keywords whose value is a list of subschemas
const SUBSCHEMA_LISTS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

struct SchemaWalker<'d> {
    document: &'d Document,
    schemas: Vec<Schema>,
    by_node: HashMap<NodeId, usize>,
}

impl<'d> SchemaWalker<'d> {
    fn visit(&mut self, node: NodeId, flow: Flow) {
        let doc = self.document;
        if let Some(reference) = doc.reference_of(node) {
            if let Some(target) = doc.resolve_reference(node, reference) {
                self.visit(target, flow);
            }
            return;
        }
        if !doc.is_mapping(node) {
            return;
        }

        match self.by_node.get(&node) {
            Some(&i) => {
                let schema = &mut self.schemas[i];
                let merged = Flow {
                    request: schema.request || flow.request,
                    response: schema.response || flow.response,
                };
                if merged.request == schema.request && merged.response == schema.response {
                    return;
                }
                schema.request = merged.request;
                schema.response = merged.response;
            }
            None => {
                self.by_node.insert(node, self.schemas.len());
                self.schemas.push(Schema {
                    node,
                    json_path: doc.path_of(node),
                    request: flow.request,
                    response: flow.response,
                    referenced_from: Vec::new(),
                });
            }
        }

        if let Some(items) = doc.get(node, "items") {
            if doc.is_sequence(items) {
                for item in doc.items(items) {
                    self.visit(*item, flow);
                }
            } else {
                self.visit(items, flow);
            }
        }
        for key in SUBSCHEMA_KEYS {
            if let Some(child) = doc.get(node, key) {
                self.visit(child, flow);
            }
        }
        for key in SUBSCHEMA_MAPS {
            if let Some(map) = doc.get(node, key) {
                let children: Vec<NodeId> = doc.entries(map).map(|(_, v)| v).collect();
                for child in children {
                    self.visit(child, flow);
                }
            }
        }
        for key in SUBSCHEMA_LISTS {
            if let Some(list) = doc.get(node, key) {
                for child in doc.items(list) {
                    self.visit(*child, flow);
                }
            }
        }
    }

    /// Schemas under `content.<media>.schema`
    fn visit_content(&mut self, holder: NodeId, flow: Flow) {
        let doc = self.document;
        if let Some(content) = doc.get(holder, "content") {
            for (_, media) in doc.entries(content) {
                if let Some(schema) = doc.get(media, "schema") {
                    self.visit(schema, flow);
                }
            }
        }
    }

    fn visit_parameter(&mut self, parameter: NodeId) {
        let doc = self.document;
        let parameter = doc.follow(parameter);
        if let Some(schema) = doc.get(parameter, "schema") {
            self.visit(schema, REQUEST);
        }
        self.visit_content(parameter, REQUEST);
    }

    fn visit_response(&mut self, response: NodeId) {
        let doc = self.document;
        let response = doc.follow(response);
        if let Some(schema) = doc.get(response, "schema") {
            self.visit(schema, RESPONSE);
        }
        self.visit_content(response, RESPONSE);
        if let Some(headers) = doc.get(response, "headers") {
            for (_, header) in doc.entries(headers) {
                let header = doc.follow(header);
                if let Some(schema) = doc.get(header, "schema") {
                    self.visit(schema, RESPONSE);
                }
            }
        }
    }

    fn visit_request_body(&mut self, body: NodeId) {
        let body = self.document.follow(body);
        self.visit_content(body, REQUEST);
    }
}

impl DoctorDocument {
    pub fn build(document: &Document, index: &SpecIndex, format: SpecFormat) -> Self {
        let mut doctor = DoctorDocument::default();
        let Some(root) = document.root(View::Unresolved) else {
            return doctor;
        };

        doctor.collect_operations(document, root);
        doctor.collect_parameters(document, root, format);
        doctor.collect_responses(document);
        doctor.collect_security_schemes(document, root, format);
        doctor.collect_servers(document, root);
        doctor.collect_tags(document, root);
        doctor.collect_schemas(document, root, index, format);

        tracing::debug!(
            operations = doctor.operations.len(),
            parameters = doctor.parameters.len(),
            schemas = doctor.schemas.len(),
            "Built doctor document"
        );
        doctor
    }

    fn collect_operations(&mut self, document: &Document, root: NodeId) {
        let Some(paths) = document.get(root, "paths") else {
            return;
        };
        for (key, item) in document.entries(paths) {
            let path_item = document.follow(item);
            if !document.is_mapping(path_item) {
                continue;
            }
            for (method_key, operation) in document.entries(path_item) {
                let method = document.value(method_key);
                if !HTTP_METHODS.contains(&method) || !document.is_mapping(operation) {
                    continue;
                }
                self.operations.push(Operation {
                    path: document.value(key).to_string(),
                    method: method.to_string(),
                    node: operation,
                    path_item,
                    json_path: document.path_of(operation),
                });
            }
        }
    }

    fn push_parameter(&mut self, document: &Document, site: NodeId, operation: Option<usize>) {
        let node = document.follow(site);
        if !document.is_mapping(node) || self.parameters.iter().any(|p| p.node == node) {
            return;
        }
        self.parameters.push(Parameter {
            node,
            json_path: document.path_of(node),
            name: document.get_str(node, "name").unwrap_or_default().to_string(),
            location: document.get_str(node, "in").unwrap_or_default().to_string(),
            operation,
        });
    }

    fn collect_parameters(&mut self, document: &Document, root: NodeId, format: SpecFormat) {
        for i in 0..self.operations.len() {
            let (path_item, operation) = (self.operations[i].path_item, self.operations[i].node);
            for holder in [path_item, operation] {
                if let Some(list) = document.get(holder, "parameters") {
                    for site in document.items(list) {
                        self.push_parameter(document, *site, Some(i));
                    }
                }
            }
        }

        let shared = if format == SpecFormat::Oas2 {
            document.get(root, "parameters")
        } else {
            document
                .get(root, "components")
                .and_then(|c| document.get(c, "parameters"))
        };
        if let Some(shared) = shared {
            let sites: Vec<NodeId> = document.entries(shared).map(|(_, v)| v).collect();
            for site in sites {
                self.push_parameter(document, site, None);
            }
        }
    }

    fn collect_responses(&mut self, document: &Document) {
        for (i, operation) in self.operations.iter().enumerate() {
            let Some(responses) = document.get(operation.node, "responses") else {
                continue;
            };
            for (code, response) in document.entries(responses) {
                self.responses.push(Response {
                    code: document.value(code).to_string(),
                    node: document.follow(response),
                    json_path: document.path_of(response),
                    operation: i,
                });
            }
        }
    }

    fn collect_security_schemes(&mut self, document: &Document, root: NodeId, format: SpecFormat) {
        let container = if format == SpecFormat::Oas2 {
            document.get(root, "securityDefinitions")
        } else {
            document
                .get(root, "components")
                .and_then(|c| document.get(c, "securitySchemes"))
        };
        let Some(container) = container else {
            return;
        };
        for (key, scheme) in document.entries(container) {
            let node = document.follow(scheme);
            self.security_schemes.push(SecurityScheme {
                name: document.value(key).to_string(),
                node,
                json_path: document.path_of(scheme),
            });
        }
    }

    fn collect_servers(&mut self, document: &Document, root: NodeId) {
        let mut holders = vec![root];
        for operation in &self.operations {
            if !holders.contains(&operation.path_item) {
                holders.push(operation.path_item);
            }
            holders.push(operation.node);
        }
        for holder in holders {
            let Some(list) = document.get(holder, "servers") else {
                continue;
            };
            for server in document.items(list) {
                self.servers.push(Server {
                    url: document.get_str(*server, "url").unwrap_or_default().to_string(),
                    node: *server,
                    json_path: document.path_of(*server),
                });
            }
        }
    }

    fn collect_tags(&mut self, document: &Document, root: NodeId) {
        let Some(tags) = document.get(root, "tags") else {
            return;
        };
        for tag in document.items(tags) {
            if let Some(name) = document.get_str(*tag, "name") {
                self.tags.push(Tag {
                    name: name.to_string(),
                    node: *tag,
                    json_path: document.path_of(*tag),
                });
            }
        }
    }

    fn collect_schemas(
        &mut self,
        document: &Document,
        root: NodeId,
        index: &SpecIndex,
        format: SpecFormat,
    ) {
        let mut walker = SchemaWalker {
            document,
            schemas: Vec::new(),
            by_node: HashMap::new(),
        };

        // Named schemas first so they keep their component paths
        let definitions = if format == SpecFormat::Oas2 {
            document.get(root, "definitions")
        } else {
            document
                .get(root, "components")
                .and_then(|c| document.get(c, "schemas"))
        };
        if let Some(definitions) = definitions {
            let nodes: Vec<NodeId> = document.entries(definitions).map(|(_, v)| v).collect();
            for node in nodes {
                walker.visit(node, NEUTRAL);
            }
        }

        for operation in &self.operations {
            for holder in [operation.path_item, operation.node] {
                if let Some(list) = document.get(holder, "parameters") {
                    for parameter in document.items(list) {
                        walker.visit_parameter(*parameter);
                    }
                }
            }
            if let Some(body) = document.get(operation.node, "requestBody") {
                walker.visit_request_body(body);
            }
        }
        for response in &self.responses {
            walker.visit_response(response.node);
        }

        let components = document.get(root, "components");
        let shared = |key: &str| {
            if format == SpecFormat::Oas2 {
                document.get(root, key)
            } else {
                components.and_then(|c| document.get(c, key))
            }
        };
        if let Some(parameters) = shared("parameters") {
            for (_, parameter) in document.entries(parameters) {
                walker.visit_parameter(parameter);
            }
        }
        if let Some(bodies) = shared("requestBodies") {
            for (_, body) in document.entries(bodies) {
                walker.visit_request_body(body);
            }
        }
        if let Some(responses) = shared("responses") {
            for (_, response) in document.entries(responses) {
                walker.visit_response(response);
            }
        }
        if let Some(headers) = shared("headers") {
            for (_, header) in document.entries(headers) {
                if let Some(schema) = document.get(document.follow(header), "schema") {
                    walker.visit(schema, RESPONSE);
                }
            }
        }

        for schema in &mut walker.schemas {
            schema.referenced_from = index.references_to(schema.node);
        }
        self.schemas = walker.schemas;
    }

    pub fn operation(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    pub fn request_schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter().filter(|s| s.request)
    }

    pub fn response_schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter().filter(|s| s.response)
    }

    pub fn responses_of(&self, operation: usize) -> impl Iterator<Item = &Response> {
        self.responses.iter().filter(move |r| r.operation == operation)
    }
}
