//! Incompatibility reporters, one per OpenAPI object kind
//!
//! Every reporter is a pure function from a document subtree and the token
//! path leading to it to the incompatibilities found there. Token paths
//! mirror the document's key structure exactly (sequence elements are
//! addressed by index) so each one can be located in the source again.

use crate::incompat::types::{Incompatibility, IncompatibilityClassification as Class};
use crate::openapi::{
    AdditionalProperties, Document, Header, MediaType, Operation, Parameter, PathItem, ReferenceOr, RequestBody,
    Response, Schema,
};
use indexmap::IndexMap;

/// Reporter over a whole document.
pub type DocumentReporter = fn(&Document) -> Vec<Incompatibility>;

/// Get the document-level reporters in composition order.
pub fn document_reporters() -> &'static [(&'static str, DocumentReporter)] {
    DOCUMENT_REPORTERS
}

const DOCUMENT_REPORTERS: &[(&str, DocumentReporter)] = &[
    ("DOCUMENT", document_base_search),
    ("PATHS", paths_search),
    ("COMPONENTS", components_search),
];

fn extend(base: &[String], tokens: &[&str]) -> Vec<String> {
    let mut path = base.to_vec();
    path.extend(tokens.iter().map(|t| t.to_string()));
    path
}

fn found(out: &mut Vec<Incompatibility>, classification: Class, base: &[String], token: &str) {
    out.push(Incompatibility::new(classification, extend(base, &[token])));
}

fn non_empty<K, V>(map: &Option<IndexMap<K, V>>) -> bool {
    map.as_ref().is_some_and(|m| !m.is_empty())
}

/// Root-level fields.
pub fn document_base_search(document: &Document) -> Vec<Incompatibility> {
    let mut out = Vec::new();
    if document.security.as_ref().is_some_and(|s| !s.is_empty()) {
        found(&mut out, Class::Security, &[], "security");
    }
    out
}

/// Every path item under `paths`.
pub fn paths_search(document: &Document) -> Vec<Incompatibility> {
    document
        .paths
        .iter()
        .flat_map(|(name, item)| path_item_search(item, &extend(&[], &["paths", name])))
        .collect()
}

pub fn path_item_search(item: &PathItem, base: &[String]) -> Vec<Incompatibility> {
    let mut out = Vec::new();
    for (verb, operation) in [("head", &item.head), ("options", &item.options), ("trace", &item.trace)] {
        if operation.is_some() {
            found(&mut out, Class::InvalidOperation, base, verb);
        }
    }
    for (index, parameter) in item.parameters.iter().flatten().enumerate() {
        if let ReferenceOr::Item(parameter) = parameter {
            out.extend(parameter_search(parameter, &extend(base, &["parameters", &index.to_string()])));
        }
    }
    for (verb, operation) in item.transcodable_operations() {
        out.extend(operation_search(operation, &extend(base, &[verb])));
    }
    out
}

pub fn operation_search(operation: &Operation, base: &[String]) -> Vec<Incompatibility> {
    let mut out = Vec::new();
    if operation.callbacks.is_some() {
        found(&mut out, Class::ExternalTranscodingSupport, base, "callbacks");
    }
    // An explicit empty list still overrides the document-level requirement.
    if operation.security.is_some() {
        found(&mut out, Class::Security, base, "security");
    }
    for (index, parameter) in operation.parameters.iter().enumerate() {
        if let ReferenceOr::Item(parameter) = parameter {
            out.extend(parameter_search(parameter, &extend(base, &["parameters", &index.to_string()])));
        }
    }
    if let Some(ReferenceOr::Item(body)) = &operation.request_body {
        out.extend(request_body_search(body, &extend(base, &["requestBody"])));
    }
    for (code, response) in &operation.responses {
        if let ReferenceOr::Item(response) = response {
            out.extend(response_search(response, &extend(base, &["responses", code])));
        }
    }
    out
}

pub fn parameter_search(parameter: &Parameter, base: &[String]) -> Vec<Incompatibility> {
    let mut out = Vec::new();
    if parameter.style.as_deref().is_some_and(|s| !s.is_empty()) {
        found(&mut out, Class::ParameterStyling, base, "style");
    }
    if parameter.explode == Some(true) {
        found(&mut out, Class::ParameterStyling, base, "explode");
    }
    if parameter.allow_reserved {
        found(&mut out, Class::ParameterStyling, base, "allowReserved");
    }
    if parameter.allow_empty_value {
        found(&mut out, Class::DataValidation, base, "allowEmptyValue");
    }
    if let Some(ReferenceOr::Item(schema)) = &parameter.schema {
        out.extend(schema_search(schema, &extend(base, &["schema"])));
    }
    if let Some(content) = &parameter.content {
        out.extend(content_search(content, base));
    }
    out
}

/// Header rules are the parameter rules applied to the equivalent parameter.
pub fn header_search(name: &str, header: &Header, base: &[String]) -> Vec<Incompatibility> {
    parameter_search(&header.to_parameter(name), base)
}

pub fn schema_search(schema: &Schema, base: &[String]) -> Vec<Incompatibility> {
    let mut out = Vec::new();
    if schema.nullable {
        found(&mut out, Class::InvalidDataState, base, "nullable");
    }
    if schema.discriminator.is_some() {
        found(&mut out, Class::Inheritance, base, "discriminator");
    }
    if schema.read_only {
        found(&mut out, Class::ParameterStyling, base, "readOnly");
    }
    if schema.write_only {
        found(&mut out, Class::ParameterStyling, base, "writeOnly");
    }

    let constraints = [
        ("multipleOf", schema.multiple_of.is_some()),
        ("maximum", schema.maximum.is_some()),
        ("exclusiveMaximum", schema.exclusive_maximum),
        ("minimum", schema.minimum.is_some()),
        ("exclusiveMinimum", schema.exclusive_minimum),
        ("maxLength", schema.max_length.is_some()),
        ("minLength", schema.min_length.is_some()),
        ("pattern", schema.pattern.is_some()),
        ("maxItems", schema.max_items.is_some()),
        ("minItems", schema.min_items.is_some()),
        ("uniqueItems", schema.unique_items),
    ];
    for (token, present) in constraints {
        if present {
            found(&mut out, Class::DataValidation, base, token);
        }
    }

    for (token, branches) in [("allOf", &schema.all_of), ("oneOf", &schema.one_of), ("anyOf", &schema.any_of)] {
        if branches.is_empty() {
            continue;
        }
        found(&mut out, Class::Inheritance, base, token);
        for (index, branch) in branches.iter().enumerate() {
            if let ReferenceOr::Item(branch) = branch {
                out.extend(schema_search(branch, &extend(base, &[token, &index.to_string()])));
            }
        }
    }

    if let Some(items) = &schema.items {
        if let ReferenceOr::Item(items) = items.as_ref() {
            out.extend(schema_search(items, &extend(base, &["items"])));
        }
    }
    for (name, property) in &schema.properties {
        if let ReferenceOr::Item(property) = property {
            out.extend(schema_search(property, &extend(base, &["properties", name])));
        }
    }
    if let Some(AdditionalProperties::Schema(additional)) = &schema.additional_properties {
        if let ReferenceOr::Item(additional) = additional.as_ref() {
            out.extend(schema_search(additional, &extend(base, &["additionalProperties"])));
        }
    }
    out
}

pub fn response_search(response: &Response, base: &[String]) -> Vec<Incompatibility> {
    let mut out = Vec::new();
    for (name, header) in response.headers.iter().flatten() {
        if let ReferenceOr::Item(header) = header {
            out.extend(header_search(name, header, &extend(base, &["headers", name])));
        }
    }
    if let Some(content) = &response.content {
        out.extend(content_search(content, base));
    }
    out
}

pub fn request_body_search(body: &RequestBody, base: &[String]) -> Vec<Incompatibility> {
    content_search(&body.content, base)
}

/// The `content` map under `base`.
pub fn content_search(content: &IndexMap<String, MediaType>, base: &[String]) -> Vec<Incompatibility> {
    content
        .iter()
        .flat_map(|(name, media_type)| media_type_search(media_type, &extend(base, &["content", name])))
        .collect()
}

pub fn media_type_search(media_type: &MediaType, base: &[String]) -> Vec<Incompatibility> {
    let mut out = Vec::new();
    if non_empty(&media_type.encoding) {
        found(&mut out, Class::ParameterStyling, base, "encoding");
    }
    if let Some(ReferenceOr::Item(schema)) = &media_type.schema {
        out.extend(schema_search(schema, &extend(base, &["schema"])));
    }
    out
}

/// Every named entry under `components`.
pub fn components_search(document: &Document) -> Vec<Incompatibility> {
    let mut out = Vec::new();
    let Some(components) = &document.components else {
        return out;
    };
    let base = extend(&[], &["components"]);

    for (name, schema) in components.schemas.iter().flatten() {
        if let ReferenceOr::Item(schema) = schema {
            out.extend(schema_search(schema, &extend(&base, &["schemas", name])));
        }
    }
    for (name, response) in components.responses.iter().flatten() {
        if let ReferenceOr::Item(response) = response {
            out.extend(response_search(response, &extend(&base, &["responses", name])));
        }
    }
    for (name, parameter) in components.parameters.iter().flatten() {
        if let ReferenceOr::Item(parameter) = parameter {
            out.extend(parameter_search(parameter, &extend(&base, &["parameters", name])));
        }
    }
    for (name, body) in components.request_bodies.iter().flatten() {
        if let ReferenceOr::Item(body) = body {
            out.extend(request_body_search(body, &extend(&base, &["requestBodies", name])));
        }
    }
    for (name, header) in components.headers.iter().flatten() {
        if let ReferenceOr::Item(header) = header {
            out.extend(header_search(name, header, &extend(&base, &["headers", name])));
        }
    }
    if components.callbacks.is_some() {
        found(&mut out, Class::ExternalTranscodingSupport, &base, "callbacks");
    }
    if components.security_schemes.is_some() {
        found(&mut out, Class::Security, &base, "securitySchemes");
    }
    out
}
