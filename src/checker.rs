//! Advisory checks over a document before generation
//!
//! The checker reports every field the generator ignores, so users know which
//! parts of their API do not make it into the `.proto` output. It never
//! fails; messages are informational or warnings.

use crate::openapi::{
    AdditionalProperties, Components, Document, MediaType, Operation, Parameter, PathItem, ReferenceOr, RequestBody,
    Response, Schema,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageLevel {
    Info,
    Warning,
}

impl std::fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageLevel::Info => write!(f, "INFO"),
            MessageLevel::Warning => write!(f, "WARNING"),
        }
    }
}

/// One finding of the checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckerMessage {
    /// Kind of object the finding is about, e.g. `SCHEMAFIELDS`
    pub code: String,
    pub level: MessageLevel,
    pub text: String,
    /// Path to the field within the document
    pub keys: Vec<String>,
}

/// Walks a document top-down: root fields, components, then paths.
pub struct GrpcChecker<'a> {
    document: &'a Document,
    messages: Vec<CheckerMessage>,
}

impl<'a> GrpcChecker<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            messages: Vec::new(),
        }
    }

    pub fn run(mut self) -> Vec<CheckerMessage> {
        self.analyze_document();
        self.messages
    }

    fn push(&mut self, code: &str, level: MessageLevel, text: String, keys: Vec<String>) {
        self.messages.push(CheckerMessage {
            code: code.to_string(),
            level,
            text,
            keys,
        });
    }

    fn unsupported(&mut self, code: &str, fields: Vec<&str>, what: &str, keys: &[String]) {
        for field in fields {
            self.push(
                code,
                MessageLevel::Info,
                format!("Field: '{field}' is not supported for {what}"),
                with(keys, &[field]),
            );
        }
    }

    fn analyze_document(&mut self) {
        let document = self.document;
        let fields = present(&[
            ("servers", document.servers.is_some()),
            ("security", document.security.is_some()),
            ("tags", document.tags.is_some()),
            ("externalDocs", document.external_docs.is_some()),
        ]);
        let what = format!("the OpenAPI document with title: {}", document.info.title);
        self.unsupported("DOCUMENTFIELDS", fields, &what, &[]);

        if let Some(components) = &document.components {
            self.analyze_components(components);
        }
        for (name, item) in &document.paths {
            self.analyze_path_item(name, item);
        }
    }

    fn analyze_components(&mut self, components: &Components) {
        let keys = vec!["components".to_string()];
        let fields = present(&[
            ("examples", components.examples.is_some()),
            ("headers", components.headers.is_some()),
            ("securitySchemes", components.security_schemes.is_some()),
            ("links", components.links.is_some()),
            ("callbacks", components.callbacks.is_some()),
        ]);
        self.unsupported("COMPONENTSFIELDS", fields, "the component", &keys);

        for (name, schema) in components.schemas.iter().flatten() {
            self.analyze_schema(name, schema, &with(&keys, &["schemas", name]));
        }
        for (name, response) in components.responses.iter().flatten() {
            if let ReferenceOr::Item(response) = response {
                self.analyze_response(name, response, &with(&keys, &["responses", name]));
            }
        }
        for (name, parameter) in components.parameters.iter().flatten() {
            if let ReferenceOr::Item(parameter) = parameter {
                self.analyze_parameter(parameter, &with(&keys, &["parameters", name]));
            }
        }
        for (name, body) in components.request_bodies.iter().flatten() {
            if let ReferenceOr::Item(body) = body {
                self.analyze_request_body(name, body, &with(&keys, &["requestBodies", name]));
            }
        }
    }

    fn analyze_path_item(&mut self, name: &str, item: &PathItem) {
        let keys = vec!["paths".to_string(), name.to_string()];
        let fields = present(&[
            ("head", item.head.is_some()),
            ("options", item.options.is_some()),
            ("trace", item.trace.is_some()),
            ("servers", item.servers.is_some()),
        ]);
        self.unsupported("PATHFIELDS", fields, &format!("path: {name}"), &keys);

        // Shared parameters are merged into every operation of the path.
        for (index, parameter) in item.parameters.iter().flatten().enumerate() {
            if let ReferenceOr::Item(parameter) = parameter {
                self.analyze_parameter(parameter, &with(&keys, &["parameters", &index.to_string()]));
            }
        }

        for (verb, operation) in item.transcodable_operations() {
            self.analyze_operation(operation, &with(&keys, &[verb]));
        }
    }

    fn analyze_operation(&mut self, operation: &Operation, keys: &[String]) {
        let operation_id = operation.operation_id.as_deref().unwrap_or_default();
        if operation_id.is_empty() {
            self.push(
                "OPERATION",
                MessageLevel::Warning,
                "One of your operations does not have an 'operationId'. The generated handler name is derived \
                 from the HTTP verb and path and the output might not be what you expect."
                    .to_string(),
                keys.to_vec(),
            );
        }

        let fields = present(&[
            ("tags", operation.tags.is_some()),
            ("externalDocs", operation.external_docs.is_some()),
            ("callbacks", operation.callbacks.is_some()),
            ("deprecated", operation.deprecated),
            ("security", operation.security.is_some()),
            ("servers", operation.servers.is_some()),
        ]);
        self.unsupported("OPERATIONFIELDS", fields, &format!("operation: {operation_id}"), keys);

        for (index, parameter) in operation.parameters.iter().enumerate() {
            if let ReferenceOr::Item(parameter) = parameter {
                self.analyze_parameter(parameter, &with(keys, &["parameters", &index.to_string()]));
            }
        }
        for (code, response) in &operation.responses {
            if let ReferenceOr::Item(response) = response {
                self.analyze_response(code, response, &with(keys, &["responses", code]));
            }
        }
        if let Some(ReferenceOr::Item(body)) = &operation.request_body {
            self.analyze_request_body(operation_id, body, &with(keys, &["requestBody"]));
        }
    }

    fn analyze_parameter(&mut self, parameter: &Parameter, keys: &[String]) {
        let fields = present(&[
            ("required", parameter.required),
            ("deprecated", parameter.deprecated),
            ("allowEmptyValue", parameter.allow_empty_value),
            ("style", parameter.style.as_deref().is_some_and(|s| !s.is_empty())),
            ("explode", parameter.explode == Some(true)),
            ("allowReserved", parameter.allow_reserved),
            ("example", parameter.example.is_some()),
            ("examples", parameter.examples.is_some()),
            ("content", parameter.content.is_some()),
        ]);
        self.unsupported("PARAMETERFIELDS", fields, &format!("parameter: {}", parameter.name), keys);

        if let Some(schema) = &parameter.schema {
            self.analyze_schema(&parameter.name, schema, &with(keys, &["schema"]));
        }
    }

    fn analyze_response(&mut self, name: &str, response: &Response, keys: &[String]) {
        let fields = present(&[("links", response.links.is_some()), ("headers", response.headers.is_some())]);
        self.unsupported("RESPONSEFIELDS", fields, &format!("response: {name}"), keys);

        for (media, media_type) in response.content.iter().flatten() {
            self.analyze_media_type(media, media_type, &with(keys, &["content", media]));
        }
    }

    fn analyze_request_body(&mut self, name: &str, body: &RequestBody, keys: &[String]) {
        if body.required {
            self.unsupported("REQUESTBODYFIELDS", vec!["required"], &format!("the request: {name}"), keys);
        }
        for (media, media_type) in &body.content {
            self.analyze_media_type(media, media_type, &with(keys, &["content", media]));
        }
    }

    fn analyze_media_type(&mut self, name: &str, media_type: &MediaType, keys: &[String]) {
        let fields = present(&[
            ("examples", media_type.examples.is_some()),
            ("example", media_type.example.is_some()),
            ("encoding", media_type.encoding.is_some()),
        ]);
        self.unsupported("MEDIATYPEFIELDS", fields, &format!("the mediatype: {name}"), keys);

        if let Some(schema) = &media_type.schema {
            self.analyze_schema(name, schema, &with(keys, &["schema"]));
        }
    }

    fn analyze_schema(&mut self, identifier: &str, schema: &ReferenceOr<Schema>, keys: &[String]) {
        let ReferenceOr::Item(schema) = schema else {
            return;
        };
        self.unsupported(
            "SCHEMAFIELDS",
            unsupported_schema_fields(schema),
            &format!("the schema: {identifier}"),
            keys,
        );

        let additional = match &schema.additional_properties {
            Some(AdditionalProperties::Schema(additional)) => Some(additional.as_ref()),
            _ => None,
        };
        let array_values = additional
            .and_then(ReferenceOr::as_item)
            .is_some_and(|s| s.schema_type.as_deref() == Some("array"));
        if array_values {
            self.push(
                "SCHEMAFIELDS",
                MessageLevel::Info,
                "Field: 'additionalProperties' with type array is generated as empty message inside .proto."
                    .to_string(),
                with(keys, &["additionalProperties"]),
            );
        }

        if let Some(items) = &schema.items {
            self.analyze_schema(&format!("Items of {identifier}"), items, &with(keys, &["items"]));
        }
        for (name, property) in &schema.properties {
            self.analyze_schema(name, property, &with(keys, &["properties", name]));
        }
        if let Some(additional) = additional {
            self.analyze_schema(
                &format!("AdditionalProperties of {identifier}"),
                additional,
                &with(keys, &["additionalProperties"]),
            );
        }
    }
}

fn unsupported_schema_fields(schema: &Schema) -> Vec<&'static str> {
    present(&[
        ("nullable", schema.nullable),
        ("discriminator", schema.discriminator.is_some()),
        ("readOnly", schema.read_only),
        ("writeOnly", schema.write_only),
        ("xml", schema.xml.is_some()),
        ("externalDocs", schema.external_docs.is_some()),
        ("example", schema.example.is_some()),
        ("deprecated", schema.deprecated),
        ("title", schema.title.as_deref().is_some_and(|t| !t.is_empty())),
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
        ("maxProperties", schema.max_properties.is_some()),
        ("minProperties", schema.min_properties.is_some()),
        ("required", schema.required.is_some()),
        ("not", schema.not.is_some()),
        ("default", schema.default.is_some()),
    ])
}

fn present(checks: &[(&'static str, bool)]) -> Vec<&'static str> {
    checks.iter().filter(|(_, set)| *set).map(|(field, _)| *field).collect()
}

fn with(keys: &[String], tokens: &[&str]) -> Vec<String> {
    let mut out = keys.to_vec();
    out.extend(tokens.iter().map(|t| t.to_string()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(yaml: &str) -> Vec<CheckerMessage> {
        let document = Document::from_yaml_str(yaml).unwrap();
        GrpcChecker::new(&document).run()
    }

    fn keys(messages: &[CheckerMessage]) -> Vec<String> {
        messages.iter().map(|m| m.keys.join("/")).collect()
    }

    #[test]
    fn test_request_body_fields() {
        let messages = run(r#"
openapi: 3.0.0
info: {title: People, version: '1'}
paths: {}
components:
  schemas:
    Person:
      required: [name]
      properties:
        name:
          type: string
          example: Ada
        photoUrls:
          type: array
          xml:
            wrapped: true
          items:
            type: string
  requestBodies:
    RequestBody:
      required: true
      content:
        application/json:
          schema:
            $ref: '#/components/schemas/Person'
"#);
        assert_eq!(
            keys(&messages),
            vec![
                "components/schemas/Person/required",
                "components/schemas/Person/properties/name/example",
                "components/schemas/Person/properties/photoUrls/xml",
                "components/requestBodies/RequestBody/required",
            ]
        );
        assert_eq!(messages[0].code, "SCHEMAFIELDS");
        assert_eq!(messages[0].text, "Field: 'required' is not supported for the schema: Person");
        assert_eq!(messages[3].code, "REQUESTBODYFIELDS");
        assert!(messages.iter().all(|m| m.level == MessageLevel::Info));
    }

    #[test]
    fn test_missing_operation_id_and_array_maps() {
        let messages = run(r#"
openapi: 3.0.0
info: {title: Other, version: '1'}
paths:
  /testAdditionalPropertiesArray:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                type: object
                additionalProperties:
                  type: array
                  items:
                    type: string
"#);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].code, "OPERATION");
        assert_eq!(messages[0].level, MessageLevel::Warning);
        assert_eq!(messages[0].keys, vec!["paths", "/testAdditionalPropertiesArray", "get"]);
        assert_eq!(
            messages[1].keys.join("/"),
            "paths//testAdditionalPropertiesArray/get/responses/200/content/application/json/schema/additionalProperties"
        );
        assert!(messages[1].text.contains("generated as empty message"));
    }

    #[test]
    fn test_parameter_and_path_fields() {
        let messages = run(r#"
openapi: 3.0.0
info: {title: Params, version: '1'}
servers:
  - url: https://example.com
paths:
  /items:
    head:
      operationId: headItems
      responses: {}
    get:
      operationId: listItems
      parameters:
        - name: ids
          in: query
          explode: true
          schema:
            type: array
            items:
              type: string
              default: a
      responses: {}
"#);
        assert_eq!(
            keys(&messages),
            vec![
                "servers",
                "paths//items/head",
                "paths//items/get/parameters/0/explode",
                "paths//items/get/parameters/0/schema/items/default",
            ]
        );
        assert_eq!(
            messages[0].text,
            "Field: 'servers' is not supported for the OpenAPI document with title: Params"
        );
        assert_eq!(messages[1].code, "PATHFIELDS");
        assert_eq!(messages[2].code, "PARAMETERFIELDS");
    }

    #[test]
    fn test_shared_path_parameters_are_transcoded() {
        let messages = run(r#"
openapi: 3.0.0
info: {title: Shared, version: '1'}
paths:
  /shelves/{shelf}:
    parameters:
      - name: shelf
        in: path
        required: true
        schema:
          type: string
    get:
      operationId: getShelf
      responses: {}
"#);
        assert!(messages.iter().all(|m| m.code != "PATHFIELDS"));
        assert_eq!(keys(&messages), vec!["paths//shelves/{shelf}/parameters/0/required"]);
        assert_eq!(messages[0].code, "PARAMETERFIELDS");
    }
}
