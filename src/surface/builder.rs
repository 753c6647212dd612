//! Flattening of an OpenAPI document into a [`SurfaceModel`]
//!
//! Component schemas with properties (or compositions) become types, each
//! transcodable operation becomes a method with a request type holding its
//! parameters and body, and the lowest-status-code response becomes the
//! method's response type. Schemas that are not message-like (enums,
//! scalars, arrays, maps) are inlined into the fields that reference them.

use crate::naming;
use crate::openapi::{Document, Operation, Parameter, ReferenceOr, Schema};
use crate::surface::{
    ContentKind, FieldKind, Position, SurfaceField, SurfaceMethod, SurfaceModel, SurfaceType,
};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

/// Maximum length of a chain of `$ref`s to non-message schemas.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Build the surface model of `document`, naming it `source_name`.
pub fn build_surface_model(document: &Document, source_name: &str) -> SurfaceModel {
    let mut builder = ModelBuilder::new(document);

    if let Some(schemas) = document.components.as_ref().and_then(|c| c.schemas.as_ref()) {
        for (name, schema) in schemas {
            if let ReferenceOr::Item(schema) = schema {
                if is_message_like(schema) {
                    builder.add_type(name, schema);
                }
            }
        }
    }

    for (path, item) in &document.paths {
        let shared = item.parameters.as_deref().unwrap_or_default();
        for (verb, operation) in item.transcodable_operations() {
            builder.add_method(path, verb, operation, shared);
        }
    }

    SurfaceModel {
        name: source_name.to_string(),
        types: builder.types,
        methods: builder.methods,
        symbolic_references: builder.symbolic_references,
    }
}

/// OpenAPI scalar type/format to proto scalar keyword.
///
/// Returns `None` for non-scalar OpenAPI types.
pub fn scalar_native_type(schema_type: &str, format: &str) -> Option<&'static str> {
    let native = match schema_type {
        "boolean" => "bool",
        "number" => match format {
            "double" => "double",
            _ => "float",
        },
        "integer" => match format {
            "int32" => "int32",
            "uint32" => "uint32",
            "uint64" => "uint64",
            _ => "int64",
        },
        "string" => match format {
            "byte" | "binary" => "bytes",
            _ => "string",
        },
        _ => return None,
    };
    Some(native)
}

/// Whether a schema is rendered as its own message.
fn is_message_like(schema: &Schema) -> bool {
    if schema.enum_values.is_some() {
        return false;
    }
    if !schema.properties.is_empty()
        || !schema.all_of.is_empty()
        || !schema.one_of.is_empty()
        || !schema.any_of.is_empty()
    {
        return true;
    }
    schema.schema_type.as_deref() == Some("object") && schema.additional_properties_schema().is_none()
}

/// Last path segment of a `$ref`.
fn reference_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn is_external(reference: &str) -> bool {
    !reference.starts_with('#')
}

fn enum_literal(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}

struct ModelBuilder<'a> {
    document: &'a Document,
    types: Vec<SurfaceType>,
    type_names: HashSet<String>,
    methods: Vec<SurfaceMethod>,
    symbolic_references: Vec<String>,
}

impl<'a> ModelBuilder<'a> {
    fn new(document: &'a Document) -> Self {
        Self {
            document,
            types: Vec::new(),
            type_names: HashSet::new(),
            methods: Vec::new(),
            symbolic_references: Vec::new(),
        }
    }

    fn record_symbolic_reference(&mut self, reference: &str) {
        if !self.symbolic_references.iter().any(|r| r == reference) {
            self.symbolic_references.push(reference.to_string());
        }
    }

    /// Add a message type for `schema` and return its proto name.
    fn add_type(&mut self, name: &str, schema: &Schema) -> String {
        let type_name = naming::proto_type_name(name);
        if !self.type_names.insert(type_name.clone()) {
            return type_name;
        }

        let content_kind = if !schema.one_of.is_empty() {
            ContentKind::OneOf
        } else if !schema.any_of.is_empty() {
            ContentKind::AnyOf
        } else {
            ContentKind::Plain
        };

        let mut properties = Vec::new();
        let mut visited = HashSet::new();
        self.collect_properties(schema, &mut properties, &mut visited);

        let fields = properties
            .iter()
            .map(|(property, property_schema)| self.field_from_schema(&type_name, property, property_schema))
            .collect();

        self.push_type(SurfaceType {
            name: name.to_string(),
            type_name: type_name.clone(),
            description: schema.description.clone().unwrap_or_default(),
            content_kind,
            fields,
            is_request_parameters: false,
        });
        type_name
    }

    /// Normalize field names and store the type.
    fn push_type(&mut self, mut surface_type: SurfaceType) {
        let names: Vec<String> = surface_type.fields.iter().map(|f| f.field_name.clone()).collect();
        for (field, unique) in surface_type.fields.iter_mut().zip(naming::deduplicate_names(&names)) {
            field.field_name = unique;
        }
        self.type_names.insert(surface_type.type_name.clone());
        self.types.push(surface_type);
    }

    /// Own properties followed by those of every composed branch.
    fn collect_properties(
        &mut self,
        schema: &Schema,
        out: &mut Vec<(String, ReferenceOr<Schema>)>,
        visited: &mut HashSet<String>,
    ) {
        for (name, property) in &schema.properties {
            out.push((name.clone(), property.clone()));
        }
        let branches = schema.all_of.iter().chain(&schema.one_of).chain(&schema.any_of);
        for branch in branches {
            match branch {
                ReferenceOr::Item(branch) => self.collect_properties(branch, out, visited),
                ReferenceOr::Reference { reference } if is_external(reference) => {
                    debug!(%reference, "composition branch in another document is not flattened");
                    self.record_symbolic_reference(reference);
                }
                ReferenceOr::Reference { reference } => {
                    if !visited.insert(reference.clone()) {
                        continue;
                    }
                    if let Some(target) = self.document.resolve_schema(reference) {
                        self.collect_properties(target, out, visited);
                    }
                }
            }
        }
    }

    fn field_from_schema(&mut self, parent: &str, name: &str, schema: &ReferenceOr<Schema>) -> SurfaceField {
        let mut field = self.shape_field(parent, name, schema, 0);
        field.name = name.to_string();
        field.field_name = naming::proto_field_name(name, &field.native_type);
        field
    }

    /// Kind, native type and enum values of a field; names are filled in by the caller.
    fn shape_field(&mut self, parent: &str, name: &str, schema: &ReferenceOr<Schema>, depth: usize) -> SurfaceField {
        let schema = match schema {
            ReferenceOr::Reference { reference } => {
                if is_external(reference) {
                    self.record_symbolic_reference(reference);
                    return reference_field(reference);
                }
                match self.document.resolve_schema(reference) {
                    Some(target) if !is_message_like(target) && depth < MAX_REFERENCE_DEPTH => {
                        return self.shape_field(parent, name, &ReferenceOr::Item(target.clone()), depth + 1);
                    }
                    _ => return reference_field(reference),
                }
            }
            ReferenceOr::Item(schema) => schema,
        };

        if let Some(values) = &schema.enum_values {
            return SurfaceField {
                kind: FieldKind::Scalar,
                native_type: naming::title_case(name),
                enum_values: Some(values.iter().map(enum_literal).collect()),
                description: schema.description.clone().unwrap_or_default(),
                ..SurfaceField::default()
            };
        }

        let schema_type = schema.schema_type.as_deref().unwrap_or_default();
        if schema_type == "array" {
            let element = match &schema.items {
                Some(items) => self.shape_field(parent, name, items, depth + 1),
                None => scalar_field("string"),
            };
            return SurfaceField {
                kind: FieldKind::Array,
                description: schema.description.clone().unwrap_or_default(),
                ..element
            };
        }

        if let Some(value_schema) = schema.additional_properties_schema() {
            if schema.properties.is_empty() {
                let value = self.shape_field(parent, name, value_schema, depth + 1);
                let prefix = if value.kind == FieldKind::Array { "map[string][]" } else { "map[string]" };
                return SurfaceField {
                    kind: FieldKind::Map,
                    native_type: format!("{prefix}{}", value.native_type),
                    enum_values: value.enum_values,
                    description: schema.description.clone().unwrap_or_default(),
                    ..SurfaceField::default()
                };
            }
        }

        if is_message_like(schema) {
            let nested = format!("{parent}_{name}");
            let type_name = self.add_type(&nested, schema);
            return SurfaceField {
                kind: FieldKind::Reference,
                native_type: type_name,
                description: schema.description.clone().unwrap_or_default(),
                ..SurfaceField::default()
            };
        }

        let format = schema.format.as_deref().unwrap_or_default();
        let native = scalar_native_type(schema_type, format).unwrap_or("string");
        SurfaceField {
            description: schema.description.clone().unwrap_or_default(),
            ..scalar_field(native)
        }
    }

    fn add_method(&mut self, path: &str, verb: &str, operation: &Operation, shared: &[ReferenceOr<Parameter>]) {
        let name = operation
            .operation_id
            .clone()
            .unwrap_or_else(|| naming::clean_name(&format!("{verb}{path}")));
        let handler_name = naming::proto_type_name(&name);

        let parameters_type_name = self.add_parameters_type(&name, &handler_name, operation, shared);
        let responses_type_name = self.response_type(&handler_name, operation);

        self.methods.push(SurfaceMethod {
            name,
            handler_name,
            verb: verb.to_uppercase(),
            path: path.to_string(),
            description: operation
                .description
                .clone()
                .or_else(|| operation.summary.clone())
                .unwrap_or_default(),
            parameters_type_name,
            responses_type_name,
        });
    }

    fn resolve_parameter<'p>(&mut self, parameter: &'p ReferenceOr<Parameter>) -> Option<&'p Parameter>
    where
        'a: 'p,
    {
        match parameter {
            ReferenceOr::Item(parameter) => Some(parameter),
            ReferenceOr::Reference { reference } if is_external(reference) => {
                self.record_symbolic_reference(reference);
                None
            }
            ReferenceOr::Reference { reference } => self.document.resolve_parameter(reference),
        }
    }

    /// Build the `<Operation>Request` type; `None` if the operation takes nothing.
    fn add_parameters_type(
        &mut self,
        name: &str,
        handler_name: &str,
        operation: &Operation,
        shared: &[ReferenceOr<Parameter>],
    ) -> Option<String> {
        let type_name = naming::proto_type_name(&format!("{name}Parameters").replacen("Parameters", "Request", 1));
        let mut parameters: IndexMap<(String, String), Parameter> = IndexMap::new();
        for parameter in shared.iter().chain(&operation.parameters) {
            if let Some(parameter) = self.resolve_parameter(parameter) {
                parameters.insert((parameter.name.clone(), parameter.location.clone()), parameter.clone());
            }
        }

        let mut fields = Vec::new();
        for parameter in parameters.values() {
            let position = match parameter.location.as_str() {
                "path" => Position::Path,
                "query" => Position::Query,
                "header" => Position::Header,
                other => {
                    debug!(parameter = %parameter.name, location = other, "parameter location not transcoded");
                    continue;
                }
            };
            let mut field = match &parameter.schema {
                Some(schema) => self.field_from_schema(&type_name, &parameter.name, schema),
                None => SurfaceField {
                    name: parameter.name.clone(),
                    field_name: naming::proto_field_name(&parameter.name, "string"),
                    ..scalar_field("string")
                },
            };
            field.position = position;
            if let Some(description) = &parameter.description {
                field.description = description.clone();
            }
            fields.push(field);
        }

        if let Some(body) = self.request_body_field(&type_name, operation) {
            fields.push(body);
        }

        if fields.is_empty() {
            return None;
        }
        self.push_type(SurfaceType {
            name: format!("{name}Parameters"),
            type_name: type_name.clone(),
            description: format!("{type_name} holds parameters to {handler_name}"),
            content_kind: ContentKind::Plain,
            fields,
            is_request_parameters: true,
        });
        Some(type_name)
    }

    fn request_body_field(&mut self, parent: &str, operation: &Operation) -> Option<SurfaceField> {
        let body = match operation.request_body.as_ref()? {
            ReferenceOr::Item(body) => body.clone(),
            ReferenceOr::Reference { reference } if is_external(reference) => {
                self.record_symbolic_reference(reference);
                return None;
            }
            ReferenceOr::Reference { reference } => self.document.resolve_request_body(reference)?.clone(),
        };
        let schema = json_schema(&body.content)?;
        let field_name = match &schema {
            ReferenceOr::Reference { reference } => reference_name(reference).to_string(),
            ReferenceOr::Item(_) => "request_body".to_string(),
        };
        let mut field = self.field_from_schema(parent, &field_name, &schema);
        field.position = Position::Body;
        if let Some(description) = body.description {
            field.description = description;
        }
        Some(field)
    }

    /// Message type for the response with the lowest status code.
    fn response_type(&mut self, handler_name: &str, operation: &Operation) -> Option<String> {
        let (_, response) = operation
            .responses
            .iter()
            .filter_map(|(code, response)| code.parse::<u16>().ok().map(|code| (code, response)))
            .min_by_key(|(code, _)| *code)
            .or_else(|| operation.responses.get("default").map(|response| (0, response)))?;

        let response = match response {
            ReferenceOr::Item(response) => response.clone(),
            ReferenceOr::Reference { reference } if is_external(reference) => {
                self.record_symbolic_reference(reference);
                return None;
            }
            ReferenceOr::Reference { reference } => self.document.resolve_response(reference)?.clone(),
        };
        let schema = json_schema(response.content.as_ref()?)?;

        let wrapper = format!("{handler_name}Response");
        let field = self.field_from_schema(&wrapper, "value", &schema);
        if field.kind == FieldKind::Reference {
            return Some(field.native_type);
        }

        let field_name = if field.kind == FieldKind::Array { "items" } else { "value" };
        let type_name = naming::proto_type_name(&wrapper);
        self.push_type(SurfaceType {
            name: wrapper,
            type_name: type_name.clone(),
            description: response.description.unwrap_or_default(),
            content_kind: ContentKind::Plain,
            fields: vec![SurfaceField {
                name: field_name.to_string(),
                field_name: field_name.to_string(),
                ..field
            }],
            is_request_parameters: false,
        });
        Some(type_name)
    }
}

/// Schema of the JSON media type, falling back to the first one declared.
fn json_schema(content: &IndexMap<String, crate::openapi::MediaType>) -> Option<ReferenceOr<Schema>> {
    content
        .get("application/json")
        .or_else(|| content.values().next())?
        .schema
        .clone()
}

fn reference_field(reference: &str) -> SurfaceField {
    SurfaceField {
        kind: FieldKind::Reference,
        native_type: naming::proto_type_name(reference_name(reference)),
        ..SurfaceField::default()
    }
}

fn scalar_field(native: &str) -> SurfaceField {
    SurfaceField {
        kind: FieldKind::Scalar,
        native_type: native.to_string(),
        ..SurfaceField::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(yaml: &str) -> SurfaceModel {
        let document = Document::from_yaml_str(yaml).unwrap();
        build_surface_model(&document, "test.yaml")
    }

    const BOOKSTORE: &str = r#"
openapi: 3.0.0
info: {title: Bookstore, version: "1.0"}
paths:
  /shelves/{shelf}/books:
    post:
      operationId: createBook
      description: Creates a book on a shelf.
      parameters:
        - name: shelf
          in: path
          required: true
          schema: {type: integer, format: int64}
        - name: tags
          in: query
          schema:
            type: array
            items: {type: string}
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Book'
      responses:
        '201':
          description: created
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Book'
        '400':
          description: bad
components:
  schemas:
    Book:
      type: object
      description: A book.
      properties:
        title: {type: string}
        pages: {type: integer, format: int32}
        status:
          type: string
          enum: [available, checked-out]
        ratings:
          type: object
          additionalProperties: {type: integer, format: int32}
        author:
          $ref: '#/components/schemas/Author'
    Author:
      type: object
      properties:
        name: {type: string}
"#;

    #[test]
    fn test_component_schemas_become_types() {
        let model = model(BOOKSTORE);
        let book = model.type_by_name("Book").unwrap();
        assert_eq!(book.description, "A book.");
        let kinds: Vec<_> = book.fields.iter().map(|f| (f.field_name.as_str(), f.kind, f.native_type.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                ("title", FieldKind::Scalar, "string"),
                ("pages", FieldKind::Scalar, "int32"),
                ("status", FieldKind::Scalar, "Status"),
                ("ratings", FieldKind::Map, "map[string]int32"),
                ("author", FieldKind::Reference, "Author"),
            ]
        );
        assert_eq!(
            book.fields[2].enum_values,
            Some(vec!["available".to_string(), "checked-out".to_string()])
        );
    }

    #[test]
    fn test_operation_becomes_method_with_request_type() {
        let model = model(BOOKSTORE);
        let method = &model.methods[0];
        assert_eq!(method.handler_name, "CreateBook");
        assert_eq!(method.verb, "POST");
        assert_eq!(method.path, "/shelves/{shelf}/books");
        assert_eq!(method.parameters_type_name.as_deref(), Some("CreateBookRequest"));
        assert_eq!(method.responses_type_name.as_deref(), Some("Book"));

        let request = model.type_by_name("CreateBookRequest").unwrap();
        assert!(request.is_request_parameters);
        let positions: Vec<_> = request.fields.iter().map(|f| (f.field_name.as_str(), f.position)).collect();
        assert_eq!(
            positions,
            vec![("shelf", Position::Path), ("tags", Position::Query), ("book", Position::Body)]
        );
        assert_eq!(request.fields[1].kind, FieldKind::Array);
    }

    #[test]
    fn test_missing_operation_id_is_synthesized() {
        let model = model(
            r#"
openapi: 3.0.0
info: {title: T, version: "1"}
paths:
  /books/{id}:
    delete:
      responses:
        '204': {description: gone}
"#,
        );
        let method = &model.methods[0];
        assert_eq!(method.name, "delete_books_id");
        assert_eq!(method.handler_name, "DeleteBooksId");
        assert_eq!(method.parameters_type_name, None);
        assert_eq!(method.responses_type_name, None);
    }

    #[test]
    fn test_compositions_flatten_with_unique_field_names() {
        let model = model(
            r#"
openapi: 3.0.0
info: {title: T, version: "1"}
paths: {}
components:
  schemas:
    Pet:
      oneOf:
        - $ref: '#/components/schemas/Cat'
        - $ref: '#/components/schemas/Dog'
    Cat:
      type: object
      properties:
        name: {type: string}
        lives: {type: integer, format: int32}
    Dog:
      type: object
      properties:
        name: {type: string}
"#,
        );
        let pet = model.type_by_name("Pet").unwrap();
        assert_eq!(pet.content_kind, ContentKind::OneOf);
        let names: Vec<_> = pet.fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["name", "lives", "name1"]);
    }

    #[test]
    fn test_external_references_are_symbolic() {
        let model = model(
            r#"
openapi: 3.0.0
info: {title: T, version: "1"}
paths: {}
components:
  schemas:
    Order:
      type: object
      properties:
        customer:
          $ref: 'common.yaml#/components/schemas/Customer'
        items:
          type: array
          items:
            $ref: 'common.yaml#/components/schemas/Item'
"#,
        );
        assert_eq!(
            model.symbolic_references,
            vec![
                "common.yaml#/components/schemas/Customer".to_string(),
                "common.yaml#/components/schemas/Item".to_string()
            ]
        );
        let order = model.type_by_name("Order").unwrap();
        assert_eq!(order.fields[0].native_type, "Customer");
        assert_eq!(order.fields[1].kind, FieldKind::Array);
        assert_eq!(order.fields[1].native_type, "Item");
    }

    #[test]
    fn test_scalar_native_types() {
        assert_eq!(scalar_native_type("boolean", ""), Some("bool"));
        assert_eq!(scalar_native_type("number", ""), Some("float"));
        assert_eq!(scalar_native_type("number", "double"), Some("double"));
        assert_eq!(scalar_native_type("integer", ""), Some("int64"));
        assert_eq!(scalar_native_type("integer", "uint32"), Some("uint32"));
        assert_eq!(scalar_native_type("string", "byte"), Some("bytes"));
        assert_eq!(scalar_native_type("string", "date-time"), Some("string"));
        assert_eq!(scalar_native_type("object", ""), None);
    }
}
