//! OpenAPI v3 document tree
//!
//! A typed, order-preserving view over an OpenAPI 3.x document. Maps keep
//! declaration order (`IndexMap`) so that scanning emits incompatibilities and
//! the surface builder emits types in the order the author wrote them.
//! Everything the generator and scanner never inspect is kept as an opaque
//! `serde_yaml::Value`; presence is all that matters for those.

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

/// `name -> [scope]` map attached to documents and operations.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Either an inline object or a `$ref` to one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReferenceOr<T> {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(T),
}

impl<T> ReferenceOr<T> {
    pub fn as_item(&self) -> Option<&T> {
        match self {
            ReferenceOr::Item(item) => Some(item),
            ReferenceOr::Reference { .. } => None,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            ReferenceOr::Reference { reference } => Some(reference),
            ReferenceOr::Item(_) => None,
        }
    }
}

/// OpenAPI document root
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub openapi: String,

    #[serde(default)]
    pub info: Info,

    #[serde(default)]
    pub servers: Option<Vec<Value>>,

    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,

    #[serde(default)]
    pub components: Option<Components>,

    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,

    #[serde(default)]
    pub tags: Option<Vec<Value>>,

    #[serde(default)]
    pub external_docs: Option<Value>,
}

impl Document {
    /// Parse a YAML (or JSON) OpenAPI 3.x document.
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let document: Document =
            serde_yaml::from_str(content).context("Failed to parse OpenAPI document")?;
        if !document.openapi.starts_with("3.") {
            bail!(
                "Unsupported OpenAPI version '{}', only 3.x documents are supported",
                document.openapi
            );
        }
        Ok(document)
    }

    /// Load and parse an OpenAPI document from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid document '{}'", path.display()))
    }

    /// Look up a component schema by a local `#/components/schemas/<name>` reference.
    pub fn resolve_schema<'a>(&'a self, reference: &str) -> Option<&'a Schema> {
        let name = reference.strip_prefix("#/components/schemas/")?;
        self.components
            .as_ref()?
            .schemas
            .as_ref()?
            .get(name)?
            .as_item()
    }

    /// Look up a component parameter by a local `#/components/parameters/<name>` reference.
    pub fn resolve_parameter<'a>(&'a self, reference: &str) -> Option<&'a Parameter> {
        let name = reference.strip_prefix("#/components/parameters/")?;
        self.components
            .as_ref()?
            .parameters
            .as_ref()?
            .get(name)?
            .as_item()
    }

    /// Look up a component request body by a local reference.
    pub fn resolve_request_body<'a>(&'a self, reference: &str) -> Option<&'a RequestBody> {
        let name = reference.strip_prefix("#/components/requestBodies/")?;
        self.components
            .as_ref()?
            .request_bodies
            .as_ref()?
            .get(name)?
            .as_item()
    }

    /// Look up a component response by a local reference.
    pub fn resolve_response<'a>(&'a self, reference: &str) -> Option<&'a Response> {
        let name = reference.strip_prefix("#/components/responses/")?;
        self.components
            .as_ref()?
            .responses
            .as_ref()?
            .get(name)?
            .as_item()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Operations and shared parameters of one path template
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub get: Option<Operation>,
    #[serde(default)]
    pub put: Option<Operation>,
    #[serde(default)]
    pub post: Option<Operation>,
    #[serde(default)]
    pub delete: Option<Operation>,
    #[serde(default)]
    pub options: Option<Operation>,
    #[serde(default)]
    pub head: Option<Operation>,
    #[serde(default)]
    pub patch: Option<Operation>,
    #[serde(default)]
    pub trace: Option<Operation>,
    #[serde(default)]
    pub servers: Option<Vec<Value>>,
    #[serde(default)]
    pub parameters: Option<Vec<ReferenceOr<Parameter>>>,
}

impl PathItem {
    /// Operations that map onto gRPC methods, in a fixed verb order.
    pub fn transcodable_operations(&self) -> Vec<(&'static str, &Operation)> {
        [
            ("get", &self.get),
            ("put", &self.put),
            ("post", &self.post),
            ("delete", &self.delete),
            ("patch", &self.patch),
        ]
        .into_iter()
        .filter_map(|(verb, op)| op.as_ref().map(|op| (verb, op)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_docs: Option<Value>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,
    #[serde(default)]
    pub request_body: Option<ReferenceOr<RequestBody>>,
    /// Keyed by status code or `default`.
    #[serde(default)]
    pub responses: IndexMap<String, ReferenceOr<Response>>,
    #[serde(default)]
    pub callbacks: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
    #[serde(default)]
    pub servers: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,

    /// Location: query, header, path, cookie
    #[serde(rename = "in")]
    pub location: String,

    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub allow_empty_value: bool,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub explode: Option<bool>,
    #[serde(default)]
    pub allow_reserved: bool,
    #[serde(default)]
    pub schema: Option<ReferenceOr<Schema>>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub examples: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// A response header; shaped like a parameter without `name` and `in`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub allow_empty_value: bool,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub explode: Option<bool>,
    #[serde(default)]
    pub allow_reserved: bool,
    #[serde(default)]
    pub schema: Option<ReferenceOr<Schema>>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub examples: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub content: Option<IndexMap<String, MediaType>>,
}

impl Header {
    /// The equivalent `in: header` parameter.
    pub fn to_parameter(&self, name: &str) -> Parameter {
        Parameter {
            name: name.to_string(),
            location: "header".to_string(),
            description: self.description.clone(),
            required: self.required,
            deprecated: self.deprecated,
            allow_empty_value: self.allow_empty_value,
            style: self.style.clone(),
            explode: self.explode,
            allow_reserved: self.allow_reserved,
            schema: self.schema.clone(),
            example: self.example.clone(),
            examples: self.examples.clone(),
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub headers: Option<IndexMap<String, ReferenceOr<Header>>>,
    #[serde(default)]
    pub content: Option<IndexMap<String, MediaType>>,
    #[serde(default)]
    pub links: Option<IndexMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<ReferenceOr<Schema>>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub examples: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub encoding: Option<IndexMap<String, Value>>,
}

/// `additionalProperties` is either a flag or a value schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Any(bool),
    Schema(Box<ReferenceOr<Schema>>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub schema_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub discriminator: Option<Value>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,
    #[serde(default)]
    pub xml: Option<Value>,
    #[serde(default)]
    pub external_docs: Option<Value>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub multiple_of: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub exclusive_maximum: bool,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub exclusive_minimum: bool,
    #[serde(default)]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub min_length: Option<u64>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub max_items: Option<u64>,
    #[serde(default)]
    pub min_items: Option<u64>,
    #[serde(default)]
    pub unique_items: bool,
    #[serde(default)]
    pub max_properties: Option<u64>,
    #[serde(default)]
    pub min_properties: Option<u64>,
    #[serde(default)]
    pub required: Option<Vec<String>>,
    #[serde(default)]
    pub not: Option<Box<ReferenceOr<Schema>>>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub items: Option<Box<ReferenceOr<Schema>>>,
    #[serde(default)]
    pub properties: IndexMap<String, ReferenceOr<Schema>>,
    #[serde(default)]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default)]
    pub all_of: Vec<ReferenceOr<Schema>>,
    #[serde(default)]
    pub one_of: Vec<ReferenceOr<Schema>>,
    #[serde(default)]
    pub any_of: Vec<ReferenceOr<Schema>>,
}

impl Schema {
    /// The value schema of a map, if `additionalProperties` carries one.
    pub fn additional_properties_schema(&self) -> Option<&ReferenceOr<Schema>> {
        match &self.additional_properties {
            Some(AdditionalProperties::Schema(schema)) => Some(schema),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: Option<IndexMap<String, ReferenceOr<Schema>>>,
    #[serde(default)]
    pub responses: Option<IndexMap<String, ReferenceOr<Response>>>,
    #[serde(default)]
    pub parameters: Option<IndexMap<String, ReferenceOr<Parameter>>>,
    #[serde(default)]
    pub examples: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub request_bodies: Option<IndexMap<String, ReferenceOr<RequestBody>>>,
    #[serde(default)]
    pub headers: Option<IndexMap<String, ReferenceOr<Header>>>,
    #[serde(default)]
    pub security_schemes: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub links: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub callbacks: Option<IndexMap<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let yaml = r#"
openapi: 3.0.0
info:
  title: Minimal
  version: "1.0"
paths:
  /books/{id}:
    get:
      operationId: getBook
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
      responses:
        '200':
          description: ok
"#;
        let document = Document::from_yaml_str(yaml).unwrap();
        assert_eq!(document.info.title, "Minimal");
        let item = &document.paths["/books/{id}"];
        let operations = item.transcodable_operations();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].0, "get");
        assert_eq!(operations[0].1.operation_id.as_deref(), Some("getBook"));
        let parameter = operations[0].1.parameters[0].as_item().unwrap();
        assert_eq!(parameter.location, "path");
    }

    #[test]
    fn test_reference_and_inline_schemas() {
        let yaml = r#"
openapi: 3.0.3
info: {title: Refs, version: "1"}
components:
  schemas:
    Pet:
      type: object
      properties:
        owner:
          $ref: '#/components/schemas/Owner'
        tags:
          type: array
          items:
            type: string
        labels:
          type: object
          additionalProperties:
            type: integer
            format: int32
    Owner:
      type: object
      properties:
        name: {type: string}
"#;
        let document = Document::from_yaml_str(yaml).unwrap();
        let pet = document.resolve_schema("#/components/schemas/Pet").unwrap();
        assert_eq!(
            pet.properties["owner"].reference(),
            Some("#/components/schemas/Owner")
        );
        assert!(pet.properties["tags"].as_item().unwrap().items.is_some());
        let labels = pet.properties["labels"].as_item().unwrap();
        assert!(labels.additional_properties_schema().is_some());
        assert!(document.resolve_schema("#/components/schemas/Missing").is_none());
    }

    #[test]
    fn test_rejects_swagger_documents() {
        let yaml = "openapi: 2.0\ninfo: {title: Old, version: '1'}\n";
        assert!(Document::from_yaml_str(yaml).is_err());
    }
}
