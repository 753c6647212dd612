//! Surface model: the flattened type/field/method graph the generator consumes
//!
//! A model is produced once per document (see [`builder`]) and is read-only
//! afterwards. Names on types and fields are already normalized for proto.

pub mod builder;

pub use builder::build_surface_model;

use serde::{Deserialize, Serialize};

/// Types, methods and external references of one OpenAPI document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceModel {
    /// Source name of the document (path or URL)
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub types: Vec<SurfaceType>,
    #[serde(default)]
    pub methods: Vec<SurfaceMethod>,
    /// `$ref` targets that live in other documents
    #[serde(default)]
    pub symbolic_references: Vec<String>,
}

impl SurfaceModel {
    /// Find a type by its proto message name.
    pub fn type_by_name(&self, type_name: &str) -> Option<&SurfaceType> {
        self.types.iter().find(|t| t.type_name == type_name)
    }
}

/// How the properties of a type were composed in the source schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    #[default]
    Plain,
    OneOf,
    AnyOf,
}

/// One generated message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceType {
    /// Name as it appears in the document
    pub name: String,
    /// Proto message name
    pub type_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_kind: ContentKind,
    #[serde(default)]
    pub fields: Vec<SurfaceField>,
    /// Set when the type holds the parameters of an RPC method
    #[serde(default)]
    pub is_request_parameters: bool,
}

/// Declared shape of a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Scalar,
    Array,
    Map,
    Reference,
}

/// Where a request parameter travels in the HTTP request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    None,
    Body,
    Header,
    Query,
    Path,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceField {
    /// Name as it appears in the document
    pub name: String,
    /// Proto field name
    pub field_name: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Proto type: a scalar keyword, a message name, or `map[string]<value>`
    pub native_type: String,
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub description: String,
}

/// One RPC
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMethod {
    /// Operation identifier (given or synthesized)
    pub name: String,
    /// Proto method name
    pub handler_name: String,
    /// Upper-case HTTP verb
    pub verb: String,
    /// URL path template
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters_type_name: Option<String>,
    #[serde(default)]
    pub responses_type_name: Option<String>,
}
