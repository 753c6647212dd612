//! Error types shared by the generator and the source locator

use thiserror::Error;

/// Fatal failures while building a descriptor set.
///
/// Advisory findings (badly shaped path or query parameters) never end up
/// here; they are logged and generation continues.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A symbolic reference chain leads back to a document that is still
    /// being generated.
    #[error("cycle in imports: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("failed to load symbolic reference '{reference}': {message}")]
    ReferenceLoad { reference: String, message: String },

    #[error("invalid package name '{0}'")]
    InvalidPackageName(String),

    #[error("failed to build static dependency '{name}': {message}")]
    StaticDependency { name: String, message: String },

    #[error("failed to encode HTTP rule: {0}")]
    HttpRuleEncoding(#[from] protobuf::Error),
}

/// Failures while resolving a token path against a positioned YAML tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("failed to parse yaml: {0}")]
    Parse(String),

    #[error("invalid index parsed: '{segment}'")]
    InvalidIndex { segment: String },

    #[error("index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("unable to find yaml node {0}")]
    NotFound(String),

    /// Sequence elements have no key node to point at.
    #[error("token path ends in sequence index '{0}' which has no key")]
    NoKey(String),

    #[error("document is empty")]
    EmptyDocument,

    #[error("alias {id} at line {line}, column {column} has no anchor")]
    UnknownAlias { id: usize, line: usize, column: usize },
}
