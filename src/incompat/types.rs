//! Core types for incompatibility reporting

use crate::incompat::classify;
use serde::{Deserialize, Serialize};

/// Category of an OpenAPI feature that protobuf/gRPC cannot represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncompatibilityClassification {
    /// Unclassified
    Default,
    /// Authentication and authorization information
    Security,
    /// Parameter serialization styles
    ParameterStyling,
    /// Value constraints
    DataValidation,
    /// Features that need transcoding support outside .proto files
    ExternalTranscodingSupport,
    /// HTTP operations without a gRPC mapping
    InvalidOperation,
    /// Nullability
    InvalidDataState,
    /// Schema composition and polymorphism
    Inheritance,
}

impl IncompatibilityClassification {
    /// Get the string identifier for this classification
    pub fn id(&self) -> &'static str {
        match self {
            IncompatibilityClassification::Default => "Default",
            IncompatibilityClassification::Security => "Security",
            IncompatibilityClassification::ParameterStyling => "ParameterStyling",
            IncompatibilityClassification::DataValidation => "DataValidation",
            IncompatibilityClassification::ExternalTranscodingSupport => "ExternalTranscodingSupport",
            IncompatibilityClassification::InvalidOperation => "InvalidOperation",
            IncompatibilityClassification::InvalidDataState => "InvalidDataState",
            IncompatibilityClassification::Inheritance => "Inheritance",
        }
    }

    /// Parse classification from string ID
    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|c| c.id() == id)
    }

    /// Get all available classifications
    pub fn all() -> Vec<Self> {
        vec![
            IncompatibilityClassification::Default,
            IncompatibilityClassification::Security,
            IncompatibilityClassification::ParameterStyling,
            IncompatibilityClassification::DataValidation,
            IncompatibilityClassification::ExternalTranscodingSupport,
            IncompatibilityClassification::InvalidOperation,
            IncompatibilityClassification::InvalidDataState,
            IncompatibilityClassification::Inheritance,
        ]
    }
}

impl std::fmt::Display for IncompatibilityClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for IncompatibilityClassification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| format!("Unknown incompatibility classification: {s}"))
    }
}

/// How much an incompatibility matters for a transcoded API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Not important to the core API representation
    Info,
    /// Part of the API is lost, transcoding still works
    Warning,
    /// Fundamental representation feature without protobuf support
    Fail,
}

impl Severity {
    pub fn id(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// One unsupported construct found in a document
///
/// Severity is derived from the classification when the record is created
/// and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Incompatibility {
    token_path: Vec<String>,
    classification: IncompatibilityClassification,
    severity: Severity,
}

impl Incompatibility {
    pub fn new(classification: IncompatibilityClassification, token_path: Vec<String>) -> Self {
        Self {
            token_path,
            classification,
            severity: classify::severity(classification),
        }
    }

    /// Document keys and sequence indices leading to the offending field.
    pub fn token_path(&self) -> &[String] {
        &self.token_path
    }

    pub fn classification(&self) -> IncompatibilityClassification {
        self.classification
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Token path joined with dots, for display.
    pub fn path_string(&self) -> String {
        self.token_path.join(".")
    }
}

/// Incompatibilities of one document, in scan order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncompatibilityReport {
    /// Source path of the scanned document
    pub report_identifier: String,
    pub incompatibilities: Vec<Incompatibility>,
}

impl IncompatibilityReport {
    pub fn new(report_identifier: impl Into<String>, incompatibilities: Vec<Incompatibility>) -> Self {
        Self {
            report_identifier: report_identifier.into(),
            incompatibilities,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.incompatibilities.iter().any(|i| i.severity() == Severity::Fail)
    }

    /// Drop every incompatibility whose classification is in `excluded`.
    pub fn without_classifications(mut self, excluded: &[IncompatibilityClassification]) -> Self {
        self.incompatibilities
            .retain(|i| !excluded.contains(&i.classification()));
        self
    }
}

/// An incompatibility with its source position and explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompatibilityDescription {
    /// 1-based line of the offending key; `None` if the lookup failed
    pub line: Option<usize>,
    /// 1-based column of the offending key; `None` if the lookup failed
    pub column: Option<usize>,
    pub hint: String,
    pub classification: IncompatibilityClassification,
    pub severity: Severity,
    /// Last token of the path
    pub token: String,
    /// Why the position could not be determined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_error: Option<String>,
}

/// Detailed report of one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailedIncompatibilityReport {
    pub report_identifier: String,
    pub incompatibilities: Vec<IncompatibilityDescription>,
}
