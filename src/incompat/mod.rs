//! Incompatibility scanning
//!
//! Finds OpenAPI features that a gRPC descriptor cannot represent, classifies
//! them, and aggregates the results over sets of documents.

pub mod aggregate;
pub mod classify;
pub mod reporters;
pub mod scanning;
pub mod types;

pub use aggregate::{ApiSetIncompatibility, IncompatibilityAnalysis, aggregate_reports};
pub use scanning::{CompatibilityReport, analyze_directory, detailed_report, scan_document, scan_file};
pub use types::{
    DetailedIncompatibilityReport, Incompatibility, IncompatibilityClassification, IncompatibilityDescription,
    IncompatibilityReport, Severity,
};
