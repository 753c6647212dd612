//! Document scanning, detailed reports and directory analysis

use crate::error::SearchError;
use crate::incompat::aggregate::{ApiSetIncompatibility, aggregate_reports};
use crate::incompat::classify;
use crate::incompat::reporters::document_reporters;
use crate::incompat::types::{
    DetailedIncompatibilityReport, Incompatibility, IncompatibilityClassification, IncompatibilityDescription,
    IncompatibilityReport,
};
use crate::openapi::Document;
use crate::search::{self, Node};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Output of a single-document scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CompatibilityReport {
    Base(IncompatibilityReport),
    Detailed(DetailedIncompatibilityReport),
}

impl CompatibilityReport {
    pub fn report_identifier(&self) -> &str {
        match self {
            CompatibilityReport::Base(report) => &report.report_identifier,
            CompatibilityReport::Detailed(report) => &report.report_identifier,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CompatibilityReport::Base(report) => report.incompatibilities.len(),
            CompatibilityReport::Detailed(report) => report.incompatibilities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run every document reporter over `document`, in reporter table order.
pub fn scan_document(document: &Document, report_identifier: &str) -> IncompatibilityReport {
    let incompatibilities = document_reporters()
        .iter()
        .flat_map(|(_, reporter)| reporter(document))
        .collect();
    IncompatibilityReport::new(report_identifier, incompatibilities)
}

/// Parse and scan the document at `path`, dropping excluded classifications.
pub fn scan_file<P: AsRef<Path>>(
    path: P,
    except: &[IncompatibilityClassification],
) -> anyhow::Result<IncompatibilityReport> {
    let path = path.as_ref();
    let document = Document::from_file(path)?;
    let report = scan_document(&document, &path.to_string_lossy()).without_classifications(except);
    info!(file = %path.display(), incompatibilities = report.incompatibilities.len(), "created incompatibility report");
    Ok(report)
}

/// Position and explanation of one incompatibility within `tree`.
pub fn describe_incompatibility(incompatibility: &Incompatibility, tree: &Node) -> IncompatibilityDescription {
    let classification = incompatibility.classification();
    let mut description = IncompatibilityDescription {
        line: None,
        column: None,
        hint: classify::hint(classification),
        classification,
        severity: incompatibility.severity(),
        token: incompatibility.token_path().last().cloned().unwrap_or_default(),
        lookup_error: None,
    };
    match search::find_key(tree, incompatibility.token_path()) {
        Ok(node) => {
            description.line = Some(node.line);
            description.column = Some(node.column);
        }
        Err(e) => {
            warn!(path = %incompatibility.path_string(), error = %e, "unable to locate incompatibility");
            description.lookup_error = Some(e.to_string());
        }
    }
    description
}

/// Attach source positions to every incompatibility of `report`.
///
/// Only a source that cannot be parsed fails the whole report; a path that
/// cannot be located is recorded on its own description.
pub fn detailed_report(
    report: &IncompatibilityReport,
    source: &str,
) -> Result<DetailedIncompatibilityReport, SearchError> {
    let tree = search::parse_document(source)?;
    Ok(DetailedIncompatibilityReport {
        report_identifier: report.report_identifier.clone(),
        incompatibilities: report
            .incompatibilities
            .iter()
            .map(|i| describe_incompatibility(i, &tree))
            .collect(),
    })
}

/// Scan every file under `dir` and aggregate the reports.
///
/// Files that cannot be read or parsed as OpenAPI 3.x documents are logged
/// and contribute nothing.
pub fn analyze_directory<P: AsRef<Path>>(
    dir: P,
    except: &[IncompatibilityClassification],
) -> anyhow::Result<ApiSetIncompatibility> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        anyhow::bail!("'{}' is not a directory", dir.display());
    }

    let mut reports = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "walk error, skipping entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match scan_file(entry.path(), except) {
            Ok(report) => reports.push(report),
            Err(e) => warn!(file = %entry.path().display(), error = %format!("{e:#}"), "unable to produce analysis"),
        }
    }

    let analysis = aggregate_reports(&reports);
    info!(
        dir = %dir.display(),
        files = analysis.open_api_files,
        incompatible = analysis.incompatible_files,
        "aggregated directory analysis"
    );
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incompat::types::Severity;

    const SOURCE: &str = r#"
openapi: 3.0.0
info:
  title: Pets
  version: '1'
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                type: array
                maxItems: 10
                items:
                  type: string
                  nullable: true
"#;

    #[test]
    fn test_detailed_report_positions() {
        let document = Document::from_yaml_str(SOURCE).unwrap();
        let report = scan_document(&document, "pets.yaml");
        let detailed = detailed_report(&report, SOURCE).unwrap();

        assert_eq!(detailed.report_identifier, "pets.yaml");
        assert_eq!(detailed.incompatibilities.len(), 2);

        let max_items = &detailed.incompatibilities[0];
        assert_eq!(max_items.token, "maxItems");
        assert_eq!((max_items.line, max_items.column), (Some(17), Some(17)));
        assert_eq!(max_items.severity, Severity::Warning);

        let nullable = &detailed.incompatibilities[1];
        assert_eq!(nullable.token, "nullable");
        assert_eq!(nullable.line, Some(20));
        assert!(nullable.hint.starts_with("InvalidDataState incompatibilities"));
    }

    #[test]
    fn test_lookup_failure_does_not_abort() {
        let report = IncompatibilityReport::new(
            "x.yaml",
            vec![
                Incompatibility::new(IncompatibilityClassification::Security, vec!["security".to_string()]),
                Incompatibility::new(IncompatibilityClassification::InvalidOperation, vec!["openapi".to_string()]),
            ],
        );
        let detailed = detailed_report(&report, SOURCE).unwrap();
        assert_eq!(detailed.incompatibilities.len(), 2);
        assert_eq!(detailed.incompatibilities[0].line, None);
        assert_eq!(
            detailed.incompatibilities[0].lookup_error.as_deref(),
            Some("unable to find yaml node security")
        );
        assert_eq!(detailed.incompatibilities[1].line, Some(2));
    }
}
