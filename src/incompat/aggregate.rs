//! Aggregation of incompatibility reports across a set of documents
//!
//! Per-file counts are keyed by (classification, file). Merging a file that
//! is already present replaces its entry, so aggregating the same report
//! twice leaves the per-file counts unchanged.

use crate::incompat::types::{Incompatibility, IncompatibilityClassification, IncompatibilityReport, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrence counts of one set of incompatibilities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncompatibilityCounts {
    pub by_classification: BTreeMap<IncompatibilityClassification, u32>,
    pub by_severity: BTreeMap<Severity, u32>,
}

pub fn count_incompatibilities(incompatibilities: &[Incompatibility]) -> IncompatibilityCounts {
    let mut counts = IncompatibilityCounts::default();
    for incompatibility in incompatibilities {
        *counts
            .by_classification
            .entry(incompatibility.classification())
            .or_default() += 1;
        *counts.by_severity.entry(incompatibility.severity()).or_default() += 1;
    }
    counts
}

/// Per-file occurrence counts of one classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompatibilityAnalysis {
    pub count_per_file: BTreeMap<String, u32>,
}

/// Aggregate over a set of scanned documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSetIncompatibility {
    /// Documents aggregated
    pub open_api_files: u32,
    /// Documents with at least one FAIL incompatibility
    pub incompatible_files: u32,
    pub analysis_per_incompatibility: BTreeMap<IncompatibilityClassification, IncompatibilityAnalysis>,
}

impl ApiSetIncompatibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analysis of a single report.
    pub fn from_report(report: &IncompatibilityReport) -> Self {
        let counts = count_incompatibilities(&report.incompatibilities);
        let mut analysis = Self {
            open_api_files: 1,
            incompatible_files: u32::from(counts.by_severity.contains_key(&Severity::Fail)),
            ..Self::default()
        };
        for (classification, count) in counts.by_classification {
            analysis
                .analysis_per_incompatibility
                .entry(classification)
                .or_default()
                .count_per_file
                .insert(report.report_identifier.clone(), count);
        }
        analysis
    }

    /// Fold `other` into this aggregate. Document totals add up, per-file
    /// counts from `other` overwrite existing entries.
    pub fn merge(&mut self, other: ApiSetIncompatibility) {
        self.open_api_files += other.open_api_files;
        self.incompatible_files += other.incompatible_files;
        for (classification, analysis) in other.analysis_per_incompatibility {
            self.analysis_per_incompatibility
                .entry(classification)
                .or_default()
                .count_per_file
                .extend(analysis.count_per_file);
        }
    }

    /// Occurrences of `classification` recorded for `file`, zero if none.
    pub fn count_for(&self, classification: IncompatibilityClassification, file: &str) -> u32 {
        self.analysis_per_incompatibility
            .get(&classification)
            .and_then(|a| a.count_per_file.get(file))
            .copied()
            .unwrap_or(0)
    }
}

pub fn aggregate_reports<'a, I>(reports: I) -> ApiSetIncompatibility
where
    I: IntoIterator<Item = &'a IncompatibilityReport>,
{
    let mut aggregate = ApiSetIncompatibility::new();
    for report in reports {
        aggregate.merge(ApiSetIncompatibility::from_report(report));
    }
    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;
    use IncompatibilityClassification as Class;

    fn report(identifier: &str, classes: &[Class]) -> IncompatibilityReport {
        IncompatibilityReport::new(
            identifier,
            classes
                .iter()
                .map(|c| Incompatibility::new(*c, vec![c.id().to_string()]))
                .collect(),
        )
    }

    #[test]
    fn test_single_report() {
        let analysis = ApiSetIncompatibility::from_report(&report(
            "a.yaml",
            &[Class::DataValidation, Class::DataValidation, Class::InvalidDataState],
        ));
        assert_eq!(analysis.open_api_files, 1);
        assert_eq!(analysis.incompatible_files, 1);
        assert_eq!(analysis.count_for(Class::DataValidation, "a.yaml"), 2);
        assert_eq!(analysis.count_for(Class::InvalidDataState, "a.yaml"), 1);
        assert_eq!(analysis.count_for(Class::Security, "a.yaml"), 0);
    }

    #[test]
    fn test_per_file_counts_are_idempotent() {
        let a = report("a.yaml", &[Class::Security, Class::Security]);
        let once = aggregate_reports([&a]);
        let twice = aggregate_reports([&a, &a]);
        assert_eq!(once.analysis_per_incompatibility, twice.analysis_per_incompatibility);
        assert_eq!(twice.count_for(Class::Security, "a.yaml"), 2);
    }

    #[test]
    fn test_warning_only_file_is_not_incompatible() {
        let aggregate = aggregate_reports(&[
            report("a.yaml", &[Class::ParameterStyling]),
            report("b.yaml", &[Class::Inheritance]),
            report("c.yaml", &[]),
        ]);
        assert_eq!(aggregate.open_api_files, 3);
        assert_eq!(aggregate.incompatible_files, 1);
        assert_eq!(aggregate.count_for(Class::ParameterStyling, "a.yaml"), 1);
        assert_eq!(aggregate.count_for(Class::Inheritance, "b.yaml"), 1);
    }

    #[test]
    fn test_serializes_classifications_as_keys() {
        let aggregate = aggregate_reports(&[report("a.yaml", &[Class::InvalidOperation])]);
        let json = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(json["analysis_per_incompatibility"]["InvalidOperation"]["count_per_file"]["a.yaml"], 1);
    }
}
