use openapi_grpc::incompat::aggregate::count_incompatibilities;
use openapi_grpc::incompat::{self, IncompatibilityClassification as Class, aggregate_reports};
use openapi_grpc::search;
use openapi_grpc::{CompatibilityReport, Document, ReportConfig, ReportMode, Severity};
use std::fs;

fn fixture(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn scan(name: &str) -> (String, openapi_grpc::IncompatibilityReport) {
    let source = fs::read_to_string(fixture(name)).unwrap();
    let document = Document::from_yaml_str(&source).unwrap();
    let report = incompat::scan_document(&document, name);
    (source, report)
}

#[test]
fn test_security_head_and_explode_scenario() {
    let (_, report) = scan("scenario.yaml");
    let found: Vec<_> = report
        .incompatibilities
        .iter()
        .map(|i| (i.classification(), i.severity(), i.path_string()))
        .collect();
    assert_eq!(
        found,
        vec![
            (Class::Security, Severity::Warning, "security".to_string()),
            (Class::InvalidOperation, Severity::Fail, "paths./pets.head".to_string()),
            (
                Class::ParameterStyling,
                Severity::Warning,
                "paths./pets.get.parameters.1.explode".to_string()
            ),
        ]
    );
}

#[test]
fn test_nullable_schema_yields_one_failure() {
    let source = r#"
openapi: 3.0.0
info: {title: Nullable, version: '1'}
paths: {}
components:
  schemas:
    Maybe:
      type: string
      nullable: true
"#;
    let document = Document::from_yaml_str(source).unwrap();
    let report = incompat::scan_document(&document, "nullable.yaml");
    assert_eq!(report.incompatibilities.len(), 1);
    let incompatibility = &report.incompatibilities[0];
    assert_eq!(incompatibility.classification(), Class::InvalidDataState);
    assert_eq!(incompatibility.severity(), Severity::Fail);
    assert_eq!(incompatibility.token_path(), ["components", "schemas", "Maybe", "nullable"]);
}

#[test]
fn test_petstore_counts_per_classification() {
    let (_, report) = scan("petstore.yaml");
    let counts = count_incompatibilities(&report.incompatibilities);
    let expected = [
        (Class::Security, 2),
        (Class::ParameterStyling, 9),
        (Class::DataValidation, 13),
        (Class::ExternalTranscodingSupport, 2),
        (Class::InvalidOperation, 2),
        (Class::InvalidDataState, 2),
        (Class::Inheritance, 4),
    ];
    for (classification, count) in expected {
        assert_eq!(
            counts.by_classification.get(&classification).copied().unwrap_or(0),
            count,
            "{classification}"
        );
    }
    assert_eq!(report.incompatibilities.len(), 34);
    assert!(report.has_failures());
}

#[test]
fn test_every_token_path_resolves() {
    for name in ["petstore.yaml", "scenario.yaml", "bookstore.yaml", "orders.yaml"] {
        let (source, report) = scan(name);
        let tree = search::parse_document(&source).unwrap();
        for incompatibility in &report.incompatibilities {
            let key = search::find_key(&tree, incompatibility.token_path())
                .unwrap_or_else(|e| panic!("{name}: {} ({e})", incompatibility.path_string()));
            assert_eq!(key.as_scalar(), incompatibility.token_path().last().map(String::as_str));
        }
    }
}

#[test]
fn test_detailed_report_from_file() {
    let config = ReportConfig {
        mode: ReportMode::Detailed,
        ..ReportConfig::default()
    };
    let report = openapi_grpc::report_file(fixture("scenario.yaml"), &config).unwrap();
    let CompatibilityReport::Detailed(detailed) = report else {
        panic!("expected a detailed report");
    };
    let positions: Vec<_> = detailed
        .incompatibilities
        .iter()
        .map(|d| (d.token.as_str(), d.line, d.column))
        .collect();
    assert_eq!(
        positions,
        vec![
            ("security", Some(5), Some(1)),
            ("head", Some(9), Some(5)),
            ("explode", Some(24), Some(11)),
        ]
    );
    assert!(detailed.incompatibilities.iter().all(|d| d.lookup_error.is_none()));
    assert!(detailed.incompatibilities[1].hint.contains("FAIL implies"));
}

#[test]
fn test_excluded_classifications_are_dropped() {
    let config = ReportConfig {
        except_classifications: vec![Class::Security, Class::ParameterStyling],
        ..ReportConfig::default()
    };
    let report = openapi_grpc::report_file(fixture("scenario.yaml"), &config).unwrap();
    let CompatibilityReport::Base(report) = report else {
        panic!("expected a base report");
    };
    assert_eq!(report.incompatibilities.len(), 1);
    assert_eq!(report.incompatibilities[0].classification(), Class::InvalidOperation);
}

#[test]
fn test_aggregation_is_idempotent_per_file() {
    let (_, petstore) = scan("petstore.yaml");
    let (_, scenario) = scan("scenario.yaml");

    let once = aggregate_reports([&petstore, &scenario]);
    let again = aggregate_reports([&petstore, &scenario, &petstore]);
    assert_eq!(once.analysis_per_incompatibility, again.analysis_per_incompatibility);
    assert_eq!(once.count_for(Class::DataValidation, "petstore.yaml"), 13);
    assert_eq!(once.count_for(Class::InvalidOperation, "scenario.yaml"), 1);
    assert_eq!(once.open_api_files, 2);
    assert_eq!(once.incompatible_files, 2);
}

#[test]
fn test_report_serializes_to_json() {
    let (_, report) = scan("scenario.yaml");
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["report_identifier"], "scenario.yaml");
    assert_eq!(json["incompatibilities"][1]["classification"], "InvalidOperation");
    assert_eq!(json["incompatibilities"][1]["severity"], "FAIL");
    assert_eq!(json["incompatibilities"][1]["token_path"][2], "head");
}
