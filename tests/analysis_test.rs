use openapi_grpc::IncompatibilityClassification as Class;
use openapi_grpc::incompat;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn api_set() -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in ["petstore.yaml", "scenario.yaml"] {
        fs::copy(fixture(name), dir.path().join(name)).unwrap();
    }
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::copy(fixture("bookstore.yaml"), dir.path().join("nested/bookstore.yaml")).unwrap();
    fs::write(dir.path().join("broken.yaml"), "openapi: 3.0.0\npaths: [unterminated\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "not an api description\n").unwrap();
    fs::write(dir.path().join("swagger.yaml"), "swagger: '2.0'\ninfo: {title: Old, version: '1'}\n").unwrap();
    dir
}

fn key(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

#[test]
fn test_only_valid_documents_are_counted() {
    let dir = api_set();
    let analysis = incompat::analyze_directory(dir.path(), &[]).unwrap();
    assert_eq!(analysis.open_api_files, 3);
    // bookstore has no FAIL incompatibilities
    assert_eq!(analysis.incompatible_files, 2);
}

#[test]
fn test_per_file_counts_match_reports() {
    let dir = api_set();
    let analysis = incompat::analyze_directory(dir.path(), &[]).unwrap();
    for name in ["petstore.yaml", "scenario.yaml", "nested/bookstore.yaml"] {
        let path = dir.path().join(name);
        let report = incompat::scan_file(&path, &[]).unwrap();
        for classification in Class::all() {
            let expected = report
                .incompatibilities
                .iter()
                .filter(|i| i.classification() == classification)
                .count() as u32;
            assert_eq!(analysis.count_for(classification, &key(dir.path(), name)), expected, "{name} {classification}");
        }
    }
    assert_eq!(analysis.count_for(Class::Inheritance, &key(dir.path(), "petstore.yaml")), 4);
    assert_eq!(analysis.count_for(Class::Security, &key(dir.path(), "broken.yaml")), 0);
}

#[test]
fn test_excluded_classifications_are_not_aggregated() {
    let dir = api_set();
    let analysis = incompat::analyze_directory(dir.path(), &[Class::Security]).unwrap();
    assert!(!analysis.analysis_per_incompatibility.contains_key(&Class::Security));
    assert!(analysis.analysis_per_incompatibility.contains_key(&Class::DataValidation));
}

#[test]
fn test_analysis_requires_a_directory() {
    assert!(incompat::analyze_directory(fixture("petstore.yaml"), &[]).is_err());
}

#[test]
fn test_analysis_serializes_to_json() {
    let dir = api_set();
    let analysis = incompat::analyze_directory(dir.path(), &[]).unwrap();
    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["open_api_files"], 3);
    let petstore = key(dir.path(), "petstore.yaml");
    assert_eq!(json["analysis_per_incompatibility"]["DataValidation"]["count_per_file"][petstore.as_str()], 13);
}
