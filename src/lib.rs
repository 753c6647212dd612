pub mod checker;
pub mod config;
pub mod error;
pub mod generator;
pub mod incompat;
pub mod naming;
pub mod openapi;
pub mod search;
pub mod surface;

pub use checker::{CheckerMessage, GrpcChecker, MessageLevel};
pub use config::{Config, GenerateConfig, ReportConfig, ReportMode};
pub use error::{GenerationError, SearchError};
pub use generator::{GeneratedFiles, GenerationSession, descriptor_fingerprint};
pub use incompat::{CompatibilityReport, IncompatibilityClassification, IncompatibilityReport, Severity};
pub use openapi::Document;

use anyhow::Context;
use generator::FileReferenceLoader;
use std::path::Path;
use tracing::{info, warn};

/// Generates the descriptor set for the OpenAPI document at `path`.
///
/// The package is taken from `config` or derived from the file name. External
/// `$ref`s are resolved relative to the document's directory, each in a
/// fresh [`GenerationSession`].
///
/// # Arguments
///
/// * `path` - Path of the OpenAPI v3 document (YAML or JSON).
/// * `config` - Package override and symbolic reference handling.
///
/// # Returns
///
/// The generated files, or an error if the document cannot be parsed or
/// generation fails structurally (for instance a reference cycle).
pub fn generate_descriptors<P: AsRef<Path>>(path: P, config: &GenerateConfig) -> anyhow::Result<GeneratedFiles> {
    let path = path.as_ref();

    // 1. Parse the document and derive the names used for it.
    let document = Document::from_file(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Input path has no file name")?;
    let package = match &config.package {
        Some(package) => package.clone(),
        None => naming::package_name_from_path(&file_name)
            .with_context(|| format!("Cannot derive a package name from '{file_name}'"))?,
    };

    // 2. Report what the generator will ignore.
    for message in GrpcChecker::new(&document).run() {
        match message.level {
            MessageLevel::Warning => warn!(code = %message.code, keys = %message.keys.join("/"), "{}", message.text),
            MessageLevel::Info => info!(code = %message.code, keys = %message.keys.join("/"), "{}", message.text),
        }
    }

    // 3. Flatten into a surface model and generate.
    let model = surface::build_surface_model(&document, &file_name);
    let mut session = GenerationSession::new();
    if !config.resolve_symbolic_references {
        session = session.without_symbolic_references();
    }
    let generated = session
        .generate(&model, &package, &FileReferenceLoader::for_document(path))
        .with_context(|| format!("Failed to generate descriptors for '{}'", path.display()))?;

    info!(file = %path.display(), package = %package, "generated descriptors");
    Ok(generated)
}

/// Generates a reproducibility fingerprint for the OpenAPI document at `path`.
///
/// The fingerprint is a SHA-256 hash of the serialized descriptor set, so two
/// runs over the same input produce the same value.
pub fn generate_fingerprint<P: AsRef<Path>>(path: P, config: &GenerateConfig) -> anyhow::Result<String> {
    let generated = generate_descriptors(path, config)?;
    Ok(descriptor_fingerprint(&generated.descriptor_set)?)
}

/// Scans the document at `path` for incompatibilities.
///
/// Classifications listed in the config are dropped. A detailed report adds
/// the source position and hint of every incompatibility.
pub fn report_file<P: AsRef<Path>>(path: P, config: &ReportConfig) -> anyhow::Result<CompatibilityReport> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let document =
        Document::from_yaml_str(&source).with_context(|| format!("Invalid document '{}'", path.display()))?;

    let report = incompat::scan_document(&document, &path.to_string_lossy())
        .without_classifications(&config.except_classifications);

    match config.mode {
        ReportMode::Base => Ok(CompatibilityReport::Base(report)),
        ReportMode::Detailed => {
            let detailed = incompat::detailed_report(&report, &source)
                .with_context(|| format!("Failed to locate incompatibilities in '{}'", path.display()))?;
            Ok(CompatibilityReport::Detailed(detailed))
        }
    }
}
