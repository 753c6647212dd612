//! Symbolic references: `$ref`s into other OpenAPI documents
//!
//! Each distinct referenced document is loaded through a [`ReferenceLoader`],
//! flattened and generated recursively into its own file under a package
//! named after the document. Results are cached in the session so a document
//! is generated once no matter how many times it is referenced, and a
//! reference back to a document still being generated is a cycle.

use crate::error::GenerationError;
use crate::generator::{GeneratedFiles, GenerationSession};
use crate::openapi::Document;
use crate::surface::{SurfaceModel, build_surface_model};
use anyhow::bail;
use protobuf::descriptor::{FileDescriptorProto, FileDescriptorSet};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of surface models for referenced documents.
pub trait ReferenceLoader {
    /// Load and flatten the document named by `reference` (fragment already removed).
    fn load(&self, reference: &str) -> anyhow::Result<SurfaceModel>;
}

/// Loads referenced documents from disk, relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileReferenceLoader {
    base_dir: PathBuf,
}

impl FileReferenceLoader {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Loader resolving references relative to the directory of `document`.
    pub fn for_document<P: AsRef<Path>>(document: P) -> Self {
        let base_dir = document
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(base_dir)
    }
}

impl ReferenceLoader for FileReferenceLoader {
    fn load(&self, reference: &str) -> anyhow::Result<SurfaceModel> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            bail!("remote references are not supported: {reference}");
        }
        let document = Document::from_file(self.base_dir.join(reference))?;
        let mut model = build_surface_model(&document, reference);

        // Nested references are written relative to the referenced document.
        if let Some(parent) = Path::new(reference).parent().filter(|p| !p.as_os_str().is_empty()) {
            for nested in &mut model.symbolic_references {
                if !nested.contains("://") && !Path::new(nested.as_str()).is_absolute() {
                    *nested = parent.join(nested.as_str()).to_string_lossy().into_owned();
                }
            }
        }
        Ok(model)
    }
}

/// Serves pre-built surface models keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceLoader {
    models: HashMap<String, SurfaceModel>,
}

impl InMemoryReferenceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, reference: impl Into<String>, model: SurfaceModel) -> Self {
        self.models.insert(reference.into(), model);
        self
    }
}

impl ReferenceLoader for InMemoryReferenceLoader {
    fn load(&self, reference: &str) -> anyhow::Result<SurfaceModel> {
        match self.models.get(reference) {
            Some(model) => Ok(model.clone()),
            None => bail!("no document registered for reference '{reference}'"),
        }
    }
}

/// Strip `#fragment` suffixes and drop duplicates, keeping first-seen order.
pub fn trim_and_deduplicate(references: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for reference in references {
        let trimmed = reference.split('#').next().unwrap_or(reference);
        if !trimmed.is_empty() && !out.iter().any(|r| r == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Files generated for the symbolic references of one model
#[derive(Debug, Default)]
pub(crate) struct ResolvedReferences {
    /// Generated files in dependency order, each name once
    pub files: Vec<FileDescriptorProto>,
    /// Complete set of every reference generated by this call
    pub sets: Vec<FileDescriptorSet>,
}

impl ResolvedReferences {
    fn add_files(&mut self, files: &[FileDescriptorProto]) {
        for file in files {
            if !self.files.iter().any(|f| f.name() == file.name()) {
                self.files.push(file.clone());
            }
        }
    }
}

pub(crate) fn resolve_symbolic_references(
    session: &mut GenerationSession,
    model: &SurfaceModel,
    loader: &dyn ReferenceLoader,
) -> Result<ResolvedReferences, GenerationError> {
    let mut resolved = ResolvedReferences::default();

    for reference in trim_and_deduplicate(&model.symbolic_references) {
        // A document naming itself refers to its own, local types.
        if session.in_progress.last() == Some(&reference) {
            debug!(%reference, "symbolic reference to the current document");
            continue;
        }
        if let Some(start) = session.in_progress.iter().position(|r| *r == reference) {
            let mut chain = session.in_progress[start..].to_vec();
            chain.push(reference);
            return Err(GenerationError::CyclicReference { chain });
        }

        if let Some(files) = session.generated_references.get(&reference) {
            debug!(%reference, "symbolic reference already generated");
            resolved.add_files(files);
            continue;
        }

        let referenced = loader.load(&reference).map_err(|e| GenerationError::ReferenceLoad {
            reference: reference.clone(),
            message: format!("{e:#}"),
        })?;
        let package = session.reference_package(&reference)?;

        let GeneratedFiles {
            descriptor_set,
            symbolic_sets,
        } = session.generate_as(Some(reference.clone()), &referenced, &package, loader)?;

        let files: Vec<FileDescriptorProto> = descriptor_set
            .file
            .iter()
            .filter(|f| !session.is_static_dependency(f.name()))
            .cloned()
            .collect();
        resolved.add_files(&files);
        session.generated_references.insert(reference, files);

        resolved.sets.push(descriptor_set);
        resolved.sets.extend(symbolic_sets);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_and_deduplicate() {
        let references = vec![
            "common.yaml#/components/schemas/A".to_string(),
            "common.yaml#/components/schemas/B".to_string(),
            "other.yaml".to_string(),
            "common.yaml".to_string(),
        ];
        assert_eq!(trim_and_deduplicate(&references), vec!["common.yaml", "other.yaml"]);
    }

    #[test]
    fn test_in_memory_loader_reports_missing_documents() {
        let loader = InMemoryReferenceLoader::new().with_model("a.yaml", SurfaceModel::default());
        assert!(loader.load("a.yaml").is_ok());
        assert!(loader.load("b.yaml").is_err());
    }
}
