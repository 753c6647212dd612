//! Descriptor set generation from surface models
//!
//! A [`GenerationSession`] owns all state that must be shared while one
//! document and its symbolic references are generated: the registry of
//! emitted messages, the cache of generated references and the chain of
//! documents currently being generated. Independent runs use independent
//! sessions.
//!
//! The assembled [`FileDescriptorSet`] is ordered: static dependencies,
//! then files generated for symbolic references, then the primary file last.

pub mod dependencies;
pub mod http;
pub mod messages;
pub mod references;
pub mod service;

pub use references::{FileReferenceLoader, InMemoryReferenceLoader, ReferenceLoader};

use crate::error::GenerationError;
use crate::naming;
use crate::surface::SurfaceModel;
use protobuf::descriptor::source_code_info::Location;
use protobuf::descriptor::{FileDescriptorProto, FileDescriptorSet, SourceCodeInfo};
use protobuf::{Message, MessageField};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info};

// Field numbers inside FileDescriptorProto / ServiceDescriptorProto used for
// source locations.
const MESSAGE_TYPE_FIELD: i32 = 4;
const SERVICE_FIELD: i32 = 6;
const METHOD_FIELD: i32 = 2;

/// Output of one generation run
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    /// Static dependencies, referenced files and the primary file (last)
    pub descriptor_set: FileDescriptorSet,
    /// Complete sets of every referenced document, for rendering on their own
    pub symbolic_sets: Vec<FileDescriptorSet>,
}

impl GeneratedFiles {
    /// The file meant to be rendered.
    pub fn primary(&self) -> Option<&FileDescriptorProto> {
        self.descriptor_set.file.last()
    }
}

/// State of one generation run
#[derive(Debug, Default)]
pub struct GenerationSession {
    /// Native type name -> fully qualified message name (leading dot), append-only
    generated_messages: HashMap<String, String>,
    /// Reference -> non-static files generated for it
    generated_references: HashMap<String, Vec<FileDescriptorProto>>,
    /// Documents currently being generated, outermost first
    in_progress: Vec<String>,
    /// Package -> document it was assigned to
    packages: HashMap<String, String>,
    static_dependencies: Option<Vec<FileDescriptorProto>>,
    skip_symbolic_references: bool,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable loading of referenced documents; their types are still
    /// referenced by name.
    pub fn without_symbolic_references(mut self) -> Self {
        self.skip_symbolic_references = true;
        self
    }

    /// Record a generated message. The first registration of a name wins.
    pub fn register_message(&mut self, native_type: &str, qualified_name: String) {
        self.generated_messages
            .entry(native_type.to_string())
            .or_insert(qualified_name);
    }

    pub fn qualified_name(&self, native_type: &str) -> Option<&str> {
        self.generated_messages.get(native_type).map(String::as_str)
    }

    pub fn generated_messages(&self) -> &HashMap<String, String> {
        &self.generated_messages
    }

    /// References generated so far in this session.
    pub fn generated_references(&self) -> impl Iterator<Item = &str> {
        self.generated_references.keys().map(String::as_str)
    }

    /// Package for a referenced document, distinct from every package already
    /// assigned to another document in this session.
    fn reference_package(&mut self, reference: &str) -> Result<String, GenerationError> {
        let base = naming::package_name_from_path(reference)
            .ok_or_else(|| GenerationError::InvalidPackageName(reference.to_string()))?;
        let mut package = base.clone();
        let mut suffix = 1;
        while self.packages.get(&package).is_some_and(|owner| owner != reference) {
            package = format!("{base}{suffix}");
            suffix += 1;
        }
        self.packages.insert(package.clone(), reference.to_string());
        Ok(package)
    }

    fn static_dependencies(&mut self) -> Result<Vec<FileDescriptorProto>, GenerationError> {
        if self.static_dependencies.is_none() {
            self.static_dependencies = Some(dependencies::build_static_dependencies()?);
        }
        Ok(self.static_dependencies.clone().unwrap_or_default())
    }

    fn is_static_dependency(&self, name: &str) -> bool {
        self.static_dependencies
            .as_ref()
            .is_some_and(|files| files.iter().any(|f| f.name() == name))
    }

    /// Generate the descriptor set for `model` under `package`.
    ///
    /// Symbolic references are loaded through `loader` and generated first.
    pub fn generate(
        &mut self,
        model: &SurfaceModel,
        package: &str,
        loader: &dyn ReferenceLoader,
    ) -> Result<GeneratedFiles, GenerationError> {
        let key = (!model.name.is_empty()).then(|| model.name.clone());
        self.generate_as(key, model, package, loader)
    }

    pub(crate) fn generate_as(
        &mut self,
        key: Option<String>,
        model: &SurfaceModel,
        package: &str,
        loader: &dyn ReferenceLoader,
    ) -> Result<GeneratedFiles, GenerationError> {
        let tracked = key.is_some();
        self.packages
            .entry(package.to_string())
            .or_insert_with(|| key.clone().unwrap_or_default());
        if let Some(key) = key {
            self.in_progress.push(key);
        }
        let result = self.assemble(model, package, loader);
        if tracked {
            self.in_progress.pop();
        }
        result
    }

    fn assemble(
        &mut self,
        model: &SurfaceModel,
        package: &str,
        loader: &dyn ReferenceLoader,
    ) -> Result<GeneratedFiles, GenerationError> {
        if !naming::is_valid_package_name(package) {
            return Err(GenerationError::InvalidPackageName(package.to_string()));
        }

        let static_files = self.static_dependencies()?;
        let resolved = if self.skip_symbolic_references {
            debug!(count = model.symbolic_references.len(), "skipping symbolic references");
            references::ResolvedReferences::default()
        } else {
            references::resolve_symbolic_references(self, model, loader)?
        };

        let messages = messages::build_message_descriptors(model, package, self);
        let service = service::build_service_descriptor(model, package, &messages, self)?;

        let mut primary = FileDescriptorProto::new();
        primary.set_name(format!("{package}.proto"));
        primary.set_package(package.to_string());
        primary.set_syntax("proto3".to_string());
        primary.message_type = messages;
        primary.service.push(service);
        primary.source_code_info = MessageField::some(source_code_info(model));

        let mut files = static_files;
        files.extend(resolved.files);
        primary.dependency = dependencies::used_dependencies(&primary, &files);
        files.push(primary);

        info!(
            package,
            files = files.len(),
            messages = model.types.len(),
            methods = model.methods.len(),
            "generated descriptor set"
        );

        let mut descriptor_set = FileDescriptorSet::new();
        descriptor_set.file = files;
        Ok(GeneratedFiles {
            descriptor_set,
            symbolic_sets: resolved.sets,
        })
    }
}

/// Leading comments from type and method descriptions.
fn source_code_info(model: &SurfaceModel) -> SourceCodeInfo {
    let mut info = SourceCodeInfo::new();
    let mut comment = |path: Vec<i32>, text: &str| {
        if text.trim().is_empty() {
            return;
        }
        let mut location = Location::new();
        location.path = path;
        location.span = vec![0, 0, 0];
        location.set_leading_comments(format!(" {}\n", text.trim()));
        info.location.push(location);
    };

    for (index, surface_type) in model.types.iter().enumerate() {
        comment(vec![MESSAGE_TYPE_FIELD, index as i32], &surface_type.description);
    }
    for (index, method) in model.methods.iter().enumerate() {
        comment(vec![SERVICE_FIELD, 0, METHOD_FIELD, index as i32], &method.description);
    }
    info
}

/// SHA-256 of the serialized set, hex encoded.
pub fn descriptor_fingerprint(set: &FileDescriptorSet) -> Result<String, GenerationError> {
    let bytes = set.write_to_bytes()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{SurfaceMethod, SurfaceType};

    #[test]
    fn test_primary_file_is_last_and_imports_are_minimal() {
        let model = SurfaceModel {
            name: "ping.yaml".to_string(),
            types: vec![SurfaceType {
                name: "Pong".to_string(),
                type_name: "Pong".to_string(),
                description: "Reply to a ping.".to_string(),
                ..SurfaceType::default()
            }],
            methods: vec![SurfaceMethod {
                name: "ping".to_string(),
                handler_name: "Ping".to_string(),
                verb: "GET".to_string(),
                path: "/ping".to_string(),
                responses_type_name: Some("Pong".to_string()),
                ..SurfaceMethod::default()
            }],
            ..SurfaceModel::default()
        };
        let mut session = GenerationSession::new();
        let generated = session.generate(&model, "ping", &InMemoryReferenceLoader::new()).unwrap();

        let primary = generated.primary().unwrap();
        assert_eq!(primary.name(), "ping.proto");
        assert_eq!(primary.syntax(), "proto3");
        assert_eq!(
            primary.dependency,
            vec![dependencies::ANNOTATIONS_PROTO.to_string(), dependencies::EMPTY_PROTO.to_string()]
        );
        assert_eq!(primary.service[0].method[0].output_type(), ".ping.Pong");
        assert_eq!(
            primary.source_code_info.location[0].leading_comments(),
            " Reply to a ping.\n"
        );
    }

    #[test]
    fn test_invalid_package_is_rejected() {
        let mut session = GenerationSession::new();
        let result = session.generate(&SurfaceModel::default(), "9lives", &InMemoryReferenceLoader::new());
        assert!(matches!(result, Err(GenerationError::InvalidPackageName(_))));
    }
}
