//! Static well-known dependencies and import selection
//!
//! Every generated set carries `google/protobuf/empty.proto`,
//! `google/protobuf/descriptor.proto` and `google/api/annotations.proto` ahead
//! of the generated files. The annotations file is built from an embedded
//! copy of `google/api/http.proto` and patched: renamed, given the `http`
//! extension on `MethodOptions`, and made to import `descriptor.proto`.

use crate::error::GenerationError;
use crate::generator::http::HTTP_EXTENSION_FIELD_NUMBER;
use anyhow::Context;
use const_format::concatcp;
use protobuf::descriptor::field_descriptor_proto::{Label, Type};
use protobuf::descriptor::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use protobuf_parse::Parser;
use std::collections::HashSet;

const GOOGLE_PROTOBUF_DIR: &str = "google/protobuf/";
const GOOGLE_API_DIR: &str = "google/api/";

pub const EMPTY_PROTO: &str = concatcp!(GOOGLE_PROTOBUF_DIR, "empty.proto");
pub const DESCRIPTOR_PROTO: &str = concatcp!(GOOGLE_PROTOBUF_DIR, "descriptor.proto");
pub const HTTP_PROTO: &str = concatcp!(GOOGLE_API_DIR, "http.proto");
pub const ANNOTATIONS_PROTO: &str = concatcp!(GOOGLE_API_DIR, "annotations.proto");

/// Message used for methods without parameters or responses.
pub const EMPTY_MESSAGE: &str = ".google.protobuf.Empty";

const HTTP_PROTO_SOURCE: &str = r#"
syntax = "proto3";

package google.api;

message Http {
  repeated HttpRule rules = 1;
  bool fully_decode_reserved_expansion = 2;
}

message HttpRule {
  string selector = 1;
  oneof pattern {
    string get = 2;
    string put = 3;
    string post = 4;
    string delete = 5;
    string patch = 6;
    CustomHttpPattern custom = 8;
  }
  string body = 7;
  string response_body = 12;
  repeated HttpRule additional_bindings = 11;
}

message CustomHttpPattern {
  string kind = 1;
  string path = 2;
}
"#;

/// Build the static dependency files in set order.
pub fn build_static_dependencies() -> Result<Vec<FileDescriptorProto>, GenerationError> {
    let annotations = annotations_descriptor().map_err(|e| GenerationError::StaticDependency {
        name: ANNOTATIONS_PROTO.to_string(),
        message: format!("{e:#}"),
    })?;

    Ok(vec![
        protobuf::well_known_types::empty::file_descriptor().proto().clone(),
        protobuf::descriptor::file_descriptor().proto().clone(),
        annotations,
    ])
}

fn annotations_descriptor() -> anyhow::Result<FileDescriptorProto> {
    // The parser works with the filesystem, so the embedded source is written
    // into a temporary include directory first.
    let temp_dir = tempfile::tempdir().context("Failed to create temp directory")?;
    let http_path = temp_dir.path().join(HTTP_PROTO);
    if let Some(parent) = http_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create google/api directory")?;
    }
    std::fs::write(&http_path, HTTP_PROTO_SOURCE).context("Failed to write http.proto")?;

    let parsed = Parser::new()
        .pure()
        .include(temp_dir.path())
        .input(&http_path)
        .file_descriptor_set()
        .context("Failed to parse embedded http.proto")?;

    let mut descriptor = parsed
        .file
        .into_iter()
        .find(|d| d.name() == HTTP_PROTO)
        .context("Parsed set does not contain http.proto")?;

    let mut extension = FieldDescriptorProto::new();
    extension.set_name("http".to_string());
    extension.set_number(HTTP_EXTENSION_FIELD_NUMBER as i32);
    extension.set_label(Label::LABEL_OPTIONAL);
    extension.set_type(Type::TYPE_MESSAGE);
    extension.set_type_name(".google.api.HttpRule".to_string());
    extension.set_extendee(".google.protobuf.MethodOptions".to_string());

    descriptor.set_name(ANNOTATIONS_PROTO.to_string());
    descriptor.extension.push(extension);
    descriptor.dependency.push(DESCRIPTOR_PROTO.to_string());
    Ok(descriptor)
}

/// Fully qualified names (without leading dot) of every message and enum in `file`.
pub fn defined_names(file: &FileDescriptorProto) -> HashSet<String> {
    fn visit(prefix: &str, message: &DescriptorProto, out: &mut HashSet<String>) {
        let name = format!("{prefix}.{}", message.name());
        for nested in &message.nested_type {
            visit(&name, nested, out);
        }
        for enum_type in &message.enum_type {
            out.insert(format!("{name}.{}", enum_type.name()));
        }
        out.insert(name);
    }

    let mut names = HashSet::new();
    let package = file.package();
    for message in &file.message_type {
        visit(package, message, &mut names);
    }
    for enum_type in &file.enum_type {
        names.insert(format!("{package}.{}", enum_type.name()));
    }
    names
}

/// Type names `file` refers to from fields and methods, without leading dot.
pub fn referenced_names(file: &FileDescriptorProto) -> HashSet<String> {
    fn visit(message: &DescriptorProto, out: &mut HashSet<String>) {
        for field in &message.field {
            if field.has_type_name() {
                out.insert(field.type_name().trim_start_matches('.').to_string());
            }
        }
        for nested in &message.nested_type {
            visit(nested, out);
        }
    }

    let mut names = HashSet::new();
    for message in &file.message_type {
        visit(message, &mut names);
    }
    for service in &file.service {
        for method in &service.method {
            names.insert(method.input_type().trim_start_matches('.').to_string());
            names.insert(method.output_type().trim_start_matches('.').to_string());
        }
    }
    names
}

/// Names of the files in `available` that `primary` actually imports, sorted.
///
/// A file is imported when it defines a type `primary` refers to;
/// annotations is imported when any method carries an HTTP rule.
pub fn used_dependencies(primary: &FileDescriptorProto, available: &[FileDescriptorProto]) -> Vec<String> {
    let referenced = referenced_names(primary);
    let uses_http_rule = primary.service.iter().flat_map(|s| &s.method).any(|m| {
        m.options
            .as_ref()
            .is_some_and(|o| o.special_fields.unknown_fields().get(HTTP_EXTENSION_FIELD_NUMBER).is_some())
    });

    let mut dependencies: Vec<String> = available
        .iter()
        .filter(|file| file.name() != primary.name())
        .filter(|file| {
            (uses_http_rule && file.name() == ANNOTATIONS_PROTO)
                || defined_names(file).iter().any(|name| referenced.contains(name))
        })
        .map(|file| file.name().to_string())
        .collect();
    dependencies.sort();
    dependencies.dedup();
    dependencies
}
