//! Service descriptor with HTTP-transcoded methods

use crate::error::GenerationError;
use crate::generator::GenerationSession;
use crate::generator::dependencies::EMPTY_MESSAGE;
use crate::generator::http::{HttpPattern, HttpRule};
use crate::naming;
use crate::surface::{Position, SurfaceMethod, SurfaceModel};
use protobuf::MessageField;
use protobuf::descriptor::{DescriptorProto, MethodDescriptorProto, ServiceDescriptorProto};
use std::collections::HashSet;
use tracing::warn;

/// Build the single service of a generated file.
///
/// The service is named after the package and renamed if that collides with
/// one of `messages`.
pub fn build_service_descriptor(
    model: &SurfaceModel,
    package: &str,
    messages: &[DescriptorProto],
    session: &GenerationSession,
) -> Result<ServiceDescriptorProto, GenerationError> {
    let taken: HashSet<String> = messages.iter().map(|m| m.name().to_string()).collect();

    let mut service = ServiceDescriptorProto::new();
    service.set_name(naming::find_valid_service_name(&naming::title_case(package), &taken));
    for method in &model.methods {
        service.method.push(build_method(method, model, package, session)?);
    }
    Ok(service)
}

fn build_method(
    method: &SurfaceMethod,
    model: &SurfaceModel,
    package: &str,
    session: &GenerationSession,
) -> Result<MethodDescriptorProto, GenerationError> {
    let message_name = |type_name: &Option<String>| match type_name {
        Some(name) => session
            .qualified_name(name)
            .map(str::to_string)
            .unwrap_or_else(|| format!(".{package}.{name}")),
        None => EMPTY_MESSAGE.to_string(),
    };

    let mut descriptor = MethodDescriptorProto::new();
    descriptor.set_name(method.handler_name.clone());
    descriptor.set_input_type(message_name(&method.parameters_type_name));
    descriptor.set_output_type(message_name(&method.responses_type_name));

    match HttpPattern::for_verb(&method.verb, &method.path) {
        Some(pattern) => {
            let rule = HttpRule::new(pattern, request_body_field(method, model));
            descriptor.options = MessageField::some(rule.to_method_options()?);
        }
        None => warn!(
            method = %method.handler_name,
            verb = %method.verb,
            "HTTP verb cannot be transcoded, method has no HTTP rule"
        ),
    }
    Ok(descriptor)
}

/// Name of the parameter field bound to the request body, or empty.
fn request_body_field(method: &SurfaceMethod, model: &SurfaceModel) -> String {
    method
        .parameters_type_name
        .as_deref()
        .and_then(|name| model.type_by_name(name))
        .and_then(|t| t.fields.iter().find(|f| f.position == Position::Body))
        .map(|f| f.field_name.clone())
        .unwrap_or_default()
}
