//! Message and enum descriptors from surface types

use crate::generator::GenerationSession;
use crate::naming;
use crate::surface::{ContentKind, FieldKind, Position, SurfaceField, SurfaceModel, SurfaceType};
use protobuf::MessageField;
use protobuf::descriptor::field_descriptor_proto::{Label, Type};
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto, MessageOptions,
    OneofDescriptorProto,
};
use tracing::{debug, warn};

const MAP_PREFIX: &str = "map[string]";

/// Oneof holding the alternatives of a `oneOf` type.
pub const ONEOF_NAME: &str = "variant";

/// Proto scalar keyword to field type.
pub fn scalar_type(native_type: &str) -> Option<Type> {
    let field_type = match native_type {
        "double" => Type::TYPE_DOUBLE,
        "float" => Type::TYPE_FLOAT,
        "int64" => Type::TYPE_INT64,
        "uint64" => Type::TYPE_UINT64,
        "int32" => Type::TYPE_INT32,
        "fixed64" => Type::TYPE_FIXED64,
        "fixed32" => Type::TYPE_FIXED32,
        "bool" => Type::TYPE_BOOL,
        "string" => Type::TYPE_STRING,
        "bytes" => Type::TYPE_BYTES,
        "uint32" => Type::TYPE_UINT32,
        "sfixed32" => Type::TYPE_SFIXED32,
        "sfixed64" => Type::TYPE_SFIXED64,
        "sint32" => Type::TYPE_SINT32,
        "sint64" => Type::TYPE_SINT64,
        _ => return None,
    };
    Some(field_type)
}

/// Scalar if known, enum if literals are declared, message otherwise.
pub fn field_type(native_type: &str, enum_values: Option<&[String]>) -> Type {
    match scalar_type(native_type) {
        Some(scalar) => scalar,
        None if enum_values.is_some() => Type::TYPE_ENUM,
        None => Type::TYPE_MESSAGE,
    }
}

pub fn field_label(field: &SurfaceField) -> Label {
    if field.kind == FieldKind::Array || field.native_type.contains("map") {
        Label::LABEL_REPEATED
    } else {
        Label::LABEL_OPTIONAL
    }
}

fn is_map(field: &SurfaceField) -> bool {
    field.kind == FieldKind::Map || field.native_type.starts_with(MAP_PREFIX)
}

/// Build one message per surface type and register each in the session.
pub fn build_message_descriptors(
    model: &SurfaceModel,
    package: &str,
    session: &mut GenerationSession,
) -> Vec<DescriptorProto> {
    model
        .types
        .iter()
        .map(|surface_type| {
            let message = build_message(surface_type, package, session);
            session.register_message(&surface_type.type_name, format!(".{package}.{}", surface_type.type_name));
            message
        })
        .collect()
}

fn build_message(surface_type: &SurfaceType, package: &str, session: &GenerationSession) -> DescriptorProto {
    let mut message = DescriptorProto::new();
    message.set_name(surface_type.type_name.clone());

    let grouped = surface_type.content_kind == ContentKind::OneOf;
    if grouped {
        let mut oneof = OneofDescriptorProto::new();
        oneof.set_name(ONEOF_NAME.to_string());
        message.oneof_decl.push(oneof);
    }

    for (index, field) in surface_type.fields.iter().enumerate() {
        if field.native_type.contains("map[string][]") {
            debug!(
                message = %surface_type.type_name,
                field = %field.field_name,
                "map of arrays is not supported, skipping field"
            );
            continue;
        }
        if surface_type.is_request_parameters {
            validate_request_parameter(field);
        }

        let mut descriptor = FieldDescriptorProto::new();
        descriptor.set_name(field.field_name.clone());
        descriptor.set_number(index as i32 + 1);
        descriptor.set_label(field_label(field));

        if is_map(field) {
            let entry = build_map_entry(field, &mut message, package, session);
            descriptor.set_type(Type::TYPE_MESSAGE);
            descriptor.set_type_name(format!(".{package}.{}.{}", message.name(), entry.name()));
            message.nested_type.push(entry);
        } else {
            let enum_values = field.enum_values.as_deref();
            let field_type = field_type(&field.native_type, enum_values);
            descriptor.set_type(field_type);
            if let Some(type_name) =
                resolve_type_name(&field.native_type, field_type, package, &surface_type.type_name, session)
            {
                descriptor.set_type_name(type_name);
            }
            if let (Type::TYPE_ENUM, Some(values)) = (field_type, enum_values) {
                push_enum(&mut message, &field.native_type, values);
            }
        }

        if grouped && descriptor.label() != Label::LABEL_REPEATED {
            descriptor.set_oneof_index(0);
        }
        message.field.push(descriptor);
    }

    message
}

/// Fully qualified type name for message and enum fields; `None` for scalars.
fn resolve_type_name(
    native_type: &str,
    field_type: Type,
    package: &str,
    message_name: &str,
    session: &GenerationSession,
) -> Option<String> {
    match field_type {
        Type::TYPE_MESSAGE => Some(
            session
                .qualified_name(native_type)
                .map(str::to_string)
                .unwrap_or_else(|| format!(".{package}.{native_type}")),
        ),
        Type::TYPE_ENUM => Some(format!(".{package}.{message_name}.{native_type}")),
        _ => None,
    }
}

/// Nested `<Field>Entry` message with a string key and typed value.
fn build_map_entry(
    field: &SurfaceField,
    message: &mut DescriptorProto,
    package: &str,
    session: &GenerationSession,
) -> DescriptorProto {
    let value_type_name = field.native_type.strip_prefix(MAP_PREFIX).unwrap_or(&field.native_type);
    let enum_values = field.enum_values.as_deref();
    let value_type = field_type(value_type_name, enum_values);

    let mut key = FieldDescriptorProto::new();
    key.set_name("key".to_string());
    key.set_number(1);
    key.set_label(Label::LABEL_OPTIONAL);
    key.set_type(Type::TYPE_STRING);

    let mut value = FieldDescriptorProto::new();
    value.set_name("value".to_string());
    value.set_number(2);
    value.set_label(Label::LABEL_OPTIONAL);
    value.set_type(value_type);
    if let Some(type_name) = resolve_type_name(value_type_name, value_type, package, message.name(), session) {
        value.set_type_name(type_name);
    }
    if let (Type::TYPE_ENUM, Some(values)) = (value_type, enum_values) {
        push_enum(message, value_type_name, values);
    }

    let mut options = MessageOptions::new();
    options.set_map_entry(true);

    let mut entry = DescriptorProto::new();
    entry.set_name(format!("{}Entry", naming::to_camel_case(&field.field_name)));
    entry.field.push(key);
    entry.field.push(value);
    entry.options = MessageField::some(options);
    entry
}

/// Add a nested enum unless one with the same name already exists.
fn push_enum(message: &mut DescriptorProto, name: &str, literals: &[String]) {
    if message.enum_type.iter().any(|e| e.name() == name) {
        return;
    }
    let mut descriptor = EnumDescriptorProto::new();
    descriptor.set_name(name.to_string());
    for (number, literal) in literals.iter().enumerate() {
        let mut value = EnumValueDescriptorProto::new();
        value.set_name(naming::enum_value_name(literal));
        value.set_number(number as i32);
        descriptor.value.push(value);
    }
    message.enum_type.push(descriptor);
}

/// Log request parameters whose shape cannot be transcoded.
fn validate_request_parameter(field: &SurfaceField) {
    match field.position {
        Position::Path if field.kind != FieldKind::Scalar => {
            warn!(
                field = %field.name,
                native_type = %field.native_type,
                "path parameter must be a non-repeated scalar type"
            );
        }
        Position::Query => {
            let valid = match field.kind {
                FieldKind::Scalar | FieldKind::Reference => true,
                FieldKind::Array => scalar_type(&field.native_type).is_some(),
                FieldKind::Map => false,
            };
            if !valid {
                warn!(
                    field = %field.name,
                    native_type = %field.native_type,
                    "query parameter must be a scalar, repeated scalar or non-repeated message"
                );
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceField;

    fn field(name: &str, kind: FieldKind, native_type: &str) -> SurfaceField {
        SurfaceField {
            name: name.to_string(),
            field_name: name.to_string(),
            kind,
            native_type: native_type.to_string(),
            ..SurfaceField::default()
        }
    }

    fn model_with(fields: Vec<SurfaceField>, content_kind: ContentKind) -> SurfaceModel {
        SurfaceModel {
            name: "test.yaml".to_string(),
            types: vec![SurfaceType {
                name: "Item".to_string(),
                type_name: "Item".to_string(),
                content_kind,
                fields,
                ..SurfaceType::default()
            }],
            ..SurfaceModel::default()
        }
    }

    #[test]
    fn test_field_numbers_follow_declaration_order() {
        let model = model_with(
            vec![
                field("id", FieldKind::Scalar, "int64"),
                field("name", FieldKind::Scalar, "string"),
                field("tags", FieldKind::Array, "string"),
            ],
            ContentKind::Plain,
        );
        let mut session = GenerationSession::new();
        let messages = build_message_descriptors(&model, "shop", &mut session);
        let numbers: Vec<_> = messages[0].field.iter().map(|f| (f.name(), f.number())).collect();
        assert_eq!(numbers, vec![("id", 1), ("name", 2), ("tags", 3)]);
        assert_eq!(messages[0].field[2].label(), Label::LABEL_REPEATED);
        assert_eq!(session.qualified_name("Item"), Some(".shop.Item"));
    }

    #[test]
    fn test_map_value_type_is_stripped() {
        let model = model_with(vec![field("counts", FieldKind::Map, "map[string]int32")], ContentKind::Plain);
        let mut session = GenerationSession::new();
        let messages = build_message_descriptors(&model, "shop", &mut session);
        let message = &messages[0];

        let entry = &message.nested_type[0];
        assert_eq!(entry.name(), "CountsEntry");
        assert!(entry.options.map_entry());
        assert_eq!(entry.field[0].name(), "key");
        assert_eq!(entry.field[0].type_(), Type::TYPE_STRING);
        assert_eq!(entry.field[1].number(), 2);
        assert_eq!(entry.field[1].type_(), Type::TYPE_INT32);
        assert!(!entry.field[1].has_type_name());

        let counts = &message.field[0];
        assert_eq!(counts.label(), Label::LABEL_REPEATED);
        assert_eq!(counts.type_name(), ".shop.Item.CountsEntry");
    }

    #[test]
    fn test_map_of_arrays_is_skipped_without_renumbering() {
        let model = model_with(
            vec![
                field("matrix", FieldKind::Map, "map[string][]string"),
                field("name", FieldKind::Scalar, "string"),
            ],
            ContentKind::Plain,
        );
        let mut session = GenerationSession::new();
        let messages = build_message_descriptors(&model, "shop", &mut session);
        assert_eq!(messages[0].field.len(), 1);
        assert_eq!(messages[0].field[0].number(), 2);
    }

    #[test]
    fn test_enum_fields_get_nested_enum() {
        let mut status = field("status", FieldKind::Scalar, "Status");
        status.enum_values = Some(vec!["in-stock".to_string(), "3d".to_string()]);
        let model = model_with(vec![status], ContentKind::Plain);
        let mut session = GenerationSession::new();
        let messages = build_message_descriptors(&model, "shop", &mut session);

        let message = &messages[0];
        assert_eq!(message.field[0].type_(), Type::TYPE_ENUM);
        assert_eq!(message.field[0].type_name(), ".shop.Item.Status");
        let values: Vec<_> = message.enum_type[0].value.iter().map(|v| (v.name(), v.number())).collect();
        assert_eq!(values, vec![("IN_STOCK", 0), ("_3D", 1)]);
    }

    #[test]
    fn test_registry_names_are_reused() {
        let model = model_with(vec![field("owner", FieldKind::Reference, "Customer")], ContentKind::Plain);
        let mut session = GenerationSession::new();
        session.register_message("Customer", ".common.Customer".to_string());
        let messages = build_message_descriptors(&model, "shop", &mut session);
        assert_eq!(messages[0].field[0].type_name(), ".common.Customer");

        let model = model_with(vec![field("owner", FieldKind::Reference, "Owner")], ContentKind::Plain);
        let messages = build_message_descriptors(&model, "shop", &mut session);
        assert_eq!(messages[0].field[0].type_name(), ".shop.Owner");
    }

    #[test]
    fn test_oneof_groups_singular_fields() {
        let model = model_with(
            vec![
                field("cat", FieldKind::Reference, "Cat"),
                field("dog", FieldKind::Reference, "Dog"),
                field("tags", FieldKind::Array, "string"),
            ],
            ContentKind::OneOf,
        );
        let mut session = GenerationSession::new();
        let messages = build_message_descriptors(&model, "zoo", &mut session);
        let message = &messages[0];
        assert_eq!(message.oneof_decl[0].name(), ONEOF_NAME);
        assert_eq!(message.field[0].oneof_index(), 0);
        assert!(message.field[1].has_oneof_index());
        assert!(!message.field[2].has_oneof_index());
    }
}
