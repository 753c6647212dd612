//! `google.api.HttpRule` method option
//!
//! The rule is carried on `MethodOptions` as extension field 72295728. There
//! is no generated Rust type for it, so it is encoded by hand and stored as an
//! unknown field, which is exactly how the extension appears on the wire.

use crate::error::GenerationError;
use protobuf::descriptor::MethodOptions;
use protobuf::well_known_types::empty::Empty;
use protobuf::{CodedOutputStream, Message, UnknownValueRef};

/// Field number of the `google.api.http` extension on `MethodOptions`.
pub const HTTP_EXTENSION_FIELD_NUMBER: u32 = 72295728;

const BODY_FIELD_NUMBER: u32 = 7;

/// Verb and URL template of a transcoded method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpPattern {
    Get(String),
    Put(String),
    Post(String),
    Delete(String),
    Patch(String),
}

impl HttpPattern {
    /// Pattern for an upper-case HTTP verb; `None` for verbs gRPC cannot transcode.
    pub fn for_verb(verb: &str, path: &str) -> Option<Self> {
        let path = path.to_string();
        match verb {
            "GET" => Some(HttpPattern::Get(path)),
            "PUT" => Some(HttpPattern::Put(path)),
            "POST" => Some(HttpPattern::Post(path)),
            "DELETE" => Some(HttpPattern::Delete(path)),
            "PATCH" => Some(HttpPattern::Patch(path)),
            _ => None,
        }
    }

    fn field_number(&self) -> u32 {
        match self {
            HttpPattern::Get(_) => 2,
            HttpPattern::Put(_) => 3,
            HttpPattern::Post(_) => 4,
            HttpPattern::Delete(_) => 5,
            HttpPattern::Patch(_) => 6,
        }
    }

    fn path(&self) -> &str {
        match self {
            HttpPattern::Get(p)
            | HttpPattern::Put(p)
            | HttpPattern::Post(p)
            | HttpPattern::Delete(p)
            | HttpPattern::Patch(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRule {
    pub pattern: HttpPattern,
    /// Request field bound to the HTTP body; empty when nothing is bound.
    pub body: String,
}

impl HttpRule {
    pub fn new(pattern: HttpPattern, body: impl Into<String>) -> Self {
        Self {
            pattern,
            body: body.into(),
        }
    }

    /// Wire encoding of the rule message.
    pub fn write_to_bytes(&self) -> Result<Vec<u8>, GenerationError> {
        let mut bytes = Vec::new();
        {
            let mut os = CodedOutputStream::vec(&mut bytes);
            os.write_string(self.pattern.field_number(), self.pattern.path())?;
            if !self.body.is_empty() {
                os.write_string(BODY_FIELD_NUMBER, &self.body)?;
            }
            os.flush()?;
        }
        Ok(bytes)
    }

    /// Decode a rule; returns `None` if no supported pattern is present.
    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Option<Self>, GenerationError> {
        let fields = Empty::parse_from_bytes(bytes)?;
        let unknown = fields.special_fields.unknown_fields();
        let string_field = |number: u32| match unknown.get(number) {
            Some(UnknownValueRef::LengthDelimited(value)) => Some(String::from_utf8_lossy(value).into_owned()),
            _ => None,
        };

        let pattern = [
            (2, HttpPattern::Get as fn(String) -> HttpPattern),
            (3, HttpPattern::Put),
            (4, HttpPattern::Post),
            (5, HttpPattern::Delete),
            (6, HttpPattern::Patch),
        ]
        .into_iter()
        .find_map(|(number, make)| string_field(number).map(make));

        Ok(pattern.map(|pattern| HttpRule {
            pattern,
            body: string_field(BODY_FIELD_NUMBER).unwrap_or_default(),
        }))
    }

    /// Method options carrying this rule as the `google.api.http` extension.
    pub fn to_method_options(&self) -> Result<MethodOptions, GenerationError> {
        let mut options = MethodOptions::new();
        options
            .special_fields
            .mut_unknown_fields()
            .add_length_delimited(HTTP_EXTENSION_FIELD_NUMBER, self.write_to_bytes()?);
        Ok(options)
    }

    /// Read the rule back from method options, if one is attached.
    pub fn from_method_options(options: &MethodOptions) -> Result<Option<Self>, GenerationError> {
        match options.special_fields.unknown_fields().get(HTTP_EXTENSION_FIELD_NUMBER) {
            Some(UnknownValueRef::LengthDelimited(bytes)) => Self::parse_from_bytes(bytes),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_for_verb() {
        assert_eq!(
            HttpPattern::for_verb("GET", "/v1/books"),
            Some(HttpPattern::Get("/v1/books".to_string()))
        );
        assert_eq!(HttpPattern::for_verb("HEAD", "/v1/books"), None);
    }

    #[test]
    fn test_rule_survives_method_options() {
        let rule = HttpRule::new(HttpPattern::Post("/v1/shelves/{shelf}/books".to_string()), "book");
        let options = rule.to_method_options().unwrap();
        let decoded = HttpRule::from_method_options(&options).unwrap().unwrap();
        assert_eq!(decoded, rule);
    }

    #[test]
    fn test_encoding_is_stable() {
        let rule = HttpRule::new(HttpPattern::Get("/a".to_string()), "");
        // field 2, length 2, "/a"
        assert_eq!(rule.write_to_bytes().unwrap(), vec![0x12, 0x02, b'/', b'a']);
    }

    #[test]
    fn test_options_without_rule() {
        assert_eq!(HttpRule::from_method_options(&MethodOptions::new()).unwrap(), None);
    }
}
