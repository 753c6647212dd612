//! Conversion of OpenAPI identifiers into protobuf identifiers

use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::warn;

/// Remove characters that are not allowed in message or field names.
///
/// Separators (`.`, `-`, `/`) become underscores so word boundaries survive
/// for camel casing; the remaining illegal characters are dropped.
pub fn clean_name(name: &str) -> String {
    name.replace("application/json", "")
        .chars()
        .filter_map(|c| match c {
            '.' | '-' | '/' => Some('_'),
            ' ' | '(' | ')' | '{' | '}' | '$' => None,
            other => Some(other),
        })
        .collect()
}

/// Canonical reason phrase for an HTTP status code, words joined by `_`.
pub fn status_code_reason(code: u16) -> Option<&'static str> {
    let reason = match code {
        100 => "Continue",
        101 => "Switching_Protocols",
        102 => "Processing",
        103 => "Early_Hints",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non_Authoritative_Information",
        204 => "No_Content",
        205 => "Reset_Content",
        206 => "Partial_Content",
        207 => "Multi_Status",
        208 => "Already_Reported",
        226 => "IM_Used",
        300 => "Multiple_Choices",
        301 => "Moved_Permanently",
        302 => "Found",
        303 => "See_Other",
        304 => "Not_Modified",
        305 => "Use_Proxy",
        307 => "Temporary_Redirect",
        308 => "Permanent_Redirect",
        400 => "Bad_Request",
        401 => "Unauthorized",
        402 => "Payment_Required",
        403 => "Forbidden",
        404 => "Not_Found",
        405 => "Method_Not_Allowed",
        406 => "Not_Acceptable",
        407 => "Proxy_Authentication_Required",
        408 => "Request_Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length_Required",
        412 => "Precondition_Failed",
        413 => "Request_Entity_Too_Large",
        414 => "Request_URI_Too_Long",
        415 => "Unsupported_Media_Type",
        416 => "Requested_Range_Not_Satisfiable",
        417 => "Expectation_Failed",
        418 => "Im_a_teapot",
        421 => "Misdirected_Request",
        422 => "Unprocessable_Entity",
        423 => "Locked",
        424 => "Failed_Dependency",
        425 => "Too_Early",
        426 => "Upgrade_Required",
        428 => "Precondition_Required",
        429 => "Too_Many_Requests",
        431 => "Request_Header_Fields_Too_Large",
        451 => "Unavailable_For_Legal_Reasons",
        500 => "Internal_Server_Error",
        501 => "Not_Implemented",
        502 => "Bad_Gateway",
        503 => "Service_Unavailable",
        504 => "Gateway_Timeout",
        505 => "HTTP_Version_Not_Supported",
        506 => "Variant_Also_Negotiates",
        507 => "Insufficient_Storage",
        508 => "Loop_Detected",
        510 => "Not_Extended",
        511 => "Network_Authentication_Required",
        _ => return None,
    };
    Some(reason)
}

/// Replace a purely numeric name with its status reason phrase.
///
/// Names that are not numbers are returned unchanged.
pub fn convert_status_code(name: &str) -> String {
    let Ok(code) = name.parse::<u16>() else {
        return name.to_string();
    };
    match status_code_reason(code) {
        Some(reason) => reason.to_string(),
        None => {
            warn!(code, "status code has no known reason phrase");
            "unknownStatusCode".to_string()
        }
    }
}

/// Upper-case the first letter and every letter that follows an underscore,
/// dropping that underscore. Underscores before non-letters are kept.
pub fn to_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if i == 0 && c.is_ascii_alphabetic() {
            out.push(c.to_ascii_uppercase());
        } else if c == '_' && chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic()) {
            out.push(chars[i + 1].to_ascii_uppercase());
            i += 1;
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}

/// Message name for an OpenAPI type, operation or status code.
pub fn proto_type_name(name: &str) -> String {
    to_camel_case(&clean_name(&convert_status_code(name)))
}

/// Field name for a property or parameter.
///
/// Falls back to the field's declared type when nothing usable is left of the
/// original name.
pub fn proto_field_name(name: &str, declared_type: &str) -> String {
    let cleaned = clean_name(name);
    let cleaned = if cleaned.is_empty() {
        clean_name(declared_type)
    } else {
        cleaned
    };
    cleaned.to_lowercase()
}

/// Enum literal rendered as a proto enum value name.
pub fn enum_value_name(literal: &str) -> String {
    let name = literal.to_uppercase().replace('-', "_");
    match name.chars().next() {
        None => "EMPTY".to_string(),
        Some(first) if first.is_ascii_digit() => format!("_{name}"),
        Some(_) => name,
    }
}

/// Capitalize each word. Letters, digits and underscores belong to a word.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

/// Give every name a unique spelling while keeping order.
///
/// The first occurrence of a name keeps it; later occurrences get numeric
/// suffixes `1`, `2`, ... in declaration order, skipping any suffixed
/// spelling that is already taken.
pub fn deduplicate_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut taken: HashSet<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();

    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            if seen.insert(name) {
                return name.to_string();
            }
            let suffix = next_suffix.entry(name).or_insert(1);
            loop {
                let candidate = format!("{name}{suffix}");
                *suffix += 1;
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Service name that does not collide with any message in `taken`.
///
/// Tries `base`, then `baseService`, then `baseService1`, `baseService2`, ...
pub fn find_valid_service_name(base: &str, taken: &HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut counter = 0;
    while taken.contains(&candidate) {
        candidate = format!("{base}Service");
        if counter > 0 {
            candidate.push_str(&counter.to_string());
        }
        counter += 1;
    }
    candidate
}

/// Whether `name` is usable as a proto package component.
pub fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Derive a package name from a document path or URL.
///
/// Takes the base name, strips every extension and turns dashes into
/// underscores. Returns `None` if the result is not a valid identifier.
pub fn package_name_from_path(path: &str) -> Option<String> {
    let without_fragment = path.split('#').next().unwrap_or(path);
    let base = Path::new(without_fragment).file_name()?.to_str()?;
    let stem = base.split('.').next().unwrap_or(base);
    let package = stem.replace('-', "_");
    is_valid_package_name(&package).then_some(package)
}
