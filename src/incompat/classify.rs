//! Severity and hint text per classification
//!
//! This is the only place severities are decided.

use crate::incompat::types::{IncompatibilityClassification, Severity};

pub fn severity(classification: IncompatibilityClassification) -> Severity {
    use IncompatibilityClassification::*;
    match classification {
        Security | ParameterStyling | DataValidation | ExternalTranscodingSupport => Severity::Warning,
        InvalidOperation | InvalidDataState | Inheritance => Severity::Fail,
        Default => Severity::Info,
    }
}

fn reason(classification: IncompatibilityClassification) -> Option<&'static str> {
    use IncompatibilityClassification::*;
    let reason = match classification {
        Security => "gRPC HTTP/JSON transcoding not concerned with auth information",
        ParameterStyling => "parameter styling not representable in .proto files",
        DataValidation => "data validation (regex, array limits, etc.) not natively supported in .proto files",
        ExternalTranscodingSupport => "the need for external transcoding support outside of .proto files",
        InvalidOperation => "a nonstandard operation not supported in .proto representation",
        InvalidDataState => "data state (nullable) not representable in .proto files",
        Inheritance => "inheritance not supported in .proto files",
        Default => return None,
    };
    Some(reason)
}

fn implication(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "information not important to core API representation",
        Severity::Warning => {
            "exclusion of this feature in .proto representation removes a component of the API \
             representation but does not by itself prevent a functional transcoding environment"
        }
        Severity::Fail => "a fundamental API representation feature lacks support in .proto files",
    }
}

/// Human-readable explanation of a classification.
pub fn hint(classification: IncompatibilityClassification) -> String {
    match reason(classification) {
        Some(reason) => {
            let severity = severity(classification);
            format!(
                "{classification} incompatibilities occur as a result of {reason}. {severity} implies {}.",
                implication(severity)
            )
        }
        None => format!("No hint for {classification}"),
    }
}
