//! Sample argument values for generated calls.

use super::resolve::{TypeLabel, resolve};
use super::types::Parameter;

/// Placeholder used for `str` parameters without a default.
pub const STR_PLACEHOLDER: &str = "\"test\"";

/// Literal for a resolved label when no default is declared.
pub fn placeholder(label: TypeLabel) -> &'static str {
    match label {
        TypeLabel::Int => "1",
        TypeLabel::Float => "1.0",
        TypeLabel::Str => STR_PLACEHOLDER,
        TypeLabel::Bool => "True",
        TypeLabel::List => "[]",
        TypeLabel::Dict => "{}",
        TypeLabel::None | TypeLabel::Any => "None",
    }
}

/// Literal argument text for `parameter`.
///
/// A declared default always wins and is returned verbatim; the label-driven
/// placeholder is only used when the author gave no default.
pub fn synthesize(parameter: &Parameter) -> String {
    match &parameter.default {
        Some(default) => default.clone(),
        None => placeholder(resolve(parameter)).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ParamKind;

    fn param(annotation: Option<&str>, default: Option<&str>) -> Parameter {
        Parameter {
            name: "p".to_string(),
            kind: ParamKind::Positional,
            annotation: annotation.map(str::to_string),
            default: default.map(str::to_string),
        }
    }

    #[test]
    fn default_is_used_verbatim() {
        assert_eq!(synthesize(&param(Some("str"), Some("\"World\""))), "\"World\"");
        assert_eq!(synthesize(&param(Some("int"), Some("'oops'"))), "'oops'");
        assert_eq!(synthesize(&param(None, Some("DEFAULT_TIMEOUT * 2"))), "DEFAULT_TIMEOUT * 2");
    }

    #[test]
    fn labels_dispatch_without_default() {
        assert_eq!(synthesize(&param(Some("int"), None)), "1");
        assert_eq!(synthesize(&param(Some("float"), None)), "1.0");
        assert_eq!(synthesize(&param(Some("bool"), None)), "True");
        assert_eq!(synthesize(&param(Some("list"), None)), "[]");
        assert_eq!(synthesize(&param(Some("dict"), None)), "{}");
        assert_eq!(synthesize(&param(Some("Widget"), None)), "None");
        assert_eq!(synthesize(&param(None, None)), "None");
    }

    #[test]
    fn str_placeholder_is_quoted_and_non_empty() {
        let value = synthesize(&param(Some("str"), None));
        assert!(value.len() > 2);
        assert!(value.starts_with('"') && value.ends_with('"'));
    }
}
