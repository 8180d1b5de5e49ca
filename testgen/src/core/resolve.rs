//! Canonical type labels for sample-value dispatch.
//!
//! Resolution is a fixed lexical table over the annotation text. Aliases,
//! generics, and imported names are deliberately not interpreted: `List[int]`
//! and `typing.List` both resolve to [`TypeLabel::Any`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::Parameter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeLabel {
    Int,
    Float,
    Str,
    Bool,
    List,
    Dict,
    None,
    Any,
}

impl TypeLabel {
    /// Map annotation text to a label. Absent or unknown text yields `Any`.
    pub fn from_annotation(annotation: Option<&str>) -> Self {
        match annotation.map(str::trim) {
            Some("int") => Self::Int,
            Some("float") => Self::Float,
            Some("str") => Self::Str,
            Some("bool") => Self::Bool,
            Some("list") => Self::List,
            Some("dict") => Self::Dict,
            Some("None") => Self::None,
            _ => Self::Any,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::None => "none",
            Self::Any => "any",
        }
    }

    /// Standard boundary classes worth exercising for values of this label.
    pub fn boundary_classes(self) -> Option<&'static str> {
        match self {
            Self::Int | Self::Float => Some("zero, negative, large values"),
            Self::Str => Some("empty string, whitespace-only string"),
            Self::List => Some("empty list, single-element list"),
            Self::Dict => Some("empty dict, single-entry dict"),
            Self::Bool => Some("True, False"),
            Self::None | Self::Any => None,
        }
    }
}

impl fmt::Display for TypeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective label of a parameter.
pub fn resolve(parameter: &Parameter) -> TypeLabel {
    TypeLabel::from_annotation(parameter.annotation.as_deref())
}

/// Effective label of a return annotation.
pub fn resolve_return(return_type: Option<&str>) -> TypeLabel {
    TypeLabel::from_annotation(return_type)
}
