use std::fmt;

/// Classification of a record field's storage and comparison semantics.
///
/// Every field of a record type falls into exactly one kind. Only the
/// supported kinds become table columns; [BaseKind::Unsupported] fields are
/// still carried inside the stored record but never compared or queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    /// A signed integer of any width, widened to 64 bits.
    Int,
    /// An unsigned integer of any width, widened to 64 bits.
    Uint,
    /// A 32 or 64-bit floating-point number.
    Float,
    /// A boolean value (true or false).
    Bool,
    /// A UTF-8 character string.
    Text,
    /// An instant in time.
    Timestamp,
    /// Collections, options, boxes, references, functions and any other
    /// composite type.
    Unsupported,
}

impl BaseKind {
    /// Returns `true` for every kind that can become a column.
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// Name of the expression-language type a column of this kind is
    /// declared with, or `None` for [BaseKind::Unsupported].
    pub fn expr_type(self) -> Option<&'static str> {
        match self {
            Self::Int => Some("int"),
            Self::Uint => Some("uint"),
            Self::Float => Some("double"),
            Self::Bool => Some("bool"),
            Self::Text => Some("string"),
            Self::Timestamp => Some("timestamp"),
            Self::Unsupported => None,
        }
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_kinds() {
        for kind in [
            BaseKind::Int,
            BaseKind::Uint,
            BaseKind::Float,
            BaseKind::Bool,
            BaseKind::Text,
            BaseKind::Timestamp,
        ] {
            assert!(kind.is_supported());
            assert!(kind.expr_type().is_some());
        }
        assert!(!BaseKind::Unsupported.is_supported());
        assert_eq!(BaseKind::Unsupported.expr_type(), None);
    }

    #[test]
    fn test_expr_type_names() {
        assert_eq!(BaseKind::Float.expr_type(), Some("double"));
        assert_eq!(BaseKind::Text.expr_type(), Some("string"));
        assert_eq!(BaseKind::Timestamp.expr_type(), Some("timestamp"));
    }
}
