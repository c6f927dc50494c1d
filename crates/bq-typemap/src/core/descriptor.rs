//! Store type descriptor trees.
//!
//! A [`TypeDescriptor`] is the parsed form of a GoogleSQL type string such as
//! `ARRAY<STRUCT<id INT64, tags ARRAY<STRING>>>`. Its `Display` output is the
//! canonical store type text and parses back to an equal tree.

use std::fmt;

/// Parsed store type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// Scalar leaf, kept exactly as written (including arguments such as
    /// `NUMERIC(38,9)`).
    Scalar(String),

    /// `ARRAY<element>`
    Array(Box<TypeDescriptor>),

    /// `STRUCT<name type, ...>` with significant field order.
    Struct(Vec<StructField>),
}

/// One named field of a `STRUCT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl TypeDescriptor {
    /// Scalar leaf.
    pub fn scalar(name: impl Into<String>) -> Self {
        TypeDescriptor::Scalar(name.into())
    }

    /// `ARRAY<element>`.
    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    /// `STRUCT<...>` from `(name, type)` pairs.
    pub fn structure<N: Into<String>>(fields: impl IntoIterator<Item = (N, TypeDescriptor)>) -> Self {
        TypeDescriptor::Struct(
            fields
                .into_iter()
                .map(|(name, ty)| StructField::new(name, ty))
                .collect(),
        )
    }

    /// Check whether this is an ARRAY or STRUCT.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        !matches!(self, TypeDescriptor::Scalar(_))
    }

    /// Upper-cased scalar name without arguments (`numeric(38, 9)` -> `NUMERIC`).
    ///
    /// Returns `None` for composite descriptors.
    pub fn scalar_base_name(&self) -> Option<String> {
        match self {
            TypeDescriptor::Scalar(raw) => {
                let base = raw.split('(').next().unwrap_or(raw);
                Some(base.trim().to_ascii_uppercase())
            }
            _ => None,
        }
    }

    /// Nesting depth; a scalar has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TypeDescriptor::Scalar(_) => 1,
            TypeDescriptor::Array(element) => 1 + element.depth(),
            TypeDescriptor::Struct(fields) => {
                1 + fields.iter().map(|f| f.ty.depth()).max().unwrap_or(0)
            }
        }
    }
}

/// Check whether a field name can be written without backticks.
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(raw) => f.write_str(raw),
            TypeDescriptor::Array(element) => write!(f, "ARRAY<{}>", element),
            TypeDescriptor::Struct(fields) => {
                f.write_str("STRUCT<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if is_plain_identifier(&field.name) {
                        write!(f, "{} {}", field.name, field.ty)?;
                    } else {
                        let escaped = field.name.replace('\\', "\\\\").replace('`', "\\`");
                        write!(f, "`{}` {}", escaped, field.ty)?;
                    }
                }
                f.write_str(">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested() {
        let desc = TypeDescriptor::array(TypeDescriptor::structure([
            ("id", TypeDescriptor::scalar("INT64")),
            ("tags", TypeDescriptor::array(TypeDescriptor::scalar("STRING"))),
        ]));
        assert_eq!(
            desc.to_string(),
            "ARRAY<STRUCT<id INT64, tags ARRAY<STRING>>>"
        );
    }

    #[test]
    fn test_display_empty_struct() {
        let desc = TypeDescriptor::Struct(Vec::new());
        assert_eq!(desc.to_string(), "STRUCT<>");
    }

    #[test]
    fn test_display_quotes_unusual_names() {
        let desc = TypeDescriptor::structure([("first name", TypeDescriptor::scalar("STRING"))]);
        assert_eq!(desc.to_string(), "STRUCT<`first name` STRING>");
    }

    #[test]
    fn test_scalar_base_name() {
        assert_eq!(
            TypeDescriptor::scalar("numeric(38, 9)").scalar_base_name(),
            Some("NUMERIC".to_string())
        );
        assert_eq!(
            TypeDescriptor::array(TypeDescriptor::scalar("INT64")).scalar_base_name(),
            None
        );
    }

    #[test]
    fn test_depth() {
        assert_eq!(TypeDescriptor::scalar("INT64").depth(), 1);
        assert_eq!(TypeDescriptor::Struct(Vec::new()).depth(), 1);
        let nested = TypeDescriptor::array(TypeDescriptor::structure([(
            "a",
            TypeDescriptor::array(TypeDescriptor::scalar("INT64")),
        )]));
        assert_eq!(nested.depth(), 4);
    }
}
