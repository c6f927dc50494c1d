//! Error types for type mapping, value conversion and write batching.

use thiserror::Error;

/// Main error type for the mapping engine.
#[derive(Error, Debug)]
pub enum TypeMapError {
    /// Malformed store type grammar (unbalanced brackets, empty field name, etc.)
    #[error("Invalid store type at position {position}: {message} (near {fragment:?})")]
    Format {
        fragment: String,
        position: usize,
        message: String,
    },

    /// No mapping rule for a model type or store type
    #[error("No type mapping found for {0}")]
    MappingNotFound(String),

    /// Required field missing or a value could not be coerced
    #[error("Field mismatch for {field}: {message}")]
    FieldMismatch { field: String, message: String },

    /// A single row cannot fit into an otherwise empty batch
    #[error("Row for table {table} exceeds batch limits: {message}")]
    BatchTooLarge { table: String, message: String },

    /// Configuration error (invalid YAML, out-of-range limits, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TypeMapError {
    /// Create a Format error pointing at `position` in the original input.
    pub fn format(
        fragment: impl Into<String>,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        TypeMapError::Format {
            fragment: fragment.into(),
            position,
            message: message.into(),
        }
    }

    /// Create a FieldMismatch error.
    ///
    /// An empty `field` means "the value itself"; enclosing structs fill in
    /// the path through [`TypeMapError::in_field`].
    pub fn field_mismatch(field: impl Into<String>, message: impl Into<String>) -> Self {
        TypeMapError::FieldMismatch {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a BatchTooLarge error.
    pub fn batch_too_large(table: impl Into<String>, message: impl Into<String>) -> Self {
        TypeMapError::BatchTooLarge {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Prefix a field name onto the path of a FieldMismatch error.
    ///
    /// Other variants pass through untouched.
    #[must_use]
    pub fn in_field(self, name: &str) -> Self {
        match self {
            TypeMapError::FieldMismatch { field, message } => {
                let field = if field.is_empty() {
                    name.to_string()
                } else if field.starts_with('[') {
                    format!("{}{}", name, field)
                } else {
                    format!("{}.{}", name, field)
                };
                TypeMapError::FieldMismatch { field, message }
            }
            other => other,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            TypeMapError::Config(_) | TypeMapError::Yaml(_) | TypeMapError::Json(_) => 2,
            TypeMapError::Format { .. }
            | TypeMapError::MappingNotFound(_)
            | TypeMapError::FieldMismatch { .. } => 3,
            TypeMapError::BatchTooLarge { .. } => 4,
            TypeMapError::Io(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for mapping operations.
pub type Result<T> = std::result::Result<T, TypeMapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_field_builds_path() {
        let err = TypeMapError::field_mismatch("", "expected INT64")
            .in_field("zip")
            .in_field("address")
            .in_field("contact");
        match err {
            TypeMapError::FieldMismatch { field, .. } => assert_eq!(field, "contact.address.zip"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_in_field_array_index() {
        let err = TypeMapError::field_mismatch("[2]", "expected INT64").in_field("scores");
        assert!(err.to_string().contains("scores[2]"));
    }

    #[test]
    fn test_in_field_leaves_other_errors() {
        let err = TypeMapError::MappingNotFound("FOO".into()).in_field("x");
        assert!(matches!(err, TypeMapError::MappingNotFound(_)));
    }

    #[test]
    fn test_format_error_message() {
        let err = TypeMapError::format("STRUCT<a>", 7, "missing type after field name");
        let msg = err.to_string();
        assert!(msg.contains("position 7"));
        assert!(msg.contains("STRUCT<a>"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(TypeMapError::Config("x".into()).exit_code(), 2);
        assert_eq!(TypeMapError::MappingNotFound("x".into()).exit_code(), 3);
        assert_eq!(TypeMapError::batch_too_large("t", "x").exit_code(), 4);
    }
}
