//! Identifier quoting and string literal escaping for GoogleSQL.
//!
//! Identifiers (dataset, table and column names) cannot be bound as
//! parameters, so statement text is built with quoted identifiers:
//! 1. Validate identifiers for suspicious patterns (null bytes, excessive length)
//! 2. Wrap in backticks
//! 3. Escape backticks and backslashes within the quotes
//!
//! String literals use the dialect's backslash escapes.

use crate::error::{Result, TypeMapError};

/// Maximum identifier length (column names allow 300 characters).
const MAX_IDENTIFIER_LENGTH: usize = 300;

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
///
/// # Errors
///
/// Returns `TypeMapError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TypeMapError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(TypeMapError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(TypeMapError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} characters: {:?}",
            MAX_IDENTIFIER_LENGTH, name
        )));
    }

    Ok(())
}

/// Quote an identifier using backticks.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(quote_ident("users")?, "`users`");
/// assert_eq!(quote_ident("odd`name")?, "`odd\\`name`");
/// ```
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!(
        "`{}`",
        name.replace('\\', "\\\\").replace('`', "\\`")
    ))
}

/// Qualify a table name with its dataset.
///
/// Returns `` `dataset`.`table` `` with proper quoting, or just the quoted
/// table when no dataset is given.
pub fn qualify(dataset: Option<&str>, table: &str) -> Result<String> {
    match dataset {
        Some(ds) => Ok(format!("{}.{}", quote_ident(ds)?, quote_ident(table)?)),
        None => quote_ident(table),
    }
}

/// Escape text for use inside a single-quoted string literal.
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => result.push_str("\\x00"),
            _ => result.push(c),
        }
    }
    result
}

/// Render a single-quoted string literal.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string(s))
}
