//! Recursive descent parser for GoogleSQL type strings.
//!
//! ```text
//! type  := ARRAY '<' type '>'
//!        | STRUCT '<' [ field (',' field)* ] '>'
//!        | name [ '(' arg (',' arg)* ')' ]
//! field := identifier WHITESPACE type
//! ```
//!
//! Keywords are case-insensitive. Commas are split only at nesting depth
//! zero, so `STRUCT<a NUMERIC(38,9), b STRUCT<x INT64, y INT64>>` has two
//! fields. Field names may be backtick-quoted. Any malformed input fails with
//! [`TypeMapError::Format`]; no partial tree is ever returned.

use crate::core::descriptor::{StructField, TypeDescriptor};
use crate::error::{Result, TypeMapError};

/// Parse a store type string into a descriptor tree.
///
/// # Examples
///
/// ```rust
/// use bq_typemap::dialect::parse_store_type;
/// use bq_typemap::core::TypeDescriptor;
///
/// let desc = parse_store_type("ARRAY<INT64>").unwrap();
/// assert_eq!(desc, TypeDescriptor::array(TypeDescriptor::scalar("INT64")));
/// ```
pub fn parse_store_type(input: &str) -> Result<TypeDescriptor> {
    parse_type(input, 0)
}

/// Parse `text`, which begins at byte `offset` of the original input.
fn parse_type(text: &str, offset: usize) -> Result<TypeDescriptor> {
    let (text, offset) = trim_with_offset(text, offset);
    if text.is_empty() {
        return Err(TypeMapError::format(text, offset, "expected a type"));
    }

    if let Some(open) = keyword_open(text, "ARRAY") {
        let inner = bracket_body(text, open, offset)?;
        let element = parse_type(inner, offset + open + 1)?;
        return Ok(TypeDescriptor::Array(Box::new(element)));
    }

    if let Some(open) = keyword_open(text, "STRUCT") {
        let inner = bracket_body(text, open, offset)?;
        let fields = parse_fields(inner, offset + open + 1)?;
        return Ok(TypeDescriptor::Struct(fields));
    }

    parse_scalar(text, offset)
}

/// Parse the comma-separated body of a `STRUCT<...>`.
fn parse_fields(body: &str, offset: usize) -> Result<Vec<StructField>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    split_top_level(body, offset)?
        .into_iter()
        .map(|(part, part_offset)| parse_field(part, part_offset))
        .collect()
}

/// Parse `name type`.
fn parse_field(text: &str, offset: usize) -> Result<StructField> {
    let (text, offset) = trim_with_offset(text, offset);
    if text.is_empty() {
        return Err(TypeMapError::format(text, offset, "empty field definition"));
    }

    let (name, rest_start) = if text.starts_with('`') {
        quoted_name(text, offset)?
    } else {
        match text.find(char::is_whitespace) {
            Some(ws) => (text[..ws].to_string(), ws),
            None => {
                return Err(TypeMapError::format(
                    text,
                    offset,
                    "missing separator between field name and type",
                ))
            }
        }
    };

    if name.is_empty() {
        return Err(TypeMapError::format(text, offset, "empty field name"));
    }
    if !text.starts_with('`') && name.contains(|c| matches!(c, '<' | '>' | '(' | ')' | ',')) {
        return Err(TypeMapError::format(text, offset, "invalid field name"));
    }

    let rest = &text[rest_start..];
    if !rest.starts_with(char::is_whitespace) {
        return Err(TypeMapError::format(
            text,
            offset,
            "missing separator between field name and type",
        ));
    }

    let ty = parse_type(rest, offset + rest_start)?;
    Ok(StructField { name, ty })
}

/// Parse a backtick-quoted field name; returns the unescaped name and the
/// byte index just past the closing backtick.
fn quoted_name(text: &str, offset: usize) -> Result<(String, usize)> {
    let mut name = String::new();
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        if escaped {
            name.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '`' {
            return Ok((name, i + 1));
        } else {
            name.push(c);
        }
    }
    Err(TypeMapError::format(
        text,
        offset,
        "unterminated quoted field name",
    ))
}

/// Parse a scalar leaf such as `INT64` or `NUMERIC(38, 9)`.
fn parse_scalar(text: &str, offset: usize) -> Result<TypeDescriptor> {
    if let Some(i) = text.find(|c| matches!(c, '<' | '>' | '`')) {
        return Err(TypeMapError::format(
            &text[i..],
            offset + i,
            format!("unexpected '{}' in scalar type", &text[i..i + 1]),
        ));
    }

    let name = match text.find('(') {
        Some(open) => {
            let close = matching_close(text, open, offset)?;
            if close != text.len() - 1 {
                return Err(TypeMapError::format(
                    &text[close + 1..],
                    offset + close + 1,
                    "unexpected text after type arguments",
                ));
            }
            let args = &text[open + 1..close];
            for (arg, arg_offset) in split_top_level(args, offset + open + 1)? {
                if arg.trim().is_empty() {
                    return Err(TypeMapError::format(args, arg_offset, "empty type argument"));
                }
            }
            text[..open].trim_end()
        }
        None => {
            if let Some(i) = text.find(')') {
                return Err(TypeMapError::format(&text[i..], offset + i, "unbalanced ')'"));
            }
            text
        }
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TypeMapError::format(text, offset, "invalid type name"));
    }
    if name.eq_ignore_ascii_case("ARRAY") || name.eq_ignore_ascii_case("STRUCT") {
        return Err(TypeMapError::format(
            text,
            offset,
            format!("expected '<' after {}", name.to_ascii_uppercase()),
        ));
    }

    Ok(TypeDescriptor::Scalar(text.to_string()))
}

/// If `text` starts with `keyword` (any case) followed by `<`, return the
/// byte index of that `<`.
fn keyword_open(text: &str, keyword: &str) -> Option<usize> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    let ws = rest.len() - rest.trim_start().len();
    rest[ws..].starts_with('<').then_some(keyword.len() + ws)
}

/// Return the text between the `<` at `open` and its matching `>`, which
/// must be the final character.
fn bracket_body(text: &str, open: usize, offset: usize) -> Result<&str> {
    let close = matching_close(text, open, offset)?;
    if close != text.len() - 1 {
        return Err(TypeMapError::format(
            &text[close + 1..],
            offset + close + 1,
            "unexpected text after closing '>'",
        ));
    }
    Ok(&text[open + 1..close])
}

/// Find the bracket closing the one at byte index `open`.
fn matching_close(text: &str, open: usize, offset: usize) -> Result<usize> {
    let mut stack: Vec<char> = Vec::new();
    for (i, c) in unquoted_chars(text).filter(|&(i, _)| i >= open) {
        match c {
            '<' | '(' => stack.push(c),
            '>' | ')' => {
                let expected = if c == '>' { '<' } else { '(' };
                if stack.pop() != Some(expected) {
                    return Err(TypeMapError::format(
                        &text[i..],
                        offset + i,
                        format!("unbalanced '{}'", c),
                    ));
                }
                if stack.is_empty() {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(TypeMapError::format(
        &text[open..],
        offset + open,
        format!("unclosed '{}'", &text[open..open + 1]),
    ))
}

/// Split on commas at nesting depth zero, returning each part with its
/// absolute byte offset.
fn split_top_level(text: &str, offset: usize) -> Result<Vec<(&str, usize)>> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;

    for (i, c) in unquoted_chars(text) {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    TypeMapError::format(&text[i..], offset + i, format!("unbalanced '{}'", c))
                })?;
            }
            ',' if depth == 0 => {
                parts.push((&text[start..i], offset + start));
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(TypeMapError::format(text, offset, "unbalanced brackets"));
    }

    parts.push((&text[start..], offset + start));
    Ok(parts)
}

/// Characters of `text` outside backtick-quoted names, with byte positions.
fn unquoted_chars(text: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut in_quote = false;
    let mut escaped = false;
    text.char_indices().filter(move |&(_, c)| {
        if in_quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '`' {
                in_quote = false;
            }
            false
        } else if c == '`' {
            in_quote = true;
            false
        } else {
            true
        }
    })
}

fn trim_with_offset(text: &str, offset: usize) -> (&str, usize) {
    let leading = text.len() - text.trim_start().len();
    (text.trim(), offset + leading)
}
