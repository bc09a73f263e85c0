//! SQL identifier validation and column qualification.
//!
//! Identifiers cannot be bound as parameters, so every table, column, alias and CTE
//! name that reaches SQL text through a typed API is validated here first.
//!
//! - Unquoted parts match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow anything but NUL, with `"` escaped as `""`

use crate::error::{OrmError, OrmResult};

/// One `.`-separated segment of an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

/// A validated SQL identifier such as `users`, `public.users` or `"Order".id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse dotted and quoted identifier forms.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::configuration("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::configuration(
                "identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut rest = s;
        loop {
            let (part, tail) = parse_part(rest, s)?;
            parts.push(part);
            match tail.strip_prefix('.') {
                Some("") => {
                    return Err(OrmError::configuration(format!(
                        "trailing '.' in identifier '{s}'"
                    )));
                }
                Some(next) => rest = next,
                None if tail.is_empty() => break,
                None => {
                    return Err(OrmError::configuration(format!(
                        "invalid identifier '{s}'"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    /// True for a single unquoted or quoted name with no schema/table prefix.
    pub fn is_bare(&self) -> bool {
        self.parts.len() == 1
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(name) => out.push_str(name),
                IdentPart::Quoted(name) => {
                    out.push('"');
                    out.push_str(&name.replace('"', "\"\""));
                    out.push('"');
                }
            }
        }
        out
    }
}

fn parse_part<'a>(input: &'a str, whole: &str) -> OrmResult<(IdentPart, &'a str)> {
    if let Some(quoted) = input.strip_prefix('"') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '"' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '"'))) {
                chars.next();
                name.push('"');
                continue;
            }
            if name.is_empty() {
                return Err(OrmError::configuration("empty quoted identifier"));
            }
            return Ok((IdentPart::Quoted(name), &quoted[i + 1..]));
        }
        return Err(OrmError::configuration(format!(
            "unclosed quoted identifier '{whole}'"
        )));
    }

    let end = input.find('.').unwrap_or(input.len());
    let name = &input[..end];
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
        }
        _ => false,
    };
    if !valid {
        return Err(OrmError::configuration(format!(
            "invalid identifier '{whole}'"
        )));
    }
    Ok((IdentPart::Unquoted(name.to_string()), &input[end..]))
}

/// Conversion into a validated [`Ident`].
pub trait IntoIdent {
    fn into_ident(self) -> OrmResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(&self)
    }
}

/// Rewrite a `__` path into a dotted SQL path.
pub fn normalize_path(field: &str) -> String {
    field.replace("__", ".")
}

/// Qualify a column reference with `table`.
///
/// Only bare identifiers are qualified. Paths (`author__name`), `*`, and anything
/// that is not an identifier (`COUNT(*)`, `price * 2`) pass through unchanged apart
/// from `__` normalization.
pub fn qualify_column(table: Option<&str>, field: &str) -> String {
    let normalized = normalize_path(field);
    match table {
        Some(table) if Ident::parse(&normalized).is_ok_and(|id| id.is_bare()) => {
            format!("{table}.{normalized}")
        }
        _ => normalized,
    }
}
