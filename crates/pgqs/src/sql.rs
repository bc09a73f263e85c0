//! SQL fragments with deferred placeholders.
//!
//! A [`Sql`] stores raw text and parameter slots separately. Placeholder numbers are
//! never stored; they are assigned by a [`ParamAllocator`] when the fragment is spliced
//! into a statement and rendered. This keeps `$n` numbering correct no matter how
//! fragments are nested, reordered or reused.
//!
//! # Example
//!
//! ```ignore
//! use pgqs::Sql;
//!
//! let mut frag = Sql::new("price * ");
//! frag.push_bind(1.2);
//! assert_eq!(frag.to_sql(), "price * $1");
//! ```

use crate::error::{OrmError, OrmResult};
use crate::param::ParamAllocator;
use crate::value::Value;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, PartialEq)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A parameter-safe SQL fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

impl Sql {
    /// Create a fragment starting with raw SQL.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        let initial_sql = initial_sql.into();
        let parts = if initial_sql.is_empty() {
            Vec::new()
        } else {
            vec![SqlPart::Raw(initial_sql)]
        };
        Self {
            parts,
            params: Vec::new(),
        }
    }

    /// Create an empty fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A fragment holding a single bound value.
    pub fn bind(value: impl Into<Value>) -> Self {
        let mut sql = Self::empty();
        sql.push_bind(value);
        sql
    }

    /// Parse a template where each `?` marks a bound value.
    ///
    /// `??` is a literal `?`, and markers inside single-quoted literals are ignored.
    /// The number of markers must equal `params.len()`.
    pub fn template(sql: &str, params: Vec<Value>) -> OrmResult<Self> {
        let mut out = Self::empty();
        let mut raw = String::new();
        let mut in_quote = false;
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\'' => {
                    in_quote = !in_quote;
                    raw.push(c);
                }
                '?' if !in_quote => {
                    if chars.peek() == Some(&'?') {
                        chars.next();
                        raw.push('?');
                        continue;
                    }
                    out.push(&raw);
                    raw.clear();
                    out.parts.push(SqlPart::Param);
                }
                _ => raw.push(c),
            }
        }
        out.push(&raw);

        let markers = out.param_slots();
        if markers != params.len() {
            return Err(OrmError::compilation(format!(
                "expression has {markers} placeholder(s) but {} parameter(s)",
                params.len()
            )));
        }
        out.params = params;
        Ok(out)
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value.into());
        self
    }

    /// Append a comma-separated list of placeholders, one per value.
    pub fn push_bind_list<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_bind(v);
        }
        self
    }

    /// Append a copy of another fragment.
    pub fn push_sql(&mut self, other: &Sql) -> &mut Self {
        for part in &other.parts {
            match part {
                SqlPart::Raw(s) => {
                    self.push(s);
                }
                SqlPart::Param => self.parts.push(SqlPart::Param),
            }
        }
        self.params.extend(other.params.iter().cloned());
        self
    }

    /// Append another fragment, consuming it.
    pub fn append(&mut self, other: Sql) -> &mut Self {
        for part in other.parts {
            match part {
                SqlPart::Raw(s) => {
                    self.push(&s);
                }
                SqlPart::Param => self.parts.push(SqlPart::Param),
            }
        }
        self.params.extend(other.params);
        self
    }

    /// Wrap the fragment in parentheses.
    pub fn parenthesized(&self) -> Sql {
        let mut out = Sql::new("(");
        out.push_sql(self);
        out.push(")");
        out
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The bound values in slot order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    fn param_slots(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, SqlPart::Param))
            .count()
    }

    /// Render into `out`, taking placeholder numbers from `alloc`.
    pub fn render(&self, alloc: &mut ParamAllocator, out: &mut String) -> OrmResult<()> {
        let mut params = self.params.iter();
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    let Some(value) = params.next() else {
                        return Err(OrmError::compilation(
                            "fragment has more placeholders than parameters",
                        ));
                    };
                    alloc.bind(value.clone(), out)?;
                }
            }
        }
        Ok(())
    }

    /// Render stand-alone with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    use std::fmt::Write;
                    let _ = write!(&mut out, "${}", idx);
                }
            }
        }
        out
    }

    /// Render stand-alone into a [`BuiltQuery`].
    pub fn build(&self) -> OrmResult<BuiltQuery> {
        let mut alloc = ParamAllocator::new();
        let mut sql = String::new();
        self.render(&mut alloc, &mut sql)?;
        Ok(BuiltQuery {
            sql,
            params: alloc.into_params(),
        })
    }
}

/// A compiled statement: SQL text with `$n` placeholders and the values they bind.
///
/// `params[i - 1]` is the value for `$i`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BuiltQuery {
    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_bind() {
        let mut q = Sql::new("SELECT * FROM users WHERE age > ");
        q.push_bind(18).push(" AND status = ").push_bind("active");
        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE age > $1 AND status = $2");
        assert_eq!(q.params().len(), 2);
    }

    #[test]
    fn render_continues_shared_numbering() {
        let mut a = Sql::new("a = ");
        a.push_bind(1);
        let mut b = Sql::new("b = ");
        b.push_bind(2);

        let mut alloc = ParamAllocator::new();
        let mut out = String::new();
        a.render(&mut alloc, &mut out).unwrap();
        out.push_str(" AND ");
        b.render(&mut alloc, &mut out).unwrap();
        assert_eq!(out, "a = $1 AND b = $2");
        assert_eq!(alloc.into_params(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn template_markers() {
        let q = Sql::template("price * ? + ?", vec![1.5.into(), 2.into()]).unwrap();
        assert_eq!(q.to_sql(), "price * $1 + $2");
    }

    #[test]
    fn template_ignores_quoted_and_escaped_markers() {
        let q = Sql::template("data ?? 'a?' AND x = ?", vec![1.into()]).unwrap();
        assert_eq!(q.to_sql(), "data ? 'a?' AND x = $1");
    }

    #[test]
    fn template_count_mismatch_is_error() {
        let err = Sql::template("a = ? AND b = ?", vec![1.into()]).unwrap_err();
        assert!(err.is_compilation());
    }

    #[test]
    fn push_bind_list_joins_placeholders() {
        let mut q = Sql::new("id IN (");
        q.push_bind_list([1, 2, 3]).push(")");
        assert_eq!(q.to_sql(), "id IN ($1, $2, $3)");
    }
}
