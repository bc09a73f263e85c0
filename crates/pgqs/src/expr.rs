//! Parameterized SQL expressions.

use crate::error::OrmResult;
use crate::sql::{BuiltQuery, Sql};
use crate::value::Value;
use crate::window::Over;

/// A SQL fragment plus the values it binds.
///
/// Bound values are kept as deferred slots; they receive `$n` numbers only when the
/// expression is rendered as part of a statement.
///
/// ```ignore
/// let e = Expression::new("price * ? + ?", [1.2, 3.0])?;
/// let ranked = F::new("id").row_number().over(Over::new().order_by(["-score"]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    sql: Sql,
}

impl Expression {
    /// Build from a template whose `?` markers take `params` in order.
    pub fn new<I, V>(sql: &str, params: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let params = params.into_iter().map(Into::into).collect();
        Ok(Self {
            sql: Sql::template(sql, params)?,
        })
    }

    /// Raw SQL with no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: Sql::new(sql),
        }
    }

    pub fn from_sql(sql: Sql) -> Self {
        Self { sql }
    }

    pub fn as_sql(&self) -> &Sql {
        &self.sql
    }

    pub fn into_sql(self) -> Sql {
        self.sql
    }

    pub fn params(&self) -> &[Value] {
        self.sql.params()
    }

    /// Append an inline `OVER (...)` clause.
    pub fn over(mut self, over: Over) -> Self {
        self.sql.push(" OVER (");
        self.sql.append(over.body_fragment(None, false));
        self.sql.push(")");
        self
    }

    /// Reference a window declared in the query's `WINDOW` clause.
    pub fn over_window(mut self, name: &str) -> Self {
        self.sql.push(" OVER ");
        self.sql.push(name);
        self
    }

    /// Render stand-alone with placeholders starting at `$1`.
    pub fn to_sql(&self) -> String {
        self.sql.to_sql()
    }

    pub fn build(&self) -> OrmResult<BuiltQuery> {
        self.sql.build()
    }
}

impl From<&str> for Expression {
    fn from(sql: &str) -> Self {
        Expression::raw(sql)
    }
}

impl From<String> for Expression {
    fn from(sql: String) -> Self {
        Expression::raw(sql)
    }
}

impl From<Sql> for Expression {
    fn from(sql: Sql) -> Self {
        Expression::from_sql(sql)
    }
}
