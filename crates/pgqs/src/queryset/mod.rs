//! Query sets: chainable, clone-friendly descriptions of a query against one table.
//!
//! Chain methods take the query set by value and return it, so a chain of temporaries
//! never copies anything. The accumulated parts live behind an `Arc` and are copied on
//! first write, which makes `base.clone().filter(..)` cheap and leaves `base` untouched.
//!
//! ```ignore
//! use pgqs::{q, QuerySet};
//!
//! let base = QuerySet::new(books).filter(q!(status = "published"));
//! let recent = base.clone().order_by(["-published_at"]).limit(10);
//! let cheap = base.filter(q!(price__lt = 10));
//!
//! let built = recent.to_sql()?;
//! let rows = recent.execute(&client).await?;
//! ```

mod compile;
mod exec;

#[cfg(test)]
mod tests;

pub use exec::ExplainOptions;

use crate::column::Operand;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expression;
use crate::ident::{Ident, IntoIdent};
use crate::model::TableDef;
use crate::predicate::Q;
use crate::window::{Over, Term, Window, collect_terms};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One `WHERE` / `HAVING` condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Q(Q),
    Expr(Expression),
    /// Condition text emitted verbatim.
    Raw(String),
}

impl From<Q> for Filter {
    fn from(q: Q) -> Self {
        Filter::Q(q)
    }
}

impl From<Expression> for Filter {
    fn from(e: Expression) -> Self {
        Filter::Expr(e)
    }
}

impl From<&str> for Filter {
    fn from(s: &str) -> Self {
        Filter::Raw(s.to_string())
    }
}

impl From<String> for Filter {
    fn from(s: String) -> Self {
        Filter::Raw(s)
    }
}

/// Join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// A table named in a join: a plain name or a table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TableName(pub String);

impl From<&str> for TableName {
    fn from(s: &str) -> Self {
        TableName(s.to_string())
    }
}

impl From<String> for TableName {
    fn from(s: String) -> Self {
        TableName(s)
    }
}

impl From<&TableDef> for TableName {
    fn from(def: &TableDef) -> Self {
        TableName(def.name.clone())
    }
}

impl From<&Arc<TableDef>> for TableName {
    fn from(def: &Arc<TableDef>) -> Self {
        TableName(def.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Join {
    pub(crate) kind: JoinType,
    pub(crate) table: String,
    pub(crate) on: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SelectItem {
    Column(String),
    Annotation { alias: String, value: Operand },
    /// Spliced verbatim, e.g. a [`QuerySet::subquery`].
    Expr(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cte {
    pub(crate) name: Ident,
    pub(crate) initial: Expression,
    pub(crate) recursive: Expression,
}

/// A `WINDOW` entry; windows declared through `QuerySet::window` qualify bare columns.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WindowDef {
    pub(crate) window: Window,
    pub(crate) qualified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOp {
    Union,
    Intersect,
    Except,
}

impl SetOp {
    pub(crate) fn keyword(&self, all: bool) -> &'static str {
        match (self, all) {
            (SetOp::Union, false) => "UNION",
            (SetOp::Union, true) => "UNION ALL",
            (SetOp::Intersect, false) => "INTERSECT",
            (SetOp::Intersect, true) => "INTERSECT ALL",
            (SetOp::Except, false) => "EXCEPT",
            (SetOp::Except, true) => "EXCEPT ALL",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Compound {
    pub(crate) op: SetOp,
    pub(crate) all: bool,
    pub(crate) left: QuerySet,
    pub(crate) right: QuerySet,
}

#[derive(Debug, Clone)]
pub(crate) struct QueryParts {
    pub(crate) select: Vec<SelectItem>,
    pub(crate) filters: Vec<Filter>,
    pub(crate) order_by: Vec<Term>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) joins: Vec<Join>,
    pub(crate) group_by: Vec<Term>,
    pub(crate) having: Vec<Filter>,
    pub(crate) ctes: Vec<Cte>,
    pub(crate) windows: Vec<WindowDef>,
    pub(crate) compound: Option<Box<Compound>>,
}

impl Default for QueryParts {
    fn default() -> Self {
        Self {
            select: vec![SelectItem::Column("*".to_string())],
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            joins: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            ctes: Vec::new(),
            windows: Vec::new(),
            compound: None,
        }
    }
}

/// A query against one target table.
#[derive(Debug, Clone)]
pub struct QuerySet {
    pub(crate) target: Arc<TableDef>,
    pub(crate) parts: Arc<QueryParts>,
    pub(crate) distinct: bool,
    pub(crate) for_update: bool,
    pub(crate) for_share: bool,
    pub(crate) nowait: bool,
    pub(crate) skip_locked: bool,
    pub(crate) selected_related: BTreeSet<String>,
}

impl QuerySet {
    /// Start a query set selecting `*` from `target`.
    pub fn new(target: impl Into<Arc<TableDef>>) -> Self {
        Self {
            target: target.into(),
            parts: Arc::new(QueryParts::default()),
            distinct: false,
            for_update: false,
            for_share: false,
            nowait: false,
            skip_locked: false,
            selected_related: BTreeSet::new(),
        }
    }

    pub fn target(&self) -> &TableDef {
        &self.target
    }

    fn parts_mut(&mut self) -> &mut QueryParts {
        Arc::make_mut(&mut self.parts)
    }

    /// Replace the select list.
    ///
    /// Bare names are qualified with the target table; `*` and non-identifiers such as
    /// `COUNT(*)` pass through.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parts_mut().select = fields
            .into_iter()
            .map(|f| SelectItem::Column(f.into()))
            .collect();
        self.distinct = false;
        self
    }

    /// Replace the select list and emit `SELECT DISTINCT`.
    pub fn select_distinct<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut qs = self.select(fields);
        qs.distinct = true;
        qs
    }

    pub fn values<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select(fields)
    }

    /// Like [`values`](Self::values); `flat` is only valid with a single field.
    pub fn values_list<I, S>(self, fields: I, flat: bool) -> OrmResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if flat && fields.len() > 1 {
            return Err(OrmError::configuration(
                "'flat' is not valid when values_list is called with more than one field",
            ));
        }
        Ok(self.select(fields))
    }

    /// Add a `WHERE` condition; conditions from separate calls are joined with `AND`.
    pub fn filter(mut self, cond: impl Into<Filter>) -> Self {
        self.parts_mut().filters.push(cond.into());
        self
    }

    /// Add the negation of `q` as a condition.
    pub fn exclude(self, q: Q) -> Self {
        self.filter(!q)
    }

    /// Append `<value> AS <alias>` entries to the select list.
    pub fn annotate<I, A, V>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = (A, V)>,
        A: Into<String>,
        V: Into<Operand>,
    {
        let items = annotations.into_iter().map(|(alias, value)| SelectItem::Annotation {
            alias: alias.into(),
            value: value.into(),
        });
        self.parts_mut().select.extend(items);
        self
    }

    /// Append an expression to the select list as written.
    ///
    /// Unlike [`annotate`](Self::annotate) no parentheses or alias are added, so an
    /// aliased [`subquery`](Self::subquery) can be embedded directly.
    pub fn select_expr(mut self, expr: impl Into<Expression>) -> Self {
        self.parts_mut().select.push(SelectItem::Expr(expr.into()));
        self
    }

    /// Replace the ordering. `-name` sorts descending; bare names get `ASC`.
    pub fn order_by<I, T>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        self.parts_mut().order_by = collect_terms(terms);
        self
    }

    /// Append `<related_table>.*` for each named foreign-key field.
    pub fn select_related<I, S>(mut self, fields: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            let field = field.as_ref();
            match self.target.field(field) {
                Some(def) if def.is_foreign_key() => {
                    self.selected_related.insert(field.to_string());
                }
                Some(_) => {
                    return Err(OrmError::configuration(format!(
                        "'{field}' on '{}' is not a foreign key",
                        self.target.name
                    )));
                }
                None => {
                    return Err(OrmError::configuration(format!(
                        "'{}' has no field '{field}'",
                        self.target.name
                    )));
                }
            }
        }
        Ok(self)
    }

    /// Add a join. `on` is ignored for [`JoinType::Cross`].
    pub fn join(
        mut self,
        table: impl Into<TableName>,
        on: impl Into<Expression>,
        kind: JoinType,
    ) -> Self {
        let on = (kind != JoinType::Cross).then(|| on.into());
        self.parts_mut().joins.push(Join {
            kind,
            table: table.into().0,
            on,
        });
        self
    }

    pub fn cross_join(mut self, table: impl Into<TableName>) -> Self {
        self.parts_mut().joins.push(Join {
            kind: JoinType::Cross,
            table: table.into().0,
            on: None,
        });
        self
    }

    /// Replace the grouping terms.
    pub fn group_by<I, T>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        self.parts_mut().group_by = collect_terms(terms);
        self
    }

    /// Replace the `HAVING` conditions.
    pub fn having<I, C>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Filter>,
    {
        self.parts_mut().having = conditions.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a named window over target-table columns.
    pub fn window<P, PT, O, OT>(mut self, alias: &str, partition_by: P, order_by: O) -> Self
    where
        P: IntoIterator<Item = PT>,
        PT: Into<Term>,
        O: IntoIterator<Item = OT>,
        OT: Into<Term>,
    {
        let window = Window {
            name: alias.to_string(),
            over: Over::new().partition_by(partition_by).order_by(order_by),
        };
        self.parts_mut().windows.push(WindowDef {
            window,
            qualified: true,
        });
        self
    }

    /// Declare a prepared [`Window`], rendered as written.
    pub fn named_window(mut self, window: Window) -> Self {
        self.parts_mut().windows.push(WindowDef {
            window,
            qualified: false,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.parts_mut().limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.parts_mut().offset = Some(offset);
        self
    }

    /// `FOR UPDATE`, optionally with `NOWAIT` (preferred) or `SKIP LOCKED`.
    pub fn for_update(mut self, nowait: bool, skip_locked: bool) -> Self {
        self.for_update = true;
        self.nowait = nowait;
        self.skip_locked = skip_locked;
        self
    }

    /// `FOR SHARE`; ignored when `FOR UPDATE` is also set.
    pub fn for_share(mut self, nowait: bool, skip_locked: bool) -> Self {
        self.for_share = true;
        self.nowait = nowait;
        self.skip_locked = skip_locked;
        self
    }

    /// Add `name AS (initial UNION ALL recursive)` to the `WITH RECURSIVE` list.
    pub fn with_recursive(
        mut self,
        name: impl IntoIdent,
        initial: impl Into<Expression>,
        recursive: impl Into<Expression>,
    ) -> OrmResult<Self> {
        let cte = Cte {
            name: name.into_ident()?,
            initial: initial.into(),
            recursive: recursive.into(),
        };
        self.parts_mut().ctes.push(cte);
        Ok(self)
    }

    fn set_op(self, op: SetOp, other: QuerySet, all: bool) -> Self {
        let left = self.clone();
        let mut qs = self;
        qs.parts_mut().compound = Some(Box::new(Compound {
            op,
            all,
            left,
            right: other,
        }));
        qs
    }

    /// `(self) UNION [ALL] (other)`.
    pub fn union(self, other: QuerySet, all: bool) -> Self {
        self.set_op(SetOp::Union, other, all)
    }

    pub fn intersect(self, other: QuerySet, all: bool) -> Self {
        self.set_op(SetOp::Intersect, other, all)
    }

    pub fn except(self, other: QuerySet, all: bool) -> Self {
        self.set_op(SetOp::Except, other, all)
    }

    pub fn is_compound(&self) -> bool {
        self.parts.compound.is_some()
    }
}
