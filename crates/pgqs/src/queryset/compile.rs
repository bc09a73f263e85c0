//! Rendering query sets to SQL.
//!
//! Every statement is assembled as one [`Sql`] fragment in emission order and then
//! rendered once, so `$n` placeholders are numbered strictly left to right.

use super::{Compound, Filter, QuerySet, SelectItem};
use crate::column::Operand;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expression;
use crate::ident::{Ident, qualify_column};
use crate::record::Record;
use crate::sql::{BuiltQuery, Sql};
use crate::value::Value;
use crate::window::Term;

/// Space-separated clause list.
#[derive(Default)]
struct Clauses {
    sql: Sql,
}

impl Clauses {
    fn add(&mut self, clause: Sql) {
        if !self.sql.is_empty() {
            self.sql.push(" ");
        }
        self.sql.append(clause);
    }

    fn add_raw(&mut self, clause: &str) {
        self.add(Sql::new(clause));
    }

    fn finish(self) -> Sql {
        self.sql
    }
}

fn join_fragments(items: impl IntoIterator<Item = Sql>, sep: &str) -> Sql {
    let mut out = Sql::empty();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.append(item);
    }
    out
}

/// `(c1) AND (c2) ...`; a top-level empty `Q` contributes nothing.
fn conditions_fragment(filters: &[Filter], table: &str) -> OrmResult<Option<Sql>> {
    let mut rendered = Vec::with_capacity(filters.len());
    for filter in filters {
        let frag = match filter {
            Filter::Q(q) if q.is_empty() => continue,
            Filter::Q(q) => q.fragment(Some(table))?,
            Filter::Expr(e) => e.as_sql().clone(),
            Filter::Raw(raw) => Sql::new(raw.as_str()),
        };
        rendered.push(frag.parenthesized());
    }
    if rendered.is_empty() {
        return Ok(None);
    }
    Ok(Some(join_fragments(rendered, " AND ")))
}

fn operand_fragment(value: &Operand, table: &str) -> Sql {
    match value {
        Operand::Column(f) => Sql::new(qualify_column(Some(table), f.field())),
        Operand::Expr(e) => e.as_sql().clone(),
        Operand::Value(v) => Sql::bind(v.clone()),
    }
}

fn checked_alias(alias: &str) -> OrmResult<&str> {
    match Ident::parse(alias) {
        Ok(ident) if ident.is_bare() => Ok(alias),
        _ => Err(OrmError::compilation(format!("invalid alias '{alias}'"))),
    }
}

impl Compound {
    fn fragment(&self) -> OrmResult<Sql> {
        let mut out = self.left.select_fragment()?.parenthesized();
        out.push(" ").push(self.op.keyword(self.all)).push(" ");
        out.append(self.right.select_fragment()?.parenthesized());
        Ok(out)
    }
}

impl QuerySet {
    fn table(&self) -> &str {
        &self.target.name
    }

    fn where_fragment(&self) -> OrmResult<Option<Sql>> {
        conditions_fragment(&self.parts.filters, self.table())
    }

    fn select_list(&self) -> OrmResult<Sql> {
        let table = self.table();
        let mut items = Vec::with_capacity(self.parts.select.len());
        for item in &self.parts.select {
            let frag = match item {
                SelectItem::Column(name) => Sql::new(qualify_column(Some(table), name)),
                SelectItem::Annotation { alias, value } => {
                    let alias = checked_alias(alias)?;
                    let mut frag = match value {
                        Operand::Expr(e) => e.as_sql().parenthesized(),
                        other => operand_fragment(other, table),
                    };
                    frag.push(" AS ").push(alias);
                    frag
                }
                SelectItem::Expr(e) => e.as_sql().clone(),
            };
            items.push(frag);
        }

        for name in &self.selected_related {
            if let Some(fk) = self.target.field(name).and_then(|f| f.foreign_key.as_ref()) {
                items.push(Sql::new(format!("{}.*", fk.to_table)));
            }
        }

        Ok(join_fragments(items, ", "))
    }

    /// The full `SELECT` statement as a fragment with deferred placeholders.
    pub(crate) fn select_fragment(&self) -> OrmResult<Sql> {
        if let Some(compound) = &self.parts.compound {
            return compound.fragment();
        }

        let table = self.table();
        let parts = &self.parts;
        let mut clauses = Clauses::default();

        if !parts.ctes.is_empty() {
            let ctes = parts.ctes.iter().map(|cte| {
                let mut frag = Sql::new(format!("{} AS (", cte.name.to_sql()));
                frag.push_sql(cte.initial.as_sql())
                    .push(" UNION ALL ")
                    .push_sql(cte.recursive.as_sql())
                    .push(")");
                frag
            });
            let mut with = Sql::new("WITH RECURSIVE ");
            with.append(join_fragments(ctes, ", "));
            clauses.add(with);
        }

        let mut select = Sql::new(if self.distinct {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        });
        select.append(self.select_list()?);
        clauses.add(select);

        clauses.add(Sql::new(format!("FROM {table}")));

        for join in &parts.joins {
            let mut frag = Sql::new(format!("{} {}", join.kind.as_sql(), join.table));
            if let Some(on) = &join.on {
                frag.push(" ON ").push_sql(on.as_sql());
            }
            clauses.add(frag);
        }

        if let Some(cond) = self.where_fragment()? {
            let mut frag = Sql::new("WHERE ");
            frag.append(cond);
            clauses.add(frag);
        }

        if !parts.group_by.is_empty() {
            let mut frag = Sql::new("GROUP BY ");
            frag.append(join_fragments(
                parts.group_by.iter().map(|t| t.plain_fragment(Some(table))),
                ", ",
            ));
            clauses.add(frag);
        }

        if let Some(cond) = conditions_fragment(&parts.having, table)? {
            let mut frag = Sql::new("HAVING ");
            frag.append(cond);
            clauses.add(frag);
        }

        if !parts.windows.is_empty() {
            let mut defs = Vec::with_capacity(parts.windows.len());
            for def in &parts.windows {
                checked_alias(&def.window.name)?;
                let scope = def.qualified.then_some(table);
                defs.push(def.window.fragment(scope, def.qualified));
            }
            let mut frag = Sql::new("WINDOW ");
            frag.append(join_fragments(defs, ", "));
            clauses.add(frag);
        }

        if !parts.order_by.is_empty() {
            let mut frag = Sql::new("ORDER BY ");
            frag.append(join_fragments(
                parts
                    .order_by
                    .iter()
                    .map(|t: &Term| t.order_fragment(Some(table), true)),
                ", ",
            ));
            clauses.add(frag);
        }

        if let Some(limit) = parts.limit {
            clauses.add_raw(&format!("LIMIT {limit}"));
        }
        if let Some(offset) = parts.offset {
            clauses.add_raw(&format!("OFFSET {offset}"));
        }

        let lock = if self.for_update {
            Some("FOR UPDATE")
        } else if self.for_share {
            Some("FOR SHARE")
        } else {
            None
        };
        if let Some(lock) = lock {
            clauses.add_raw(lock);
            if self.nowait {
                clauses.add_raw("NOWAIT");
            } else if self.skip_locked {
                clauses.add_raw("SKIP LOCKED");
            }
        }

        Ok(clauses.finish())
    }

    /// Compile to SQL text and the ordered parameter list.
    pub fn to_sql(&self) -> OrmResult<BuiltQuery> {
        self.select_fragment()?.build()
    }

    /// The compiled query as an embeddable expression (CTE bodies, `IN` subqueries).
    pub fn to_expression(&self) -> OrmResult<Expression> {
        Ok(Expression::from_sql(self.select_fragment()?))
    }

    /// `(<query>) AS alias`, for use in a select list or `FROM`.
    pub fn subquery(&self, alias: &str) -> OrmResult<Expression> {
        let alias = Ident::parse(alias)?;
        let mut sql = self.select_fragment()?.parenthesized();
        sql.push(" AS ").push(&alias.to_sql());
        Ok(Expression::from_sql(sql))
    }

    /// `SELECT <select> FROM (<self>) AS sub<suffix>`.
    fn wrapped(qs: &QuerySet, select: &str, suffix: &str) -> OrmResult<BuiltQuery> {
        let mut sql = Sql::new(format!("SELECT {select} FROM "));
        sql.append(qs.select_fragment()?.parenthesized());
        sql.push(" AS sub").push(suffix);
        sql.build()
    }

    /// A copy without row locks or related columns.
    fn unlocked(&self) -> QuerySet {
        let mut qs = self.clone();
        qs.for_update = false;
        qs.for_share = false;
        qs.nowait = false;
        qs.skip_locked = false;
        qs.selected_related.clear();
        qs
    }

    /// `SELECT COUNT(*)` over the same filters, without ordering, locks or related columns.
    ///
    /// Compound, `DISTINCT` and sliced (`LIMIT`/`OFFSET`) queries are counted as a
    /// subquery; a sliced subquery keeps its ordering.
    pub fn compile_count(&self) -> OrmResult<BuiltQuery> {
        if self.is_compound() {
            return Self::wrapped(self, "COUNT(*)", "");
        }
        let sliced = self.parts.limit.is_some() || self.parts.offset.is_some();
        if self.distinct || sliced {
            let mut inner = self.unlocked();
            if !sliced {
                inner = inner.order_by(Vec::<Term>::new());
            }
            return Self::wrapped(&inner, "COUNT(*)", "");
        }
        self.unlocked()
            .select(["COUNT(*)"])
            .order_by(Vec::<Term>::new())
            .to_sql()
    }

    /// `SELECT 1 ... LIMIT 1` over the same filters.
    pub fn compile_exists(&self) -> OrmResult<BuiltQuery> {
        if self.is_compound() {
            return Self::wrapped(self, "1", " LIMIT 1");
        }
        let mut qs = self
            .clone()
            .select(["1"])
            .order_by(Vec::<Term>::new())
            .limit(1);
        qs.selected_related.clear();
        qs.to_sql()
    }

    fn ensure_simple(&self, what: &str) -> OrmResult<()> {
        if self.is_compound() {
            return Err(OrmError::compilation(format!(
                "cannot {what} a compound (set operation) query"
            )));
        }
        Ok(())
    }

    /// `UPDATE t SET ... [WHERE ...]`, numbered in emission order (SET first).
    pub fn compile_update<I, K, V>(&self, assignments: I) -> OrmResult<BuiltQuery>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Operand>,
    {
        self.ensure_simple("update")?;

        let mut sets = Vec::new();
        for (column, value) in assignments {
            let column = column.as_ref();
            match Ident::parse(column) {
                Ok(ident) if ident.is_bare() => {}
                _ => {
                    return Err(OrmError::configuration(format!(
                        "invalid update column '{column}'"
                    )));
                }
            }
            let value: Operand = value.into();
            let mut frag = Sql::new(format!("{column} = "));
            frag.append(match value {
                Operand::Column(f) => Sql::new(f.field()),
                Operand::Expr(e) => e.into_sql(),
                Operand::Value(v) => Sql::bind(v),
            });
            sets.push(frag);
        }
        if sets.is_empty() {
            return Err(OrmError::configuration("update requires at least one column"));
        }

        let mut sql = Sql::new(format!("UPDATE {} SET ", self.table()));
        sql.append(join_fragments(sets, ", "));
        if let Some(cond) = self.where_fragment()? {
            sql.push(" WHERE ").append(cond);
        }
        sql.build()
    }

    /// `DELETE FROM t [WHERE ...]`.
    pub fn compile_delete(&self) -> OrmResult<BuiltQuery> {
        self.ensure_simple("delete")?;

        let mut sql = Sql::new(format!("DELETE FROM {}", self.table()));
        if let Some(cond) = self.where_fragment()? {
            sql.push(" WHERE ").append(cond);
        }
        sql.build()
    }

    /// One single-row `INSERT` statement and one parameter group per record.
    ///
    /// Auto-increment fields are skipped. A missing value takes the field default,
    /// else `NULL` for nullable fields; a missing required value is an error.
    pub fn compile_bulk_create(&self, rows: &[Record]) -> OrmResult<(String, Vec<Vec<Value>>)> {
        let def = &self.target;
        let fields: Vec<_> = def.insertable_fields().collect();
        if fields.is_empty() {
            return Err(OrmError::configuration(format!(
                "'{}' has no insertable fields",
                def.name
            )));
        }

        let mut sql = Sql::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            def.name,
            fields
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        sql.push_bind_list(std::iter::repeat_n(Value::Null, fields.len()));
        sql.push(")");

        let mut groups = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if let Some(unknown) = row.columns().find(|c| def.field(c).is_none()) {
                return Err(OrmError::configuration(format!(
                    "row {i}: unknown field '{unknown}' for '{}'",
                    def.name
                )));
            }
            let mut group = Vec::with_capacity(fields.len());
            for field in &fields {
                let value = match (row.get(&field.name), &field.default) {
                    (Some(v), _) => v.clone(),
                    (None, Some(default)) => default.clone(),
                    (None, None) if field.null => Value::Null,
                    (None, None) => {
                        return Err(OrmError::configuration(format!(
                            "row {i}: missing value for required field '{}'",
                            field.name
                        )));
                    }
                };
                group.push(value);
            }
            groups.push(group);
        }

        Ok((sql.to_sql(), groups))
    }
}
