//! Terminal operations: compile, then hand SQL and parameters to an [`Executor`].

use super::QuerySet;
use crate::column::Operand;
use crate::error::{OrmError, OrmResult};
use crate::executor::{Executor, ScalarRow};
use crate::record::Record;
use crate::sql::BuiltQuery;

/// Options for `EXPLAIN (...)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplainOptions {
    pub analyze: bool,
    pub verbose: bool,
    pub costs: bool,
    pub buffers: bool,
    pub timing: bool,
}

impl ExplainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(mut self) -> Self {
        self.analyze = true;
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn costs(mut self) -> Self {
        self.costs = true;
        self
    }

    pub fn buffers(mut self) -> Self {
        self.buffers = true;
        self
    }

    pub fn timing(mut self) -> Self {
        self.timing = true;
        self
    }

    fn keywords(&self) -> Vec<&'static str> {
        [
            (self.analyze, "ANALYZE"),
            (self.verbose, "VERBOSE"),
            (self.costs, "COSTS"),
            (self.buffers, "BUFFERS"),
            (self.timing, "TIMING"),
        ]
        .into_iter()
        .filter_map(|(on, kw)| on.then_some(kw))
        .collect()
    }
}

impl QuerySet {
    /// `EXPLAIN [(<options>)] <query>`.
    pub fn compile_explain(&self, options: ExplainOptions) -> OrmResult<BuiltQuery> {
        let built = self.to_sql()?;
        let keywords = options.keywords();
        let sql = if keywords.is_empty() {
            format!("EXPLAIN {}", built.sql)
        } else {
            format!("EXPLAIN ({}) {}", keywords.join(", "), built.sql)
        };
        Ok(BuiltQuery {
            sql,
            params: built.params,
        })
    }

    /// Run the query and return all rows.
    pub async fn execute<E: Executor>(&self, db: &E) -> OrmResult<Vec<E::Row>> {
        let built = self.to_sql()?;
        db.fetch_all(&built.sql, &built.params).await
    }

    /// Number of rows the query would return.
    pub async fn count<E>(&self, db: &E) -> OrmResult<i64>
    where
        E: Executor,
        E::Row: ScalarRow,
    {
        let built = self.compile_count()?;
        let rows = db.fetch_all(&built.sql, &built.params).await?;
        match rows.first() {
            Some(row) => row.scalar_i64(),
            None => Ok(0),
        }
    }

    /// Whether the query matches at least one row.
    pub async fn exists<E: Executor>(&self, db: &E) -> OrmResult<bool> {
        let built = self.compile_exists()?;
        let rows = db.fetch_all(&built.sql, &built.params).await?;
        Ok(!rows.is_empty())
    }

    /// Update matching rows; returns the affected row count.
    pub async fn update<E, I, K, V>(&self, db: &E, assignments: I) -> OrmResult<u64>
    where
        E: Executor,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Operand>,
    {
        let built = self.compile_update(assignments)?;
        db.bulk_change(&built.sql, std::slice::from_ref(&built.params), 1)
            .await
    }

    /// Delete matching rows; returns the affected row count.
    pub async fn delete<E: Executor>(&self, db: &E) -> OrmResult<u64> {
        let built = self.compile_delete()?;
        db.bulk_change(&built.sql, std::slice::from_ref(&built.params), 1)
            .await
    }

    /// Insert `rows` with one parameter group per row.
    ///
    /// `batch_size` defaults to the number of rows. Empty input returns `0` without
    /// touching the executor.
    pub async fn bulk_create<E: Executor>(
        &self,
        db: &E,
        rows: &[Record],
        batch_size: Option<usize>,
    ) -> OrmResult<u64> {
        if batch_size == Some(0) {
            return Err(OrmError::configuration("batch_size must be at least 1"));
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let (sql, groups) = self.compile_bulk_create(rows)?;
        let batch_size = batch_size.unwrap_or(groups.len());
        tracing::debug!(
            target: "pgqs.bulk",
            table = %self.target.name,
            rows = groups.len(),
            batch_size,
            "bulk_create"
        );
        db.bulk_change(&sql, &groups, batch_size).await
    }

    /// Run `EXPLAIN` for the query and return the plan rows.
    pub async fn explain<E: Executor>(
        &self,
        db: &E,
        options: ExplainOptions,
    ) -> OrmResult<Vec<E::Row>> {
        let built = self.compile_explain(options)?;
        db.fetch_all(&built.sql, &built.params).await
    }
}
