//! Execution adapters.
//!
//! Query sets never open connections. Terminal operations compile to SQL and call an
//! [`Executor`], which is implemented here for `tokio_postgres::Client` and
//! `tokio_postgres::Transaction`, and can be implemented for anything else
//! (a pool checkout, a recording mock in tests).

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use futures_util::future::try_join_all;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Runs compiled statements.
pub trait Executor: Send + Sync {
    type Row: Send;

    /// Run a query and return all rows.
    fn fetch_all(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Self::Row>>> + Send;

    /// Run one statement once per parameter group and return the total affected count.
    ///
    /// `batch_size` bounds how many groups are in flight together.
    fn bulk_change(
        &self,
        sql: &str,
        param_groups: &[Vec<Value>],
        batch_size: usize,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;
}

/// Reads a single integer result column (used by `count`).
pub trait ScalarRow {
    fn scalar_i64(&self) -> OrmResult<i64>;
}

impl ScalarRow for Row {
    fn scalar_i64(&self) -> OrmResult<i64> {
        self.try_get::<_, i64>(0).map_err(OrmError::from)
    }
}

pub(crate) fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

macro_rules! impl_executor {
    ($ty:ty) => {
        impl Executor for $ty {
            type Row = Row;

            async fn fetch_all(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
                Ok(self.query(sql, &param_refs(params)).await?)
            }

            async fn bulk_change(
                &self,
                sql: &str,
                param_groups: &[Vec<Value>],
                batch_size: usize,
            ) -> OrmResult<u64> {
                if param_groups.is_empty() {
                    return Ok(0);
                }
                let stmt = self.prepare(sql).await?;
                let mut affected = 0;
                // Statements within a chunk are pipelined on the connection.
                for chunk in param_groups.chunks(batch_size.max(1)) {
                    let refs: Vec<_> = chunk.iter().map(|group| param_refs(group)).collect();
                    let counts =
                        try_join_all(refs.iter().map(|r| self.execute(&stmt, r.as_slice())))
                            .await?;
                    affected += counts.into_iter().sum::<u64>();
                }
                Ok(affected)
            }
        }
    };
}

impl_executor!(tokio_postgres::Client);
impl_executor!(tokio_postgres::Transaction<'_>);
