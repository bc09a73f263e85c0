use super::config::ExecConfig;
use super::truncate_sql_bytes;
use crate::error::{OrmError, OrmResult};
use crate::executor::Executor;
use crate::value::Value;
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tracing::Level;

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            _ => tracing::trace!($($field)*),
        }
    };
}

/// An [`Executor`] wrapper that logs every call, flags slow ones, and enforces a timeout.
///
/// ```ignore
/// let db = InstrumentedExecutor::new(client).with_config(
///     ExecConfig::new()
///         .with_query_timeout(Duration::from_secs(30))
///         .with_slow_query_threshold(Duration::from_millis(500)),
/// );
/// let rows = books.execute(&db).await?;
/// ```
pub struct InstrumentedExecutor<E> {
    inner: E,
    config: ExecConfig,
}

impl<E: Executor> InstrumentedExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            config: ExecConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    pub(super) fn display_sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.config.max_sql_length {
            Some(max) if sql.len() > max => {
                Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max)))
            }
            _ => Cow::Borrowed(sql),
        }
    }

    fn log_call(&self, op: &'static str, sql: &str, param_count: usize) {
        if !self.config.log_sql {
            return;
        }
        let sql = self.display_sql(sql);
        emit_at_level!(
            self.config.log_level,
            target: "pgqs.sql",
            op,
            param_count,
            sql = %sql,
        );
    }

    fn report<T>(&self, op: &'static str, sql: &str, elapsed: Duration, result: &OrmResult<T>) {
        if let Err(err) = result {
            tracing::warn!(
                target: "pgqs.sql",
                op,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "query failed"
            );
        }
        if let Some(threshold) = self.config.slow_query_threshold
            && elapsed > threshold
        {
            tracing::warn!(
                target: "pgqs.slow_query",
                op,
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = threshold.as_millis() as u64,
                sql = %self.display_sql(sql),
                "slow query"
            );
        }
    }

    async fn with_timeout<T, F>(&self, future: F) -> OrmResult<T>
    where
        F: std::future::Future<Output = OrmResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => Err(OrmError::Timeout(timeout)),
                }
            }
            None => future.await,
        }
    }
}

impl<E: Executor> Executor for InstrumentedExecutor<E> {
    type Row = E::Row;

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<E::Row>> {
        self.log_call("fetch_all", sql, params.len());
        let start = Instant::now();
        let result = self.with_timeout(self.inner.fetch_all(sql, params)).await;
        self.report("fetch_all", sql, start.elapsed(), &result);
        result
    }

    async fn bulk_change(
        &self,
        sql: &str,
        param_groups: &[Vec<Value>],
        batch_size: usize,
    ) -> OrmResult<u64> {
        let param_count = param_groups.iter().map(Vec::len).sum();
        self.log_call("bulk_change", sql, param_count);
        let start = Instant::now();
        let result = self
            .with_timeout(self.inner.bulk_change(sql, param_groups, batch_size))
            .await;
        self.report("bulk_change", sql, start.elapsed(), &result);
        result
    }
}
