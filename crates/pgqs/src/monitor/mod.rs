//! Execution instrumentation.
//!
//! [`InstrumentedExecutor`] wraps any [`Executor`](crate::Executor) and adds:
//! - a `pgqs.sql` tracing event per call (op, param count, truncated SQL)
//! - a `pgqs.slow_query` warning above a configurable threshold
//! - a per-call timeout returning [`OrmError::Timeout`](crate::OrmError::Timeout)
//!
//! # Example
//!
//! ```rust,ignore
//! use pgqs::monitor::{ExecConfig, InstrumentedExecutor};
//! use std::time::Duration;
//!
//! let db = InstrumentedExecutor::new(client).with_config(
//!     ExecConfig::new()
//!         .with_query_timeout(Duration::from_secs(30))
//!         .with_slow_query_threshold(Duration::from_secs(1)),
//! );
//! let n = Book::objects().filter(q!(status = "published")).count(&db).await?;
//! ```

mod config;
mod instrumented;


pub use config::ExecConfig;
pub use instrumented::InstrumentedExecutor;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
