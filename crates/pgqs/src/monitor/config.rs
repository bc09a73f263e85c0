use std::time::Duration;
use tracing::Level;

/// Configuration for [`InstrumentedExecutor`](super::InstrumentedExecutor).
///
/// Defaults: no timeout, no slow-query threshold, SQL logged at `DEBUG` and
/// truncated to 200 bytes.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Per-call timeout. `None` means no timeout.
    pub query_timeout: Option<Duration>,
    /// Calls slower than this emit a warning on `pgqs.slow_query`.
    pub slow_query_threshold: Option<Duration>,
    /// Level of the per-call `pgqs.sql` event.
    pub log_level: Level,
    /// Truncate logged SQL (in bytes, at a char boundary). `None` disables truncation.
    pub max_sql_length: Option<usize>,
    /// Whether to emit the per-call `pgqs.sql` event at all.
    pub log_sql: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            slow_query_threshold: None,
            log_level: Level::DEBUG,
            max_sql_length: Some(200),
            log_sql: true,
        }
    }
}

impl ExecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls exceeding this duration are dropped and return [`OrmError::Timeout`](crate::OrmError::Timeout).
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }
}
