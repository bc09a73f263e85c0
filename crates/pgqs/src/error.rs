//! Error types for pgqs

use std::error::Error as StdError;
use thiserror::Error;

/// Result type alias for pgqs operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed error produced by an execution adapter.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Error types for query construction, compilation and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// A builder call introduced invalid state (raised eagerly).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The query could not be rendered to SQL.
    #[error("Compilation error: {0}")]
    Compilation(String),

    /// The execution adapter failed; the source error is kept unchanged.
    #[error("Adapter error: {0}")]
    Adapter(#[source] BoxError),

    /// Adapter call timed out
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),
}

impl OrmError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a compilation error
    pub fn compilation(message: impl Into<String>) -> Self {
        Self::Compilation(message.into())
    }

    /// Wrap an arbitrary adapter error
    pub fn adapter<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Adapter(err.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_compilation(&self) -> bool {
        matches!(self, Self::Compilation(_))
    }

    pub fn is_adapter(&self) -> bool {
        matches!(self, Self::Adapter(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns the SQLSTATE code when the adapter error came from Postgres.
    pub fn sqlstate(&self) -> Option<&str> {
        let Self::Adapter(err) = self else {
            return None;
        };
        err.downcast_ref::<tokio_postgres::Error>()
            .and_then(|e| e.as_db_error())
            .map(|db| db.code().code())
    }
}

impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Adapter(Box::new(err))
    }
}
