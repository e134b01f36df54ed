use std::time::Duration;

use thiserror::Error;

/// Errors raised by the spatial store while executing a tile query
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The database could not be reached (pool exhausted or closed, network, TLS)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The database accepted the connection but the query failed
    #[error("Query failed: {0}")]
    Query(String),

    /// The query did not finish before its deadline
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Errors that terminate a tile request
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// A path parameter did not parse (maps to HTTP 400)
    #[error("Invalid {param}: {value:?}")]
    BadParameter { param: &'static str, value: String },

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store failed while executing the query
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The store call exceeded the configured deadline
    #[error("Query timed out after {0:?}")]
    QueryTimeout(Duration),
}

impl TileError {
    pub fn bad_parameter(param: &'static str, value: impl Into<String>) -> Self {
        TileError::BadParameter {
            param,
            value: value.into(),
        }
    }
}

impl From<StoreError> for TileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => TileError::StoreUnavailable(msg),
            StoreError::Query(msg) => TileError::QueryFailed(msg),
            StoreError::Timeout(deadline) => TileError::QueryTimeout(deadline),
        }
    }
}

/// Configuration errors detected at startup
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is outside its accepted range
    #[error("{field} {reason}")]
    OutOfRange { field: &'static str, reason: String },

    /// A table or column name is not a plain SQL identifier
    #[error("{field} must be a plain SQL identifier, got {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },

    /// A required value is missing or empty
    #[error("{0} is required")]
    Missing(&'static str),
}
