use std::result::Result as StdResult;

use thiserror::Error;

use crate::ledger::period::PeriodError;

/// Unified error type for the domain, service, and storage layers.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Expense not found: {0}")]
    ExpenseNotFound(i64),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid period: {0}")]
    InvalidPeriod(#[from] PeriodError),
    #[error("Tracker state unavailable: {0}")]
    StateUnavailable(String),
}

pub type Result<T> = StdResult<T, TrackerError>;

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::StorageError(err.to_string())
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::StorageError(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for TrackerError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        TrackerError::StateUnavailable(err.to_string())
    }
}

impl From<crate::config::ConfigError> for TrackerError {
    fn from(err: crate::config::ConfigError) -> Self {
        TrackerError::ConfigError(err.to_string())
    }
}
