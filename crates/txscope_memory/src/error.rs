//! Error types for the in-memory driver.

use thiserror::Error;
use txscope_core::{DriverError, DriverOperation};

/// Result type for in-memory driver operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors raised by the in-memory driver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The connection is not open.
    #[error("connection is not open")]
    ConnectionClosed,

    /// The connection was opened twice.
    #[error("connection is already open")]
    ConnectionAlreadyOpen,

    /// The transaction was already committed or rolled back.
    #[error("transaction already {0}")]
    TransactionCompleted(&'static str),

    /// The transaction belongs to another connection.
    #[error("transaction belongs to another connection")]
    ForeignTransaction,

    /// The caller's cancel signal was raised while the call was in flight.
    #[error("cancelled while in flight")]
    Cancelled,

    /// A fault injected through [`crate::MemoryDatabase::inject_fault`].
    #[error("injected fault on {0}")]
    InjectedFault(DriverOperation),
}

impl From<MemoryError> for DriverError {
    fn from(err: MemoryError) -> Self {
        DriverError::with_source("in-memory driver error", err)
    }
}
