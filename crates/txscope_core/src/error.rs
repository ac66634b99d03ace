//! Error types for txscope core.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Result type for unit of work operations.
pub type UowResult<T> = Result<T, UowError>;

/// Result type returned by driver capabilities.
pub type DriverResult<T> = Result<T, DriverError>;

/// Boxed error carried as the source of a [`DriverError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur while coordinating a connection and its transaction.
#[derive(Debug, Error)]
pub enum UowError {
    /// Operation attempted from an incompatible state.
    #[error("invalid state: {0}")]
    InvalidState(StateViolation),

    /// The connection factory returned no connection.
    #[error("connection factory returned no connection")]
    FactoryContractViolation,

    /// A cancellation signal was observed before any driver call was issued.
    #[error("operation cancelled")]
    Cancelled,

    /// A driver capability call failed.
    #[error("driver error during {operation}: {source}")]
    Driver {
        /// The capability call that failed.
        operation: DriverOperation,
        /// The driver's error.
        #[source]
        source: DriverError,
    },
}

impl UowError {
    /// Creates a driver error for the given operation.
    pub fn driver(operation: DriverOperation, source: DriverError) -> Self {
        Self::Driver { operation, source }
    }

    /// Returns true if this is an [`UowError::InvalidState`] error.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, UowError::InvalidState(_))
    }

    /// Returns the state violation, if this is an invalid state error.
    pub fn state_violation(&self) -> Option<StateViolation> {
        match self {
            UowError::InvalidState(violation) => Some(*violation),
            _ => None,
        }
    }

    /// Returns true if the operation was cancelled before touching the driver.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UowError::Cancelled)
    }

    /// Returns the failed driver operation, if this is a driver error.
    pub fn driver_operation(&self) -> Option<DriverOperation> {
        match self {
            UowError::Driver { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

impl From<StateViolation> for UowError {
    fn from(violation: StateViolation) -> Self {
        UowError::InvalidState(violation)
    }
}

/// The precise reason behind an [`UowError::InvalidState`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateViolation {
    /// A connection is already open.
    AlreadyOpen,
    /// The connection cannot be closed while a transaction is running.
    TransactionInProgress,
    /// A transaction is already running.
    AlreadyInTransaction,
    /// Commit or rollback was requested without an active transaction.
    NoActiveTransaction,
    /// The controller already committed or rolled back its transaction.
    ScopeFinished,
}

impl fmt::Display for StateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            StateViolation::AlreadyOpen => {
                "a database connection is already open, close it before opening another one"
            }
            StateViolation::TransactionInProgress => {
                "a transaction is running, commit or roll it back before closing the connection"
            }
            StateViolation::AlreadyInTransaction => {
                "a transaction is already running, commit or roll it back before beginning another one"
            }
            StateViolation::NoActiveTransaction => "no transaction has been begun",
            StateViolation::ScopeFinished => "the transaction scope has already completed",
        };
        f.write_str(message)
    }
}

/// A driver capability call, used for error context and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOperation {
    /// `ConnectionFactory::make_new`.
    MakeConnection,
    /// `Connection::open`.
    Open,
    /// `Connection::close`.
    Close,
    /// `Connection::begin_transaction`.
    BeginTransaction,
    /// `Transaction::commit`.
    Commit,
    /// `Transaction::rollback`.
    Rollback,
}

impl fmt::Display for DriverOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverOperation::MakeConnection => "make connection",
            DriverOperation::Open => "open",
            DriverOperation::Close => "close",
            DriverOperation::BeginTransaction => "begin transaction",
            DriverOperation::Commit => "commit",
            DriverOperation::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// Error returned by a connection or transaction capability.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl DriverError {
    /// Creates a driver error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a driver error wrapping an underlying error.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
