//! Blocking driver capabilities.

use crate::cancel::CancelSignal;
use crate::error::DriverResult;
use crate::options::IsolationLevel;
use std::sync::Arc;

/// Produces new, unopened connections.
///
/// # Contract
///
/// A successful call must yield a connection. `Ok(None)` is a contract
/// violation that the unit of work reports as
/// [`crate::UowError::FactoryContractViolation`].
pub trait ConnectionFactory: Send + Sync {
    /// The connection type produced by this factory.
    type Connection: Connection;

    /// Creates a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying driver rejects the request.
    fn make_new(&self, cancel: &CancelSignal) -> DriverResult<Option<Self::Connection>>;
}

/// A live channel to a database.
pub trait Connection: Send {
    /// The transaction type begun on this connection.
    type Transaction: Transaction;

    /// Opens the connection.
    fn open(&mut self, cancel: &CancelSignal) -> DriverResult<()>;

    /// Closes the connection.
    fn close(&mut self) -> DriverResult<()>;

    /// Begins a transaction with the given isolation level.
    fn begin_transaction(
        &mut self,
        isolation: IsolationLevel,
        cancel: &CancelSignal,
    ) -> DriverResult<Self::Transaction>;
}

/// A transaction running on a [`Connection`].
pub trait Transaction: Send {
    /// Makes every change in the transaction permanent.
    fn commit(&mut self, cancel: &CancelSignal) -> DriverResult<()>;

    /// Discards every change in the transaction.
    fn rollback(&mut self, cancel: &CancelSignal) -> DriverResult<()>;
}

impl<F: ConnectionFactory + ?Sized> ConnectionFactory for Arc<F> {
    type Connection = F::Connection;

    fn make_new(&self, cancel: &CancelSignal) -> DriverResult<Option<Self::Connection>> {
        (**self).make_new(cancel)
    }
}

impl<F: ConnectionFactory + ?Sized> ConnectionFactory for &F {
    type Connection = F::Connection;

    fn make_new(&self, cancel: &CancelSignal) -> DriverResult<Option<Self::Connection>> {
        (**self).make_new(cancel)
    }
}
