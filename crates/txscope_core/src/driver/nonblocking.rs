//! Suspendable driver capabilities.
//!
//! Same shape as [`super::blocking`], for drivers with native non-blocking I/O.

use crate::cancel::CancelSignal;
use crate::error::DriverResult;
use crate::options::IsolationLevel;
use async_trait::async_trait;
use std::sync::Arc;

/// Produces new, unopened connections without blocking.
///
/// `Ok(None)` is a contract violation, as for
/// [`super::blocking::ConnectionFactory`].
#[async_trait]
pub trait AsyncConnectionFactory: Send + Sync {
    /// The connection type produced by this factory.
    type Connection: AsyncConnection;

    /// Creates a new connection.
    async fn make_new(&self, cancel: &CancelSignal) -> DriverResult<Option<Self::Connection>>;
}

/// A live channel to a database driven by a non-blocking driver.
#[async_trait]
pub trait AsyncConnection: Send {
    /// The transaction type begun on this connection.
    type Transaction: AsyncTransaction;

    /// Opens the connection.
    async fn open(&mut self, cancel: &CancelSignal) -> DriverResult<()>;

    /// Closes the connection.
    async fn close(&mut self) -> DriverResult<()>;

    /// Begins a transaction with the given isolation level.
    async fn begin_transaction(
        &mut self,
        isolation: IsolationLevel,
        cancel: &CancelSignal,
    ) -> DriverResult<Self::Transaction>;
}

/// A transaction running on an [`AsyncConnection`].
#[async_trait]
pub trait AsyncTransaction: Send {
    /// Makes every change in the transaction permanent.
    async fn commit(&mut self, cancel: &CancelSignal) -> DriverResult<()>;

    /// Discards every change in the transaction.
    async fn rollback(&mut self, cancel: &CancelSignal) -> DriverResult<()>;
}

#[async_trait]
impl<F: AsyncConnectionFactory + ?Sized> AsyncConnectionFactory for Arc<F> {
    type Connection = F::Connection;

    async fn make_new(&self, cancel: &CancelSignal) -> DriverResult<Option<Self::Connection>> {
        (**self).make_new(cancel).await
    }
}

#[async_trait]
impl<'a, F: AsyncConnectionFactory + ?Sized> AsyncConnectionFactory for &'a F {
    type Connection = F::Connection;

    async fn make_new(&self, cancel: &CancelSignal) -> DriverResult<Option<Self::Connection>> {
        (**self).make_new(cancel).await
    }
}
