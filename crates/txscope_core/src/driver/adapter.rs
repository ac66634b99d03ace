//! Blocking drivers seen through the suspendable traits.
//!
//! Every future produced here finishes on its first poll, because the
//! wrapped call runs to completion before the future is returned to the
//! caller's executor. The blocking unit of work relies on this to drive the
//! shared operation engine with a plain `block_on`.

use super::blocking::{Connection, ConnectionFactory, Transaction};
use super::nonblocking::{AsyncConnection, AsyncConnectionFactory, AsyncTransaction};
use crate::cancel::CancelSignal;
use crate::error::DriverResult;
use crate::options::IsolationLevel;
use async_trait::async_trait;

/// A [`ConnectionFactory`] driven as an [`AsyncConnectionFactory`].
#[derive(Debug)]
pub(crate) struct Blocking<F>(F);

/// A [`Connection`] driven as an [`AsyncConnection`].
#[derive(Debug)]
pub(crate) struct BlockingConnection<C>(C);

/// A [`Transaction`] driven as an [`AsyncTransaction`].
#[derive(Debug)]
pub(crate) struct BlockingTransaction<T>(T);

impl<F> Blocking<F> {
    pub(crate) fn new(factory: F) -> Self {
        Self(factory)
    }

    pub(crate) fn get_ref(&self) -> &F {
        &self.0
    }
}

impl<C> BlockingConnection<C> {
    pub(crate) fn get_ref(&self) -> &C {
        &self.0
    }
}

impl<T> BlockingTransaction<T> {
    pub(crate) fn get_ref(&self) -> &T {
        &self.0
    }
}

#[async_trait]
impl<F: ConnectionFactory> AsyncConnectionFactory for Blocking<F> {
    type Connection = BlockingConnection<F::Connection>;

    async fn make_new(&self, cancel: &CancelSignal) -> DriverResult<Option<Self::Connection>> {
        Ok(ConnectionFactory::make_new(&self.0, cancel)?.map(BlockingConnection))
    }
}

#[async_trait]
impl<C: Connection> AsyncConnection for BlockingConnection<C> {
    type Transaction = BlockingTransaction<C::Transaction>;

    async fn open(&mut self, cancel: &CancelSignal) -> DriverResult<()> {
        Connection::open(&mut self.0, cancel)
    }

    async fn close(&mut self) -> DriverResult<()> {
        Connection::close(&mut self.0)
    }

    async fn begin_transaction(
        &mut self,
        isolation: IsolationLevel,
        cancel: &CancelSignal,
    ) -> DriverResult<Self::Transaction> {
        Connection::begin_transaction(&mut self.0, isolation, cancel).map(BlockingTransaction)
    }
}

#[async_trait]
impl<T: Transaction> AsyncTransaction for BlockingTransaction<T> {
    async fn commit(&mut self, cancel: &CancelSignal) -> DriverResult<()> {
        Transaction::commit(&mut self.0, cancel)
    }

    async fn rollback(&mut self, cancel: &CancelSignal) -> DriverResult<()> {
        Transaction::rollback(&mut self.0, cancel)
    }
}
