//! Connection factories that never produce a usable connection.

use async_trait::async_trait;
use txscope_core::{
    AsyncConnection, AsyncConnectionFactory, AsyncTransaction, CancelSignal, Connection,
    ConnectionFactory, DriverError, DriverResult, IsolationLevel, Transaction,
};

/// A connection that cannot exist.
#[derive(Debug)]
pub enum NoConnection {}

/// A transaction that cannot exist.
#[derive(Debug)]
pub enum NoTransaction {}

/// A factory that breaks its contract by yielding no connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConnectionFactory;

/// A factory whose every request fails with a driver error.
#[derive(Debug, Clone, Default)]
pub struct FailingConnectionFactory {
    message: Option<String>,
}

impl FailingConnectionFactory {
    /// Creates a factory failing with `message`.
    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    fn error(&self) -> DriverError {
        DriverError::new(self.message.as_deref().unwrap_or("connection refused"))
    }
}

impl ConnectionFactory for NullConnectionFactory {
    type Connection = NoConnection;

    fn make_new(&self, _cancel: &CancelSignal) -> DriverResult<Option<NoConnection>> {
        Ok(None)
    }
}

impl ConnectionFactory for FailingConnectionFactory {
    type Connection = NoConnection;

    fn make_new(&self, _cancel: &CancelSignal) -> DriverResult<Option<NoConnection>> {
        Err(self.error())
    }
}

#[async_trait]
impl AsyncConnectionFactory for NullConnectionFactory {
    type Connection = NoConnection;

    async fn make_new(&self, _cancel: &CancelSignal) -> DriverResult<Option<NoConnection>> {
        Ok(None)
    }
}

#[async_trait]
impl AsyncConnectionFactory for FailingConnectionFactory {
    type Connection = NoConnection;

    async fn make_new(&self, _cancel: &CancelSignal) -> DriverResult<Option<NoConnection>> {
        Err(self.error())
    }
}

impl Connection for NoConnection {
    type Transaction = NoTransaction;

    fn open(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        match *self {}
    }

    fn close(&mut self) -> DriverResult<()> {
        match *self {}
    }

    fn begin_transaction(
        &mut self,
        _isolation: IsolationLevel,
        _cancel: &CancelSignal,
    ) -> DriverResult<NoTransaction> {
        match *self {}
    }
}

#[async_trait]
impl AsyncConnection for NoConnection {
    type Transaction = NoTransaction;

    async fn open(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        match *self {}
    }

    async fn close(&mut self) -> DriverResult<()> {
        match *self {}
    }

    async fn begin_transaction(
        &mut self,
        _isolation: IsolationLevel,
        _cancel: &CancelSignal,
    ) -> DriverResult<NoTransaction> {
        match *self {}
    }
}

impl Transaction for NoTransaction {
    fn commit(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        match *self {}
    }

    fn rollback(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        match *self {}
    }
}

#[async_trait]
impl AsyncTransaction for NoTransaction {
    async fn commit(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        match *self {}
    }

    async fn rollback(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        match *self {}
    }
}
