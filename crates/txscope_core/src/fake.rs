//! Scripted driver for unit tests.

use crate::cancel::CancelSignal;
use crate::driver::blocking::{Connection, ConnectionFactory, Transaction};
use crate::driver::nonblocking::{AsyncConnection, AsyncConnectionFactory, AsyncTransaction};
use crate::error::{DriverError, DriverResult};
use crate::options::IsolationLevel;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Shared record of the driver calls that succeeded.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    inner: Arc<Mutex<JournalInner>>,
}

#[derive(Debug, Default)]
struct JournalInner {
    entries: Vec<&'static str>,
    fail_next: Option<&'static str>,
}

impl Journal {
    pub(crate) fn entries(&self) -> Vec<&'static str> {
        self.inner.lock().unwrap().entries.clone()
    }

    pub(crate) fn fail_next(&self, call: &'static str) {
        self.inner.lock().unwrap().fail_next = Some(call);
    }

    fn record(&self, call: &'static str) -> DriverResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next == Some(call) {
            inner.fail_next = None;
            return Err(DriverError::new(format!("{call} failed")));
        }
        inner.entries.push(call);
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct FakeFactory {
    journal: Journal,
}

impl FakeFactory {
    pub(crate) fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

#[derive(Debug)]
pub(crate) struct FakeConnection {
    journal: Journal,
}

#[derive(Debug)]
pub(crate) struct FakeTransaction {
    journal: Journal,
}

impl ConnectionFactory for FakeFactory {
    type Connection = FakeConnection;

    fn make_new(&self, _cancel: &CancelSignal) -> DriverResult<Option<FakeConnection>> {
        self.journal.record("make")?;
        Ok(Some(FakeConnection {
            journal: self.journal.clone(),
        }))
    }
}

impl Connection for FakeConnection {
    type Transaction = FakeTransaction;

    fn open(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        self.journal.record("open")
    }

    fn close(&mut self) -> DriverResult<()> {
        self.journal.record("close")
    }

    fn begin_transaction(
        &mut self,
        _isolation: IsolationLevel,
        _cancel: &CancelSignal,
    ) -> DriverResult<FakeTransaction> {
        self.journal.record("begin")?;
        Ok(FakeTransaction {
            journal: self.journal.clone(),
        })
    }
}

impl Transaction for FakeTransaction {
    fn commit(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        self.journal.record("commit")
    }

    fn rollback(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        self.journal.record("rollback")
    }
}

#[async_trait]
impl AsyncConnectionFactory for FakeFactory {
    type Connection = FakeConnection;

    async fn make_new(&self, cancel: &CancelSignal) -> DriverResult<Option<FakeConnection>> {
        ConnectionFactory::make_new(self, cancel)
    }
}

#[async_trait]
impl AsyncConnection for FakeConnection {
    type Transaction = FakeTransaction;

    async fn open(&mut self, cancel: &CancelSignal) -> DriverResult<()> {
        Connection::open(self, cancel)
    }

    async fn close(&mut self) -> DriverResult<()> {
        Connection::close(self)
    }

    async fn begin_transaction(
        &mut self,
        isolation: IsolationLevel,
        cancel: &CancelSignal,
    ) -> DriverResult<FakeTransaction> {
        Connection::begin_transaction(self, isolation, cancel)
    }
}

#[async_trait]
impl AsyncTransaction for FakeTransaction {
    async fn commit(&mut self, cancel: &CancelSignal) -> DriverResult<()> {
        Transaction::commit(self, cancel)
    }

    async fn rollback(&mut self, cancel: &CancelSignal) -> DriverResult<()> {
        Transaction::rollback(self, cancel)
    }
}
