//! Step sequence of every unit of work operation.
//!
//! [`Engine`] is written once against the suspendable capability traits.
//! [`super::AsyncUnitOfWork`] awaits it directly; [`super::UnitOfWork`] runs
//! it over [`crate::driver::adapter`], whose futures finish on first poll.
//!
//! Every state check runs before the first `.await`. Capability calls run on
//! locals or on borrowed slots, and the slots change in a single step once
//! the calls have finished, so dropping an operation part way leaves the
//! state from before or after the call, never in between.

use crate::cancel::CancelSignal;
use crate::driver::nonblocking::{AsyncConnection, AsyncConnectionFactory, AsyncTransaction};
use crate::error::{DriverOperation, UowError, UowResult};
use crate::options::{IsolationLevel, OptionsSource, UnitOfWorkOptions};
use crate::state::{
    plan_begin, plan_close, plan_complete, plan_open, BeginStep, CloseStep, Completion, OpenStep,
    SessionState, Slots,
};
use tracing::{debug, trace, warn};

pub(crate) type TransactionOf<F> =
    <<F as AsyncConnectionFactory>::Connection as AsyncConnection>::Transaction;

pub(crate) struct Engine<F: AsyncConnectionFactory> {
    factory: F,
    options: OptionsSource,
    cancel: CancelSignal,
    slots: Slots<F::Connection, TransactionOf<F>>,
}

impl<F: AsyncConnectionFactory> Engine<F> {
    pub(crate) fn new(factory: F, options: OptionsSource) -> Self {
        Self {
            factory,
            options,
            cancel: CancelSignal::new(),
            slots: Slots::new(),
        }
    }

    pub(crate) fn set_cancel_signal(&mut self, cancel: CancelSignal) {
        self.cancel = cancel;
    }

    pub(crate) fn options(&self) -> UnitOfWorkOptions {
        self.options.resolve()
    }

    pub(crate) fn options_source(&self) -> &OptionsSource {
        &self.options
    }

    pub(crate) fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub(crate) fn factory(&self) -> &F {
        &self.factory
    }

    pub(crate) fn state(&self) -> SessionState {
        self.slots.state()
    }

    pub(crate) fn connection(&self) -> Option<&F::Connection> {
        self.slots.connection()
    }

    pub(crate) fn transaction(&self) -> Option<&TransactionOf<F>> {
        self.slots.transaction()
    }

    pub(crate) async fn open_connection(&mut self) -> UowResult<()> {
        match plan_open(self.slots.state(), &self.options.resolve())? {
            OpenStep::Skip => {
                trace!("connection already open, keeping it");
                Ok(())
            }
            OpenStep::Open => {
                let connection = connect(&self.factory, &self.cancel).await?;
                self.slots.install_connection(connection);
                debug!("connection opened");
                Ok(())
            }
        }
    }

    pub(crate) async fn close_connection(&mut self) -> UowResult<()> {
        match plan_close(self.slots.state())? {
            CloseStep::Skip => Ok(()),
            CloseStep::Close => {
                self.cancel.check()?;
                match self.slots.take_connection() {
                    Some(connection) => close(connection).await,
                    None => Ok(()),
                }
            }
        }
    }

    pub(crate) async fn begin_transaction(&mut self) -> UowResult<()> {
        let options = self.options.resolve();
        let isolation = options.isolation_level;
        match plan_begin(self.slots.state(), &options)? {
            BeginStep::Skip => {
                trace!("transaction already running, keeping it");
                Ok(())
            }
            BeginStep::Begin => {
                if let Some(connection) = self.slots.connection_mut() {
                    let transaction = begin(connection, isolation, &self.cancel).await?;
                    self.slots.install_transaction(transaction);
                    debug!(?isolation, "transaction begun");
                }
                Ok(())
            }
            BeginStep::OpenAndBegin => {
                let mut connection = connect(&self.factory, &self.cancel).await?;
                match begin(&mut connection, isolation, &self.cancel).await {
                    Ok(transaction) => {
                        self.slots.install_both(connection, transaction);
                        debug!(?isolation, "connection opened, transaction begun");
                        Ok(())
                    }
                    Err(err) => {
                        discard(connection).await;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Commits or rolls back, then closes. A failed completion keeps both
    /// handles; a failed close after a successful one still leaves the unit
    /// of work idle.
    pub(crate) async fn complete(&mut self, completion: Completion) -> UowResult<()> {
        plan_complete(self.slots.state())?;
        self.cancel.check()?;

        if let Some(transaction) = self.slots.transaction_mut() {
            let result = match completion {
                Completion::Commit => transaction.commit(&self.cancel).await,
                Completion::Rollback => transaction.rollback(&self.cancel).await,
            };
            result.map_err(|e| UowError::driver(completion.operation(), e))?;
        }

        let (connection, transaction) = self.slots.take_all();
        drop(transaction);
        debug!(?completion, "transaction completed");

        match connection {
            Some(connection) => close(connection).await,
            None => Ok(()),
        }
    }

    /// Drops the running transaction without a driver call, leaving the
    /// connection open. Returns false if no transaction was running.
    pub(crate) fn discard_transaction(&mut self) -> bool {
        match self.slots.take_transaction() {
            Some(transaction) => {
                drop(transaction);
                debug!("running transaction discarded");
                true
            }
            None => false,
        }
    }

    pub(crate) async fn dispose(&mut self) {
        let (connection, transaction) = self.slots.take_all();
        if transaction.is_some() {
            debug!("discarding running transaction");
        }
        drop(transaction);
        if let Some(connection) = connection {
            discard(connection).await;
        }
    }

    /// Drops both handles without a driver call.
    pub(crate) fn abandon(&mut self) {
        let (connection, transaction) = self.slots.take_all();
        if connection.is_some() {
            trace!(
                in_transaction = transaction.is_some(),
                "releasing a live connection without closing it"
            );
        }
    }
}

async fn connect<F: AsyncConnectionFactory>(
    factory: &F,
    cancel: &CancelSignal,
) -> UowResult<F::Connection> {
    cancel.check()?;
    let mut connection = factory
        .make_new(cancel)
        .await
        .map_err(|e| UowError::driver(DriverOperation::MakeConnection, e))?
        .ok_or(UowError::FactoryContractViolation)?;

    cancel.check()?;
    connection
        .open(cancel)
        .await
        .map_err(|e| UowError::driver(DriverOperation::Open, e))?;
    Ok(connection)
}

async fn begin<C: AsyncConnection>(
    connection: &mut C,
    isolation: IsolationLevel,
    cancel: &CancelSignal,
) -> UowResult<C::Transaction> {
    cancel.check()?;
    connection
        .begin_transaction(isolation, cancel)
        .await
        .map_err(|e| UowError::driver(DriverOperation::BeginTransaction, e))
}

async fn close<C: AsyncConnection>(mut connection: C) -> UowResult<()> {
    connection
        .close()
        .await
        .map_err(|e| UowError::driver(DriverOperation::Close, e))?;
    debug!("connection closed");
    Ok(())
}

/// Best-effort close used on cleanup paths.
async fn discard<C: AsyncConnection>(mut connection: C) {
    if let Err(err) = connection.close().await {
        warn!(error = %err, "failed to close connection during cleanup");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::adapter::Blocking;
    use crate::fake::{FakeFactory, Journal};
    use futures::executor::block_on;

    #[test]
    fn one_sequence_serves_both_driver_flavours() {
        let journal = Journal::default();
        let mut blocking = Engine::new(
            Blocking::new(FakeFactory::new(journal.clone())),
            OptionsSource::default(),
        );
        block_on(blocking.begin_transaction()).unwrap();
        block_on(blocking.complete(Completion::Commit)).unwrap();
        let blocking_calls = journal.entries();

        let journal = Journal::default();
        let mut suspendable =
            Engine::new(FakeFactory::new(journal.clone()), OptionsSource::default());
        block_on(suspendable.begin_transaction()).unwrap();
        block_on(suspendable.complete(Completion::Commit)).unwrap();

        assert_eq!(journal.entries(), blocking_calls);
        assert_eq!(blocking_calls, vec!["make", "open", "begin", "commit", "close"]);
    }

    #[test]
    fn discarding_keeps_the_connection() {
        let journal = Journal::default();
        let mut engine = Engine::new(FakeFactory::new(journal.clone()), OptionsSource::default());
        block_on(engine.begin_transaction()).unwrap();

        assert!(engine.discard_transaction());
        assert!(!engine.discard_transaction());
        assert_eq!(engine.state(), SessionState::ConnectionOpen);

        block_on(engine.begin_transaction()).unwrap();
        assert_eq!(journal.entries(), vec!["make", "open", "begin", "begin"]);
    }
}
