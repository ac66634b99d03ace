//! Blocking unit of work.

use super::engine::Engine;
use super::Transactional;
use crate::cancel::CancelSignal;
use crate::driver::adapter::{Blocking, BlockingConnection, BlockingTransaction};
use crate::driver::blocking::{Connection, ConnectionFactory};
use crate::error::UowResult;
use crate::options::{OptionsSource, UnitOfWorkOptions};
use crate::session::Session;
use crate::state::{Completion, SessionState};
use futures::executor::block_on;
use std::fmt;

type TransactionOf<F> = <<F as ConnectionFactory>::Connection as Connection>::Transaction;

/// A unit of work over a blocking driver.
///
/// Connections come from the factory on demand. A transaction can only run
/// on an open connection, and committing or rolling it back also closes the
/// connection.
///
/// The operations share their step sequence with [`super::AsyncUnitOfWork`];
/// here every driver call simply completes before the step returns.
///
/// # Example
///
/// ```rust,ignore
/// let mut uow = UnitOfWork::new(factory);
/// uow.begin_transaction()?; // opens the connection too
/// repository.insert(&uow, thing)?;
/// uow.commit_transaction()?; // commits and closes
/// ```
pub struct UnitOfWork<F: ConnectionFactory> {
    engine: Engine<Blocking<F>>,
}

impl<F: ConnectionFactory> UnitOfWork<F> {
    /// Creates a unit of work with strict options.
    pub fn new(factory: F) -> Self {
        Self::with_options(factory, UnitOfWorkOptions::strict())
    }

    /// Creates a unit of work with the given options or options source.
    pub fn with_options(factory: F, options: impl Into<OptionsSource>) -> Self {
        Self {
            engine: Engine::new(Blocking::new(factory), options.into()),
        }
    }

    /// Creates a unit of work whose options are resolved by `provider` at
    /// each decision. A provider returning `None` means strict options.
    pub fn with_options_provider<P>(factory: F, provider: P) -> Self
    where
        P: Fn() -> Option<UnitOfWorkOptions> + Send + Sync + 'static,
    {
        Self::with_options(factory, OptionsSource::provider(provider))
    }

    /// Replaces the cancel signal, e.g. with one shared by a whole request.
    #[must_use]
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.engine.set_cancel_signal(cancel);
        self
    }

    /// Returns the currently resolved options.
    pub fn options(&self) -> UnitOfWorkOptions {
        self.engine.options()
    }

    /// Returns a handle to this unit of work's cancel signal.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.engine.cancel_signal().clone()
    }

    /// Returns the connection factory.
    pub fn factory(&self) -> &F {
        self.engine.factory().get_ref()
    }

    /// Opens a connection.
    ///
    /// # Errors
    ///
    /// - [`crate::StateViolation::AlreadyOpen`] if a connection is held and the
    ///   options reject multiple connection attempts (otherwise a no-op)
    /// - [`crate::UowError::FactoryContractViolation`] if the factory yields
    ///   nothing
    /// - [`crate::UowError::Cancelled`] or [`crate::UowError::Driver`]
    pub fn open_connection(&mut self) -> UowResult<()> {
        block_on(self.engine.open_connection())
    }

    /// Closes the connection. Closing while idle is a no-op.
    ///
    /// The connection is released even if the driver fails to close it.
    ///
    /// # Errors
    ///
    /// [`crate::StateViolation::TransactionInProgress`] while a transaction is
    /// running, whatever the options say.
    pub fn close_connection(&mut self) -> UowResult<()> {
        block_on(self.engine.close_connection())
    }

    /// Begins a transaction, opening a connection first when idle.
    ///
    /// When a connection has to be opened and beginning the transaction then
    /// fails, that connection is closed again and the unit of work stays idle.
    ///
    /// # Errors
    ///
    /// [`crate::StateViolation::AlreadyInTransaction`] if a transaction is
    /// running and the options reject multiple transaction attempts
    /// (otherwise a no-op), plus everything [`Self::open_connection`] returns.
    pub fn begin_transaction(&mut self) -> UowResult<()> {
        block_on(self.engine.begin_transaction())
    }

    /// Commits the running transaction, then closes the connection.
    ///
    /// If the commit fails, the transaction and connection are kept.
    ///
    /// # Errors
    ///
    /// [`crate::StateViolation::NoActiveTransaction`] without a transaction.
    pub fn commit_transaction(&mut self) -> UowResult<()> {
        block_on(self.engine.complete(Completion::Commit))
    }

    /// Rolls back the running transaction, then closes the connection.
    ///
    /// If the rollback fails, the transaction and connection are kept.
    ///
    /// # Errors
    ///
    /// [`crate::StateViolation::NoActiveTransaction`] without a transaction.
    pub fn rollback_transaction(&mut self) -> UowResult<()> {
        block_on(self.engine.complete(Completion::Rollback))
    }

    /// Releases the transaction and connection without committing or rolling
    /// back. Safe to call in any state and more than once; never fails.
    pub fn dispose(&mut self) {
        block_on(self.engine.dispose());
    }
}

impl<F: ConnectionFactory> Session for UnitOfWork<F> {
    type Connection = F::Connection;
    type Transaction = TransactionOf<F>;

    fn connection(&self) -> Option<&Self::Connection> {
        self.engine.connection().map(BlockingConnection::get_ref)
    }

    fn transaction(&self) -> Option<&Self::Transaction> {
        self.engine.transaction().map(BlockingTransaction::get_ref)
    }

    fn state(&self) -> SessionState {
        self.engine.state()
    }
}

impl<F: ConnectionFactory> Transactional for UnitOfWork<F> {
    fn begin_transaction(&mut self) -> UowResult<()> {
        UnitOfWork::begin_transaction(self)
    }

    fn commit_transaction(&mut self) -> UowResult<()> {
        UnitOfWork::commit_transaction(self)
    }

    fn rollback_transaction(&mut self) -> UowResult<()> {
        UnitOfWork::rollback_transaction(self)
    }
}

impl<F: ConnectionFactory> Drop for UnitOfWork<F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<F: ConnectionFactory> fmt::Debug for UnitOfWork<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("state", &self.engine.state())
            .field("options", self.engine.options_source())
            .field("cancelled", &self.engine.cancel_signal().is_cancelled())
            .finish()
    }
}
