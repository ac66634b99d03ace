//! Suspendable unit of work.
//!
//! Mirrors [`super::UnitOfWork`] call for call; both run the same step
//! sequence. Dropping one of these futures part way leaves the unit of work
//! in its state from before or after the call, never in between.

use super::engine::{Engine, TransactionOf};
use super::AsyncTransactional;
use crate::cancel::CancelSignal;
use crate::driver::nonblocking::AsyncConnectionFactory;
use crate::error::UowResult;
use crate::options::{OptionsSource, UnitOfWorkOptions};
use crate::session::Session;
use crate::state::{Completion, SessionState};
use async_trait::async_trait;
use std::fmt;

/// A unit of work over a non-blocking driver.
///
/// Unlike [`super::UnitOfWork`], dropping this type cannot await the driver:
/// `Drop` releases the handles without closing the connection. Call
/// [`AsyncUnitOfWork::dispose`] to close it in an orderly way.
pub struct AsyncUnitOfWork<F: AsyncConnectionFactory> {
    engine: Engine<F>,
}

impl<F: AsyncConnectionFactory> AsyncUnitOfWork<F> {
    /// Creates a unit of work with strict options.
    pub fn new(factory: F) -> Self {
        Self::with_options(factory, UnitOfWorkOptions::strict())
    }

    /// Creates a unit of work with the given options or options source.
    pub fn with_options(factory: F, options: impl Into<OptionsSource>) -> Self {
        Self {
            engine: Engine::new(factory, options.into()),
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
        self.engine.factory()
    }

    /// Opens a connection. See [`super::UnitOfWork::open_connection`].
    pub async fn open_connection(&mut self) -> UowResult<()> {
        self.engine.open_connection().await
    }

    /// Closes the connection. See [`super::UnitOfWork::close_connection`].
    pub async fn close_connection(&mut self) -> UowResult<()> {
        self.engine.close_connection().await
    }

    /// Begins a transaction. See [`super::UnitOfWork::begin_transaction`].
    pub async fn begin_transaction(&mut self) -> UowResult<()> {
        self.engine.begin_transaction().await
    }

    /// Commits, then closes. See [`super::UnitOfWork::commit_transaction`].
    pub async fn commit_transaction(&mut self) -> UowResult<()> {
        self.engine.complete(Completion::Commit).await
    }

    /// Rolls back, then closes. See [`super::UnitOfWork::rollback_transaction`].
    pub async fn rollback_transaction(&mut self) -> UowResult<()> {
        self.engine.complete(Completion::Rollback).await
    }

    /// Releases the transaction and closes the connection without committing
    /// or rolling back. Safe to call in any state and more than once.
    pub async fn dispose(&mut self) {
        self.engine.dispose().await;
    }
}

impl<F: AsyncConnectionFactory> Session for AsyncUnitOfWork<F> {
    type Connection = F::Connection;
    type Transaction = TransactionOf<F>;

    fn connection(&self) -> Option<&Self::Connection> {
        self.engine.connection()
    }

    fn transaction(&self) -> Option<&Self::Transaction> {
        self.engine.transaction()
    }

    fn state(&self) -> SessionState {
        self.engine.state()
    }
}

#[async_trait]
impl<F: AsyncConnectionFactory> AsyncTransactional for AsyncUnitOfWork<F> {
    async fn begin_transaction(&mut self) -> UowResult<()> {
        AsyncUnitOfWork::begin_transaction(self).await
    }

    async fn commit_transaction(&mut self) -> UowResult<()> {
        AsyncUnitOfWork::commit_transaction(self).await
    }

    async fn rollback_transaction(&mut self) -> UowResult<()> {
        AsyncUnitOfWork::rollback_transaction(self).await
    }

    fn discard_transaction(&mut self) {
        self.engine.discard_transaction();
    }
}

impl<F: AsyncConnectionFactory> Drop for AsyncUnitOfWork<F> {
    fn drop(&mut self) {
        self.engine.abandon();
    }
}

impl<F: AsyncConnectionFactory> fmt::Debug for AsyncUnitOfWork<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncUnitOfWork")
            .field("state", &self.engine.state())
            .field("options", self.engine.options_source())
            .field("cancelled", &self.engine.cancel_signal().is_cancelled())
            .finish()
    }
}
