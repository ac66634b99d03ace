//! Hands out units of work sharing one connection factory.

use crate::driver::blocking::ConnectionFactory;
use crate::driver::nonblocking::AsyncConnectionFactory;
use crate::options::{OptionsSource, UnitOfWorkOptions};
use crate::unit_of_work::{AsyncUnitOfWork, UnitOfWork};
use std::sync::Arc;

/// Creates units of work for callers that manage their lifetime by hand,
/// typically one per request.
///
/// Every unit of work shares the connection factory and the options source
/// but gets its own connection, transaction and cancel signal.
#[derive(Debug)]
pub struct UnitOfWorkFactory<F> {
    connections: Arc<F>,
    options: OptionsSource,
}

impl<F> UnitOfWorkFactory<F> {
    /// Creates a factory with strict options.
    pub fn new(connections: F) -> Self {
        Self::from_shared(Arc::new(connections))
    }

    /// Creates a factory around an already shared connection factory.
    pub fn from_shared(connections: Arc<F>) -> Self {
        Self {
            connections,
            options: OptionsSource::default(),
        }
    }

    /// Sets the options (or options provider) given to new units of work.
    #[must_use]
    pub fn with_options(mut self, options: impl Into<OptionsSource>) -> Self {
        self.options = options.into();
        self
    }

    /// Sets a provider resolving options for new units of work.
    #[must_use]
    pub fn with_options_provider<P>(self, provider: P) -> Self
    where
        P: Fn() -> Option<UnitOfWorkOptions> + Send + Sync + 'static,
    {
        self.with_options(OptionsSource::provider(provider))
    }

    /// Returns the shared connection factory.
    pub fn connections(&self) -> &Arc<F> {
        &self.connections
    }
}

impl<F: ConnectionFactory> UnitOfWorkFactory<F> {
    /// Creates a new blocking unit of work.
    pub fn make_new(&self) -> UnitOfWork<Arc<F>> {
        UnitOfWork::with_options(Arc::clone(&self.connections), self.options.clone())
    }
}

impl<F: AsyncConnectionFactory> UnitOfWorkFactory<F> {
    /// Creates a new suspendable unit of work.
    pub fn make_new_async(&self) -> AsyncUnitOfWork<Arc<F>> {
        AsyncUnitOfWork::with_options(Arc::clone(&self.connections), self.options.clone())
    }
}

impl<F> Clone for UnitOfWorkFactory<F> {
    fn clone(&self) -> Self {
        Self {
            connections: Arc::clone(&self.connections),
            options: self.options.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeFactory, Journal};
    use crate::session::Session;
    use crate::state::SessionState;

    #[test]
    fn units_of_work_are_independent() {
        let journal = Journal::default();
        let factory = UnitOfWorkFactory::new(FakeFactory::new(journal.clone()));

        let mut first = factory.make_new();
        let second = factory.make_new();
        first.begin_transaction().unwrap();

        assert_eq!(first.state(), SessionState::InTransaction);
        assert_eq!(second.state(), SessionState::Idle);

        first.cancel_signal().cancel();
        assert!(!second.cancel_signal().is_cancelled());
    }

    #[test]
    fn options_are_passed_on() {
        let journal = Journal::default();
        let factory = UnitOfWorkFactory::new(FakeFactory::new(journal))
            .with_options_provider(|| Some(UnitOfWorkOptions::lenient()));

        assert_eq!(factory.make_new().options(), UnitOfWorkOptions::lenient());
    }

    #[tokio::test]
    async fn makes_async_units_of_work() {
        let journal = Journal::default();
        let factory = UnitOfWorkFactory::new(FakeFactory::new(journal.clone()));

        let mut uow = factory.make_new_async();
        uow.open_connection().await.unwrap();
        uow.close_connection().await.unwrap();

        assert_eq!(journal.entries(), vec!["make", "open", "close"]);
    }
}
