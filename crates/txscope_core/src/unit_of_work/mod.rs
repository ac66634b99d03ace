//! Units of work.
//!
//! A unit of work owns at most one connection and at most one transaction on
//! it, created on demand and released together on commit, rollback or
//! disposal. Two variants share one step sequence, planned by the state
//! machine in [`crate::state`]:
//!
//! - [`UnitOfWork`] drives a [`crate::driver::blocking`] driver
//! - [`AsyncUnitOfWork`] drives a [`crate::driver::nonblocking`] driver
//!
//! Neither variant is meant to be shared between threads or tasks while an
//! operation runs; `&mut self` on every transition enforces this.

mod blocking;
mod engine;
mod nonblocking;

pub use blocking::UnitOfWork;
pub use nonblocking::AsyncUnitOfWork;

use crate::error::UowResult;
use async_trait::async_trait;

/// Transaction control used by [`crate::UnitOfWorkController`].
pub trait Transactional {
    /// Begins a transaction, opening a connection first if needed.
    fn begin_transaction(&mut self) -> UowResult<()>;

    /// Commits the running transaction and closes the connection.
    fn commit_transaction(&mut self) -> UowResult<()>;

    /// Rolls back the running transaction and closes the connection.
    fn rollback_transaction(&mut self) -> UowResult<()>;
}

/// Transaction control used by [`crate::AsyncUnitOfWorkController`].
#[async_trait]
pub trait AsyncTransactional: Send {
    /// Begins a transaction, opening a connection first if needed.
    async fn begin_transaction(&mut self) -> UowResult<()>;

    /// Commits the running transaction and closes the connection.
    async fn commit_transaction(&mut self) -> UowResult<()>;

    /// Rolls back the running transaction and closes the connection.
    async fn rollback_transaction(&mut self) -> UowResult<()>;

    /// Drops the running transaction without awaiting the driver, which
    /// rolls it back. The connection stays open. Used where a future cannot
    /// be awaited, such as `Drop`.
    fn discard_transaction(&mut self);
}
