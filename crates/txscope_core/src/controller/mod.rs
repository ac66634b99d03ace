//! Scope guards tying a transaction to a lexical scope.
//!
//! A controller begins a transaction when it wraps a unit of work and
//! completes it exactly once: rollback if [`abort`](UnitOfWorkController::abort)
//! was called, commit otherwise.
//!
//! - [`UnitOfWorkController`] also completes from `Drop`
//! - [`AsyncUnitOfWorkController`] is released with `.await`; its `Drop`
//!   cannot wait for the driver and discards the transaction instead

mod blocking;
mod nonblocking;

pub use blocking::UnitOfWorkController;
pub use nonblocking::{AsyncUnitOfWorkController, ScopeFuture};

/// Completion status of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeStatus {
    /// Commits on release.
    Pending,
    /// Rolled back on request; releasing does nothing.
    Aborted,
    /// Committed.
    Released,
}
