//! # txscope core
//!
//! Transaction-scoped coordination of a database connection and the
//! transaction running on it.
//!
//! This crate provides:
//! - [`UnitOfWork`] and [`AsyncUnitOfWork`], one state machine driven by a
//!   blocking or a non-blocking driver
//! - [`UnitOfWorkOptions`], the policy for redundant open/begin attempts
//! - [`UnitOfWorkController`] and [`AsyncUnitOfWorkController`], scope guards
//!   that commit by default and roll back on request
//! - [`Session`], the read-only view handed to data-access code
//! - the [`driver`] capability traits a database driver implements
//!
//! ## Key Invariants
//!
//! - A transaction is only ever held together with its connection
//! - Commit and rollback always close the connection
//! - The connection cannot be closed while a transaction runs, whatever the
//!   options say
//! - An operation either completes or leaves the state exactly as it found it
//!
//! ## Example
//!
//! ```rust,ignore
//! use txscope_core::{UnitOfWork, UnitOfWorkController};
//!
//! let mut uow = UnitOfWork::new(factory);
//! UnitOfWorkController::run(&mut uow, |scope| {
//!     things.insert(&**scope, "thing")?;
//!     Ok::<_, AppError>(())
//! })?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod controller;
pub mod driver;
mod error;
mod factory;
mod options;
mod session;
mod state;
mod unit_of_work;

#[cfg(test)]
mod fake;

pub use cancel::CancelSignal;
pub use controller::{AsyncUnitOfWorkController, ScopeFuture, UnitOfWorkController};
pub use driver::blocking::{Connection, ConnectionFactory, Transaction};
pub use driver::nonblocking::{AsyncConnection, AsyncConnectionFactory, AsyncTransaction};
pub use error::{
    BoxError, DriverError, DriverOperation, DriverResult, StateViolation, UowError, UowResult,
};
pub use factory::UnitOfWorkFactory;
pub use options::{IsolationLevel, OptionsOrigin, OptionsProvider, OptionsSource, UnitOfWorkOptions};
pub use session::Session;
pub use state::SessionState;
pub use unit_of_work::{AsyncTransactional, AsyncUnitOfWork, Transactional, UnitOfWork};

/// Re-export of `async_trait` for drivers implementing the suspendable traits.
pub use async_trait::async_trait;
