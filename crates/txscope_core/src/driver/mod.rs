//! Driver capability traits.
//!
//! A unit of work never talks to a database directly. It asks a connection
//! factory for a connection, opens it, begins a transaction on it and later
//! commits or rolls back. These capabilities are supplied by a driver in one
//! of two flavours:
//!
//! - [`blocking`] - every call blocks the calling thread
//! - [`nonblocking`] - every call suspends the calling task
//!
//! Both flavours take the same arguments, the caller's [`crate::CancelSignal`]
//! included, so a driver can honour cancellation either way.
//!
//! Releasing a handle is `Drop`. A transaction that is dropped without a
//! commit must be rolled back by the driver.

pub(crate) mod adapter;
pub mod blocking;
pub mod nonblocking;
