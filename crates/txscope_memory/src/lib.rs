//! # txscope memory
//!
//! An in-memory database driver implementing both the blocking and the
//! suspendable capability traits of `txscope_core`.
//!
//! It is meant for tests and examples. Data lives in named key/value tables
//! shared by every connection made on the same [`MemoryDatabase`]. Writes made
//! inside a [`MemoryTransaction`] only become visible to other connections on
//! commit.
//!
//! The database also counts successful driver calls ([`MemoryStats`]) and can
//! be told to fail the next call of a given operation, which makes the
//! all-or-nothing behaviour of a unit of work observable from a test.
//!
//! ```rust
//! use txscope_core::{Session, UnitOfWork};
//! use txscope_memory::MemoryDatabase;
//!
//! let db = MemoryDatabase::new();
//! let mut uow = UnitOfWork::new(db.connection_factory());
//! uow.begin_transaction()?;
//! if let Some(connection) = uow.connection() {
//!     connection.insert(uow.transaction(), "things", "a", "1")?;
//! }
//! assert_eq!(db.get("things", "a"), None);
//!
//! uow.commit_transaction()?;
//! assert_eq!(db.get("things", "a").as_deref(), Some("1"));
//! assert_eq!(db.stats().live_connections, 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod database;
mod error;
mod transaction;

pub use connection::{MemoryConnection, MemoryConnectionFactory};
pub use database::{MemoryDatabase, MemoryStats};
pub use error::{MemoryError, MemoryResult};
pub use transaction::{MemoryTransaction, TransactionState};
