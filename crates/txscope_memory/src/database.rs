//! Shared in-memory store.

use crate::connection::MemoryConnectionFactory;
use crate::error::{MemoryError, MemoryResult};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use txscope_core::DriverOperation;

pub(crate) type Tables = BTreeMap<String, BTreeMap<String, String>>;

/// An in-memory database of named key/value tables.
///
/// Cloning is cheap; every clone, connection and transaction shares the same
/// tables, call statistics and fault plan.
///
/// # Thread Safety
///
/// The tables sit behind a `RwLock`; commits apply their writes under a single
/// write lock, so readers never observe half a transaction.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    counters: Counters,
    faults: Mutex<FaultPlan>,
}

impl MemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a connection factory for this database.
    #[must_use]
    pub fn connection_factory(&self) -> MemoryConnectionFactory {
        MemoryConnectionFactory::new(self.clone())
    }

    /// Reads a committed value.
    #[must_use]
    pub fn get(&self, table: &str, key: &str) -> Option<String> {
        self.shared
            .tables
            .read()
            .get(table)
            .and_then(|rows| rows.get(key).cloned())
    }

    /// Returns the committed keys of a table in order.
    #[must_use]
    pub fn keys(&self, table: &str) -> Vec<String> {
        self.shared
            .tables
            .read()
            .get(table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of committed rows in a table.
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.shared
            .tables
            .read()
            .get(table)
            .map_or(0, BTreeMap::len)
    }

    /// Returns true if the table has no committed rows.
    #[must_use]
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Returns a snapshot of the call statistics.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        self.shared.counters.snapshot()
    }

    /// Makes the next call of `operation` fail.
    pub fn inject_fault(&self, operation: DriverOperation) {
        self.shared.faults.lock().failing.insert(operation);
    }

    /// Makes the next connection request yield no connection at all.
    pub fn yield_no_connection(&self) {
        self.shared.faults.lock().yield_nothing = true;
    }

    /// Consumes an injected fault for `operation`, if any.
    pub(crate) fn trip(&self, operation: DriverOperation) -> MemoryResult<()> {
        if self.shared.faults.lock().failing.remove(&operation) {
            tracing::debug!(%operation, "injected fault triggered");
            return Err(MemoryError::InjectedFault(operation));
        }
        Ok(())
    }

    pub(crate) fn take_yield_nothing(&self) -> bool {
        std::mem::take(&mut self.shared.faults.lock().yield_nothing)
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.shared.counters
    }

    pub(crate) fn read_committed(&self, table: &str, key: &str) -> Option<String> {
        self.get(table, key)
    }

    pub(crate) fn with_tables_mut<R>(&self, apply: impl FnOnce(&mut Tables) -> R) -> R {
        apply(&mut self.shared.tables.write())
    }
}

/// Faults waiting to be triggered.
#[derive(Debug, Default)]
struct FaultPlan {
    failing: HashSet<DriverOperation>,
    yield_nothing: bool,
}

/// Counts of driver calls that succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Connections handed out by a factory.
    pub connections_made: u64,
    /// Connections opened.
    pub opens: u64,
    /// Connections closed.
    pub closes: u64,
    /// Connections currently open. Dropping an open connection releases it.
    pub live_connections: u64,
    /// Transactions begun.
    pub transactions_begun: u64,
    /// Transactions committed.
    pub commits: u64,
    /// Transactions rolled back, including active ones that were dropped.
    pub rollbacks: u64,
    /// Transactions dropped while still active. Each also counts as a
    /// rollback.
    pub discarded: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    connections_made: AtomicU64,
    opens: AtomicU64,
    closes: AtomicU64,
    live_connections: AtomicU64,
    transactions_begun: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    discarded: AtomicU64,
}

impl Counters {
    pub(crate) fn connection_made(&self) {
        self.connections_made.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn opened(&self) {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.live_connections.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn closed(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.released();
    }

    /// An open connection went away, closed or not.
    pub(crate) fn released(&self) {
        self.live_connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn begun(&self) {
        self.transactions_begun.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn committed(&self) {
        self.commits.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn rolled_back(&self) {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn discarded(&self) {
        self.discarded.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> MemoryStats {
        MemoryStats {
            connections_made: self.connections_made.load(Ordering::SeqCst),
            opens: self.opens.load(Ordering::SeqCst),
            closes: self.closes.load(Ordering::SeqCst),
            live_connections: self.live_connections.load(Ordering::SeqCst),
            transactions_begun: self.transactions_begun.load(Ordering::SeqCst),
            commits: self.commits.load(Ordering::SeqCst),
            rollbacks: self.rollbacks.load(Ordering::SeqCst),
            discarded: self.discarded.load(Ordering::SeqCst),
        }
    }
}
