//! In-memory transactions with staged writes.

use crate::database::MemoryDatabase;
use crate::error::{MemoryError, MemoryResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use txscope_core::{
    AsyncTransaction, CancelSignal, DriverOperation, DriverResult, IsolationLevel, Transaction,
};
use uuid::Uuid;

/// Lifecycle of a [`MemoryTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Writes can be staged.
    Active,
    /// Staged writes were applied.
    Committed,
    /// Staged writes were discarded.
    RolledBack,
}

impl TransactionState {
    /// Returns true if the transaction can still stage writes.
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        }
    }
}

/// A write staged by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingWrite {
    Put(String),
    Delete,
}

type WriteKey = (String, String);

/// A transaction on a [`crate::MemoryConnection`].
///
/// Writes are staged in the transaction and only reach the shared tables on
/// commit. Reads through the transaction see its own staged writes on top of
/// the committed data.
#[derive(Debug)]
pub struct MemoryTransaction {
    id: Uuid,
    connection_id: Uuid,
    isolation: IsolationLevel,
    db: MemoryDatabase,
    state: TransactionState,
    writes: Mutex<BTreeMap<WriteKey, PendingWrite>>,
}

impl MemoryTransaction {
    pub(crate) fn new(db: MemoryDatabase, connection_id: Uuid, isolation: IsolationLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection_id,
            isolation,
            db,
            state: TransactionState::Active,
            writes: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the transaction's unique id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the id of the connection the transaction runs on.
    #[must_use]
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Returns the isolation level the transaction was begun with.
    #[must_use]
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns the number of staged writes.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.writes.lock().len()
    }

    pub(crate) fn stage(&self, table: &str, key: String, write: PendingWrite) -> MemoryResult<()> {
        self.ensure_active()?;
        self.writes.lock().insert((table.to_owned(), key), write);
        Ok(())
    }

    pub(crate) fn read(&self, table: &str, key: &str) -> MemoryResult<Option<String>> {
        self.ensure_active()?;
        let staged = self
            .writes
            .lock()
            .get(&(table.to_owned(), key.to_owned()))
            .cloned();
        Ok(match staged {
            Some(PendingWrite::Put(value)) => Some(value),
            Some(PendingWrite::Delete) => None,
            None => self.db.read_committed(table, key),
        })
    }

    pub(crate) fn keys(&self, table: &str) -> MemoryResult<Vec<String>> {
        self.ensure_active()?;
        let mut keys: BTreeSet<String> = self.db.keys(table).into_iter().collect();
        for ((staged_table, key), write) in self.writes.lock().iter() {
            if staged_table != table {
                continue;
            }
            match write {
                PendingWrite::Put(_) => {
                    keys.insert(key.clone());
                }
                PendingWrite::Delete => {
                    keys.remove(key);
                }
            }
        }
        Ok(keys.into_iter().collect())
    }

    fn ensure_active(&self) -> MemoryResult<()> {
        if self.state.is_active() {
            Ok(())
        } else {
            Err(MemoryError::TransactionCompleted(self.state.label()))
        }
    }

    fn apply_commit(&mut self) -> MemoryResult<()> {
        self.ensure_active()?;
        self.db.trip(DriverOperation::Commit)?;

        let writes = std::mem::take(self.writes.get_mut());
        let count = writes.len();
        self.db.with_tables_mut(|tables| {
            for ((table, key), write) in writes {
                let rows = tables.entry(table).or_default();
                match write {
                    PendingWrite::Put(value) => {
                        rows.insert(key, value);
                    }
                    PendingWrite::Delete => {
                        rows.remove(&key);
                    }
                }
            }
        });

        self.state = TransactionState::Committed;
        self.db.counters().committed();
        tracing::trace!(transaction = %self.id, writes = count, "memory transaction committed");
        Ok(())
    }

    fn apply_rollback(&mut self) -> MemoryResult<()> {
        self.ensure_active()?;
        self.db.trip(DriverOperation::Rollback)?;

        self.writes.lock().clear();
        self.state = TransactionState::RolledBack;
        self.db.counters().rolled_back();
        tracing::trace!(transaction = %self.id, "memory transaction rolled back");
        Ok(())
    }
}

impl Transaction for MemoryTransaction {
    fn commit(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        Ok(self.apply_commit()?)
    }

    fn rollback(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        Ok(self.apply_rollback()?)
    }
}

#[async_trait]
impl AsyncTransaction for MemoryTransaction {
    async fn commit(&mut self, cancel: &CancelSignal) -> DriverResult<()> {
        tokio::task::yield_now().await;
        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled.into());
        }
        Ok(self.apply_commit()?)
    }

    async fn rollback(&mut self, _cancel: &CancelSignal) -> DriverResult<()> {
        tokio::task::yield_now().await;
        Ok(self.apply_rollback()?)
    }
}

/// Dropping an active transaction rolls it back: its staged writes are lost
/// and it counts both as discarded and as a rollback.
impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.state.is_active() {
            self.writes.get_mut().clear();
            self.state = TransactionState::RolledBack;
            self.db.counters().discarded();
            self.db.counters().rolled_back();
            tracing::trace!(transaction = %self.id, "memory transaction rolled back on drop");
        }
    }
}
