//! A transactional scope that only counts calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use txscope_core::{
    AsyncTransactional, DriverError, DriverOperation, Transactional, UowError, UowResult,
};

/// Calls received by a [`RecordingScope`], failed ones included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Calls to `begin_transaction`.
    pub begins: u32,
    /// Calls to `commit_transaction`.
    pub commits: u32,
    /// Calls to `rollback_transaction`.
    pub rollbacks: u32,
    /// Calls to `discard_transaction`.
    pub discards: u32,
}

impl CallCounts {
    /// Builds counts from `(begins, commits, rollbacks)` with no discards.
    #[must_use]
    pub const fn new(begins: u32, commits: u32, rollbacks: u32) -> Self {
        Self {
            begins,
            commits,
            rollbacks,
            discards: 0,
        }
    }

    /// Returns the number of ways a transaction was ended.
    #[must_use]
    pub const fn completions(&self) -> u32 {
        self.commits + self.rollbacks + self.discards
    }
}

#[derive(Debug, Default)]
struct Recorded {
    counts: CallCounts,
    failing: Vec<DriverOperation>,
}

/// Implements both [`Transactional`] and [`AsyncTransactional`] by counting
/// calls, so controller behaviour can be checked without a driver.
///
/// Clones share their counts; keep one clone to inspect while the other is
/// borrowed by a controller.
#[derive(Debug, Clone, Default)]
pub struct RecordingScope {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingScope {
    /// Creates a scope whose calls all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call of `operation` fail. Only `BeginTransaction`,
    /// `Commit` and `Rollback` are meaningful here.
    #[must_use]
    pub fn failing_on(self, operation: DriverOperation) -> Self {
        self.recorded.lock().failing.push(operation);
        self
    }

    /// Returns the calls received so far.
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.recorded.lock().counts
    }

    fn record(&self, operation: DriverOperation) -> UowResult<()> {
        let mut recorded = self.recorded.lock();
        match operation {
            DriverOperation::BeginTransaction => recorded.counts.begins += 1,
            DriverOperation::Commit => recorded.counts.commits += 1,
            DriverOperation::Rollback => recorded.counts.rollbacks += 1,
            _ => {}
        }
        if recorded.failing.contains(&operation) {
            return Err(UowError::driver(
                operation,
                DriverError::new(format!("scripted {operation} failure")),
            ));
        }
        Ok(())
    }
}

impl Transactional for RecordingScope {
    fn begin_transaction(&mut self) -> UowResult<()> {
        self.record(DriverOperation::BeginTransaction)
    }

    fn commit_transaction(&mut self) -> UowResult<()> {
        self.record(DriverOperation::Commit)
    }

    fn rollback_transaction(&mut self) -> UowResult<()> {
        self.record(DriverOperation::Rollback)
    }
}

#[async_trait]
impl AsyncTransactional for RecordingScope {
    async fn begin_transaction(&mut self) -> UowResult<()> {
        self.record(DriverOperation::BeginTransaction)
    }

    async fn commit_transaction(&mut self) -> UowResult<()> {
        self.record(DriverOperation::Commit)
    }

    async fn rollback_transaction(&mut self) -> UowResult<()> {
        self.record(DriverOperation::Rollback)
    }

    fn discard_transaction(&mut self) {
        self.recorded.lock().counts.discards += 1;
    }
}
