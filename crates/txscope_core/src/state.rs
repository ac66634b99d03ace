//! The unit of work state machine.
//!
//! The transition rules live here once, as pure planning functions over
//! [`SessionState`] and the resolved [`UnitOfWorkOptions`]. The operation
//! engine shared by both units of work asks these planners what to do before
//! it makes any capability call.
//!
//! ```text
//! Idle ──open──▶ ConnectionOpen ──begin──▶ InTransaction
//!  ▲  ◀──close──                                │
//!  └──────────────── commit / rollback ─────────┘
//! ```

use crate::error::{DriverOperation, StateViolation, UowResult};
use crate::options::UnitOfWorkOptions;

/// Observable state of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection.
    Idle,
    /// A connection is open, no transaction is running.
    ConnectionOpen,
    /// A transaction is running on the open connection.
    InTransaction,
}

impl SessionState {
    /// Returns true if a connection is held.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    /// Returns true if a transaction is running.
    #[must_use]
    pub fn has_transaction(&self) -> bool {
        matches!(self, SessionState::InTransaction)
    }
}

/// What `open_connection` must do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenStep {
    /// Make and open a new connection.
    Open,
    /// Keep the existing connection.
    Skip,
}

/// What `close_connection` must do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseStep {
    /// Close and release the connection.
    Close,
    /// Nothing is open.
    Skip,
}

/// What `begin_transaction` must do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BeginStep {
    /// Open a connection first, then begin on it.
    OpenAndBegin,
    /// Begin on the existing connection.
    Begin,
    /// Keep the running transaction.
    Skip,
}

/// How a transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    Commit,
    Rollback,
}

impl Completion {
    pub(crate) fn operation(self) -> DriverOperation {
        match self {
            Completion::Commit => DriverOperation::Commit,
            Completion::Rollback => DriverOperation::Rollback,
        }
    }
}

pub(crate) fn plan_open(state: SessionState, options: &UnitOfWorkOptions) -> UowResult<OpenStep> {
    match state {
        SessionState::Idle => Ok(OpenStep::Open),
        _ if options.error_on_multiple_connection_attempts => {
            Err(StateViolation::AlreadyOpen.into())
        }
        _ => Ok(OpenStep::Skip),
    }
}

/// Closing over a running transaction is refused whatever the options say.
pub(crate) fn plan_close(state: SessionState) -> UowResult<CloseStep> {
    match state {
        SessionState::Idle => Ok(CloseStep::Skip),
        SessionState::ConnectionOpen => Ok(CloseStep::Close),
        SessionState::InTransaction => Err(StateViolation::TransactionInProgress.into()),
    }
}

pub(crate) fn plan_begin(state: SessionState, options: &UnitOfWorkOptions) -> UowResult<BeginStep> {
    match state {
        SessionState::Idle => Ok(BeginStep::OpenAndBegin),
        SessionState::ConnectionOpen => Ok(BeginStep::Begin),
        SessionState::InTransaction if options.error_on_multiple_transaction_attempts => {
            Err(StateViolation::AlreadyInTransaction.into())
        }
        SessionState::InTransaction => Ok(BeginStep::Skip),
    }
}

/// Commit and rollback share the same precondition.
pub(crate) fn plan_complete(state: SessionState) -> UowResult<()> {
    if state.has_transaction() {
        Ok(())
    } else {
        Err(StateViolation::NoActiveTransaction.into())
    }
}

/// Connection and transaction slots of a unit of work.
///
/// Every mutation keeps `transaction.is_some() => connection.is_some()`.
#[derive(Debug)]
pub(crate) struct Slots<C, T> {
    connection: Option<C>,
    transaction: Option<T>,
}

impl<C, T> Slots<C, T> {
    pub(crate) fn new() -> Self {
        Self {
            connection: None,
            transaction: None,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        match (&self.connection, &self.transaction) {
            (None, _) => SessionState::Idle,
            (Some(_), None) => SessionState::ConnectionOpen,
            (Some(_), Some(_)) => SessionState::InTransaction,
        }
    }

    pub(crate) fn connection(&self) -> Option<&C> {
        self.connection.as_ref()
    }

    pub(crate) fn transaction(&self) -> Option<&T> {
        self.transaction.as_ref()
    }

    pub(crate) fn connection_mut(&mut self) -> Option<&mut C> {
        self.connection.as_mut()
    }

    pub(crate) fn transaction_mut(&mut self) -> Option<&mut T> {
        self.transaction.as_mut()
    }

    /// Installs an opened connection into an idle unit of work.
    pub(crate) fn install_connection(&mut self, connection: C) {
        debug_assert!(self.connection.is_none());
        self.connection = Some(connection);
    }

    /// Installs a transaction begun on the held connection.
    pub(crate) fn install_transaction(&mut self, transaction: T) {
        debug_assert!(self.connection.is_some() && self.transaction.is_none());
        if self.connection.is_some() {
            self.transaction = Some(transaction);
        }
    }

    /// Installs a connection and the transaction begun on it in one step.
    pub(crate) fn install_both(&mut self, connection: C, transaction: T) {
        debug_assert!(self.connection.is_none() && self.transaction.is_none());
        self.connection = Some(connection);
        self.transaction = Some(transaction);
    }

    /// Detaches the connection. Yields nothing while a transaction is held.
    pub(crate) fn take_connection(&mut self) -> Option<C> {
        if self.transaction.is_some() {
            return None;
        }
        self.connection.take()
    }

    /// Detaches the transaction, keeping the connection.
    pub(crate) fn take_transaction(&mut self) -> Option<T> {
        self.transaction.take()
    }

    /// Detaches both handles at once.
    pub(crate) fn take_all(&mut self) -> (Option<C>, Option<T>) {
        (self.connection.take(), self.transaction.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UowError;

    const STATES: [SessionState; 3] = [
        SessionState::Idle,
        SessionState::ConnectionOpen,
        SessionState::InTransaction,
    ];

    fn violation<T: std::fmt::Debug>(result: UowResult<T>) -> StateViolation {
        match result {
            Err(UowError::InvalidState(v)) => v,
            other => panic!("expected invalid state, got {other:?}"),
        }
    }

    #[test]
    fn open_from_idle_proceeds() {
        let step = plan_open(SessionState::Idle, &UnitOfWorkOptions::strict()).unwrap();
        assert_eq!(step, OpenStep::Open);
    }

    #[test]
    fn redundant_open_depends_on_policy() {
        for state in [SessionState::ConnectionOpen, SessionState::InTransaction] {
            let strict = plan_open(state, &UnitOfWorkOptions::strict());
            assert_eq!(violation(strict), StateViolation::AlreadyOpen);

            let lenient = plan_open(state, &UnitOfWorkOptions::lenient()).unwrap();
            assert_eq!(lenient, OpenStep::Skip);
        }
    }

    #[test]
    fn close_plans() {
        assert_eq!(plan_close(SessionState::Idle).unwrap(), CloseStep::Skip);
        assert_eq!(
            plan_close(SessionState::ConnectionOpen).unwrap(),
            CloseStep::Close
        );
        assert_eq!(
            violation(plan_close(SessionState::InTransaction)),
            StateViolation::TransactionInProgress
        );
    }

    #[test]
    fn begin_plans() {
        let strict = UnitOfWorkOptions::strict();
        assert_eq!(
            plan_begin(SessionState::Idle, &strict).unwrap(),
            BeginStep::OpenAndBegin
        );
        assert_eq!(
            plan_begin(SessionState::ConnectionOpen, &strict).unwrap(),
            BeginStep::Begin
        );
        assert_eq!(
            violation(plan_begin(SessionState::InTransaction, &strict)),
            StateViolation::AlreadyInTransaction
        );
        assert_eq!(
            plan_begin(SessionState::InTransaction, &UnitOfWorkOptions::lenient()).unwrap(),
            BeginStep::Skip
        );
    }

    #[test]
    fn redundant_begin_ignores_connection_policy() {
        let options = UnitOfWorkOptions::strict().with_error_on_multiple_connection_attempts(false);
        assert_eq!(
            violation(plan_begin(SessionState::InTransaction, &options)),
            StateViolation::AlreadyInTransaction
        );
    }

    #[test]
    fn complete_requires_transaction() {
        assert!(plan_complete(SessionState::InTransaction).is_ok());
        assert_eq!(
            violation(plan_complete(SessionState::Idle)),
            StateViolation::NoActiveTransaction
        );
        assert_eq!(
            violation(plan_complete(SessionState::ConnectionOpen)),
            StateViolation::NoActiveTransaction
        );
    }

    #[test]
    fn state_flags() {
        for state in STATES {
            if state.has_transaction() {
                assert!(state.has_connection());
            }
        }
    }

    #[test]
    fn slots_track_state() {
        let mut slots: Slots<u8, u16> = Slots::new();
        assert_eq!(slots.state(), SessionState::Idle);

        slots.install_connection(1);
        assert_eq!(slots.state(), SessionState::ConnectionOpen);

        slots.install_transaction(2);
        assert_eq!(slots.state(), SessionState::InTransaction);
        assert_eq!(slots.connection(), Some(&1));
        assert_eq!(slots.transaction(), Some(&2));
    }

    #[test]
    fn slots_refuse_to_detach_connection_under_transaction() {
        let mut slots: Slots<u8, u16> = Slots::new();
        slots.install_both(1, 2);

        assert_eq!(slots.take_connection(), None);
        assert_eq!(slots.state(), SessionState::InTransaction);

        assert_eq!(slots.take_all(), (Some(1), Some(2)));
        assert_eq!(slots.state(), SessionState::Idle);
    }

    #[test]
    fn detaching_transaction_keeps_connection() {
        let mut slots: Slots<u8, u16> = Slots::new();
        slots.install_both(1, 2);

        assert_eq!(slots.take_transaction(), Some(2));
        assert_eq!(slots.state(), SessionState::ConnectionOpen);
        assert_eq!(slots.take_transaction(), None);
    }
}
