//! Property-based test generators using proptest.
//!
//! Random operation sequences are replayed against a unit of work and against
//! [`expected_transition`], a plain model of the state machine.

use proptest::prelude::*;
use txscope_core::{
    AsyncConnectionFactory, AsyncUnitOfWork, ConnectionFactory, IsolationLevel, SessionState,
    StateViolation, UnitOfWork, UnitOfWorkOptions, UowResult,
};

/// One operation on a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `open_connection`
    Open,
    /// `close_connection`
    Close,
    /// `begin_transaction`
    Begin,
    /// `commit_transaction`
    Commit,
    /// `rollback_transaction`
    Rollback,
}

impl Operation {
    /// Applies the operation to a blocking unit of work.
    pub fn apply<F: ConnectionFactory>(self, uow: &mut UnitOfWork<F>) -> UowResult<()> {
        match self {
            Self::Open => uow.open_connection(),
            Self::Close => uow.close_connection(),
            Self::Begin => uow.begin_transaction(),
            Self::Commit => uow.commit_transaction(),
            Self::Rollback => uow.rollback_transaction(),
        }
    }

    /// Applies the operation to a suspendable unit of work.
    pub async fn apply_async<F: AsyncConnectionFactory>(
        self,
        uow: &mut AsyncUnitOfWork<F>,
    ) -> UowResult<()> {
        match self {
            Self::Open => uow.open_connection().await,
            Self::Close => uow.close_connection().await,
            Self::Begin => uow.begin_transaction().await,
            Self::Commit => uow.commit_transaction().await,
            Self::Rollback => uow.rollback_transaction().await,
        }
    }
}

/// Predicts the state after `operation`, assuming every driver call succeeds.
///
/// # Errors
///
/// The state violation the unit of work must report; its state is then
/// unchanged.
pub fn expected_transition(
    state: SessionState,
    operation: Operation,
    options: &UnitOfWorkOptions,
) -> Result<SessionState, StateViolation> {
    use SessionState::{ConnectionOpen, Idle, InTransaction};

    match (operation, state) {
        (Operation::Open, Idle) => Ok(ConnectionOpen),
        (Operation::Open, _) if options.error_on_multiple_connection_attempts => {
            Err(StateViolation::AlreadyOpen)
        }
        (Operation::Open, other) => Ok(other),

        (Operation::Close, InTransaction) => Err(StateViolation::TransactionInProgress),
        (Operation::Close, _) => Ok(Idle),

        (Operation::Begin, InTransaction) if options.error_on_multiple_transaction_attempts => {
            Err(StateViolation::AlreadyInTransaction)
        }
        (Operation::Begin, _) => Ok(InTransaction),

        (Operation::Commit | Operation::Rollback, InTransaction) => Ok(Idle),
        (Operation::Commit | Operation::Rollback, _) => Err(StateViolation::NoActiveTransaction),
    }
}

/// Strategy for a single operation.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Open),
        Just(Operation::Close),
        Just(Operation::Begin),
        Just(Operation::Commit),
        Just(Operation::Rollback),
    ]
}

/// Strategy for sequences of up to `max_len` operations.
pub fn arb_operations(max_len: usize) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation_strategy(), 0..=max_len)
}

/// Strategy for every combination of options.
pub fn arb_options() -> impl Strategy<Value = UnitOfWorkOptions> {
    (
        any::<bool>(),
        any::<bool>(),
        prop_oneof![
            Just(IsolationLevel::ReadUncommitted),
            Just(IsolationLevel::ReadCommitted),
            Just(IsolationLevel::RepeatableRead),
            Just(IsolationLevel::Serializable),
            Just(IsolationLevel::Snapshot),
        ],
    )
        .prop_map(|(connections, transactions, isolation)| {
            UnitOfWorkOptions::strict()
                .with_error_on_multiple_connection_attempts(connections)
                .with_error_on_multiple_transaction_attempts(transactions)
                .with_isolation_level(isolation)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_refuses_close_during_transaction_under_any_options() {
        for options in [UnitOfWorkOptions::strict(), UnitOfWorkOptions::lenient()] {
            assert_eq!(
                expected_transition(SessionState::InTransaction, Operation::Close, &options),
                Err(StateViolation::TransactionInProgress)
            );
        }
    }

    #[test]
    fn model_tolerates_repeats_when_lenient() {
        let lenient = UnitOfWorkOptions::lenient();
        assert_eq!(
            expected_transition(SessionState::InTransaction, Operation::Begin, &lenient),
            Ok(SessionState::InTransaction)
        );
        assert_eq!(
            expected_transition(SessionState::InTransaction, Operation::Open, &lenient),
            Ok(SessionState::InTransaction)
        );
    }
}
