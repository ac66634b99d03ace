//! Read-only view of the active connection and transaction.

use crate::state::SessionState;

/// Read-only view handed to data-access code.
///
/// Repositories read the current connection and transaction through this
/// trait. Changing either is the unit of work's job.
pub trait Session {
    /// The connection type.
    type Connection;
    /// The transaction type.
    type Transaction;

    /// Returns the open connection, if any.
    fn connection(&self) -> Option<&Self::Connection>;

    /// Returns the running transaction, if any.
    fn transaction(&self) -> Option<&Self::Transaction>;

    /// Returns the current state.
    fn state(&self) -> SessionState {
        match (self.connection().is_some(), self.transaction().is_some()) {
            (false, _) => SessionState::Idle,
            (true, false) => SessionState::ConnectionOpen,
            (true, true) => SessionState::InTransaction,
        }
    }
}
