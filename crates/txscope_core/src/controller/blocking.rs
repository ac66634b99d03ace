//! Blocking scope guard.

use super::ScopeStatus;
use crate::error::{StateViolation, UowError, UowResult};
use crate::unit_of_work::Transactional;
use std::ops::Deref;
use tracing::{error, warn};

/// Commits the wrapped transaction when the scope ends unless aborted.
///
/// Exactly one of commit or rollback is issued per successful
/// [`wrap`](Self::wrap):
///
/// - [`abort`](Self::abort) rolls back immediately
/// - [`release`](Self::release) commits and returns the outcome
/// - dropping a pending controller commits, or rolls back if the thread is
///   panicking; failures there can only be logged
///
/// # Example
///
/// ```rust,ignore
/// let mut uow = UnitOfWork::new(factory);
/// {
///     let mut scope = UnitOfWorkController::wrap(&mut uow)?;
///     repository.insert(&*scope, thing)?;
///     if !valid {
///         scope.abort()?;
///     }
/// } // committed here unless aborted
/// ```
#[must_use = "dropping the controller immediately commits the transaction"]
pub struct UnitOfWorkController<'s, S: Transactional> {
    scope: &'s mut S,
    status: ScopeStatus,
}

impl<'s, S: Transactional> UnitOfWorkController<'s, S> {
    /// Begins a transaction on `scope` and returns the guard controlling it.
    ///
    /// # Errors
    ///
    /// Whatever `begin_transaction` returns; no guard is created then.
    pub fn wrap(scope: &'s mut S) -> UowResult<Self> {
        scope.begin_transaction()?;
        Ok(Self {
            scope,
            status: ScopeStatus::Pending,
        })
    }

    /// Rolls the transaction back now. Releasing afterwards commits nothing.
    ///
    /// # Errors
    ///
    /// [`StateViolation::ScopeFinished`] if the controller already completed,
    /// otherwise whatever the rollback returns. The controller counts as
    /// aborted even if the rollback fails.
    pub fn abort(&mut self) -> UowResult<()> {
        if self.status != ScopeStatus::Pending {
            return Err(StateViolation::ScopeFinished.into());
        }
        self.status = ScopeStatus::Aborted;
        self.scope.rollback_transaction()
    }

    /// Returns true if [`abort`](Self::abort) was called.
    pub fn is_aborted(&self) -> bool {
        self.status == ScopeStatus::Aborted
    }

    /// Ends the scope: commits unless aborted.
    ///
    /// # Errors
    ///
    /// Whatever the commit returns.
    pub fn release(mut self) -> UowResult<()> {
        self.finish()
    }

    /// Runs `body` inside a controlled transaction.
    ///
    /// `Ok` commits unless the body aborted. `Err` rolls back unless the body
    /// aborted; the body's error is returned even if that rollback fails.
    pub fn run<T, E, B>(scope: &'s mut S, body: B) -> Result<T, E>
    where
        B: FnOnce(&mut Self) -> Result<T, E>,
        E: From<UowError>,
    {
        let mut controller = Self::wrap(scope)?;
        match body(&mut controller) {
            Ok(value) => {
                controller.release()?;
                Ok(value)
            }
            Err(err) => {
                if controller.status == ScopeStatus::Pending {
                    controller.status = ScopeStatus::Aborted;
                    if let Err(rollback_err) = controller.scope.rollback_transaction() {
                        warn!(error = %rollback_err, "rollback after failed scope body failed");
                    }
                }
                Err(err)
            }
        }
    }

    fn finish(&mut self) -> UowResult<()> {
        if self.status != ScopeStatus::Pending {
            return Ok(());
        }
        self.status = ScopeStatus::Released;
        self.scope.commit_transaction()
    }
}

impl<S: Transactional> Deref for UnitOfWorkController<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.scope
    }
}

impl<S: Transactional> Drop for UnitOfWorkController<'_, S> {
    fn drop(&mut self) {
        if self.status != ScopeStatus::Pending {
            return;
        }

        if std::thread::panicking() {
            self.status = ScopeStatus::Aborted;
            if let Err(err) = self.scope.rollback_transaction() {
                warn!(error = %err, "failed to roll back transaction while unwinding");
            }
        } else if let Err(err) = self.finish() {
            error!(error = %err, "failed to commit transaction on scope exit");
        }
    }
}
