//! Suspendable scope guard.

use super::ScopeStatus;
use crate::error::{StateViolation, UowError, UowResult};
use crate::unit_of_work::AsyncTransactional;
use futures::FutureExt;
use std::future::Future;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use tracing::warn;

/// Boxed future returned by the body passed to [`AsyncUnitOfWorkController::run`].
pub type ScopeFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

/// Async counterpart of [`crate::UnitOfWorkController`].
///
/// Completion is awaited on the normal paths: call [`release`](Self::release)
/// or [`abort`](Self::abort), or use [`run`](Self::run) which does it when its
/// body returns or panics. A controller dropped while still pending, for
/// instance because the future running it was cancelled, discards the
/// transaction through [`AsyncTransactional::discard_transaction`] and the
/// driver rolls it back. Either way the transaction completes exactly once.
///
/// # Example
///
/// ```rust,ignore
/// let id = AsyncUnitOfWorkController::run(&mut uow, |scope| {
///     Box::pin(async move {
///         let id = repository.insert(&**scope, thing).await?;
///         Ok::<_, AppError>(id)
///     })
/// })
/// .await?;
/// ```
#[must_use = "an async controller must be released or aborted"]
pub struct AsyncUnitOfWorkController<'s, S: AsyncTransactional> {
    scope: &'s mut S,
    status: ScopeStatus,
}

impl<'s, S: AsyncTransactional> AsyncUnitOfWorkController<'s, S> {
    /// Begins a transaction on `scope` and returns the guard controlling it.
    pub async fn wrap(scope: &'s mut S) -> UowResult<Self> {
        scope.begin_transaction().await?;
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
    /// otherwise whatever the rollback returns.
    pub async fn abort(&mut self) -> UowResult<()> {
        if self.status != ScopeStatus::Pending {
            return Err(StateViolation::ScopeFinished.into());
        }
        let result = self.scope.rollback_transaction().await;
        self.status = ScopeStatus::Aborted;
        result
    }

    /// Returns true if [`abort`](Self::abort) was called.
    pub fn is_aborted(&self) -> bool {
        self.status == ScopeStatus::Aborted
    }

    /// Ends the scope: commits unless aborted, and waits for the commit.
    pub async fn release(mut self) -> UowResult<()> {
        if self.status != ScopeStatus::Pending {
            return Ok(());
        }
        let result = self.scope.commit_transaction().await;
        self.status = ScopeStatus::Released;
        result
    }

    /// Runs `body` inside a controlled transaction.
    ///
    /// `Ok` commits unless the body aborted. `Err` rolls back unless the body
    /// aborted; the body's error is returned even if that rollback fails. A
    /// panic in the body is rolled back the same way, then resumed.
    pub async fn run<T, E, B>(scope: &'s mut S, body: B) -> Result<T, E>
    where
        B: for<'c> FnOnce(&'c mut AsyncUnitOfWorkController<'s, S>) -> ScopeFuture<'c, T, E>,
        E: From<UowError>,
    {
        let mut controller = Self::wrap(scope).await?;
        let guarded = AssertUnwindSafe(body(&mut controller));
        let outcome = guarded.catch_unwind().await;
        match outcome {
            Ok(Ok(value)) => {
                controller.release().await?;
                Ok(value)
            }
            Ok(Err(err)) => {
                controller.roll_back_pending().await;
                Err(err)
            }
            Err(payload) => {
                controller.roll_back_pending().await;
                panic::resume_unwind(payload)
            }
        }
    }

    async fn roll_back_pending(&mut self) {
        if self.status == ScopeStatus::Pending {
            let result = self.scope.rollback_transaction().await;
            self.status = ScopeStatus::Aborted;
            if let Err(err) = result {
                warn!(error = %err, "rollback after failed scope body failed");
            }
        }
    }
}

impl<S: AsyncTransactional> Deref for AsyncUnitOfWorkController<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.scope
    }
}

/// A pending controller here was never completed, or its completion was
/// dropped before the driver answered.
impl<S: AsyncTransactional> Drop for AsyncUnitOfWorkController<'_, S> {
    fn drop(&mut self) {
        if self.status == ScopeStatus::Pending {
            self.status = ScopeStatus::Aborted;
            warn!("async controller dropped while pending, discarding its transaction");
            self.scope.discard_transaction();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug, Default)]
    struct Counts {
        begin: u32,
        commit: u32,
        rollback: u32,
        discard: u32,
    }

    #[async_trait]
    impl AsyncTransactional for Counts {
        async fn begin_transaction(&mut self) -> UowResult<()> {
            self.begin += 1;
            Ok(())
        }

        async fn commit_transaction(&mut self) -> UowResult<()> {
            self.commit += 1;
            Ok(())
        }

        async fn rollback_transaction(&mut self) -> UowResult<()> {
            self.rollback += 1;
            Ok(())
        }

        fn discard_transaction(&mut self) {
            self.discard += 1;
        }
    }

    impl Counts {
        fn completions(&self) -> u32 {
            self.commit + self.rollback + self.discard
        }
    }

    #[tokio::test]
    async fn release_commits_once() {
        let mut counts = Counts::default();
        let scope = AsyncUnitOfWorkController::wrap(&mut counts).await.unwrap();
        scope.release().await.unwrap();

        assert_eq!((counts.begin, counts.commit, counts.rollback), (1, 1, 0));
    }

    #[tokio::test]
    async fn abort_then_release_rolls_back_only() {
        let mut counts = Counts::default();
        let mut scope = AsyncUnitOfWorkController::wrap(&mut counts).await.unwrap();
        scope.abort().await.unwrap();
        scope.release().await.unwrap();

        assert_eq!((counts.begin, counts.commit, counts.rollback), (1, 0, 1));
    }

    #[tokio::test]
    async fn dropping_pending_controller_discards_once() {
        let mut counts = Counts::default();
        {
            let _scope = AsyncUnitOfWorkController::wrap(&mut counts).await.unwrap();
        }
        assert_eq!((counts.commit, counts.rollback, counts.discard), (0, 0, 1));
        assert_eq!(counts.completions(), 1);
    }

    #[tokio::test]
    async fn dropping_finished_controller_discards_nothing() {
        let mut counts = Counts::default();
        {
            let mut scope = AsyncUnitOfWorkController::wrap(&mut counts).await.unwrap();
            scope.abort().await.unwrap();
        }
        assert_eq!((counts.rollback, counts.discard), (1, 0));
    }

    #[tokio::test]
    async fn cancelled_run_completes_once() {
        let mut counts = Counts::default();
        let run = AsyncUnitOfWorkController::run(&mut counts, |_| {
            Box::pin(async move {
                futures::future::pending::<()>().await;
                Ok::<_, UowError>(())
            })
        });
        assert!(futures::poll!(Box::pin(run)).is_pending());

        assert_eq!(counts.begin, 1);
        assert_eq!(counts.completions(), 1);
        assert_eq!(counts.discard, 1);
    }

    #[tokio::test]
    async fn run_rolls_back_then_resumes_panic() {
        fn failing_body() -> UowResult<()> {
            panic!("body failed")
        }

        let mut counts = Counts::default();
        let outcome = AssertUnwindSafe(AsyncUnitOfWorkController::run(&mut counts, |_| {
            Box::pin(async move { failing_body() })
        }))
        .catch_unwind()
        .await;

        assert!(outcome.is_err());
        assert_eq!((counts.commit, counts.rollback, counts.discard), (0, 1, 0));
    }

    #[tokio::test]
    async fn run_commits_on_success() {
        let mut counts = Counts::default();
        let value = AsyncUnitOfWorkController::run(&mut counts, |scope| {
            Box::pin(async move {
                assert_eq!(scope.begin, 1);
                Ok::<_, UowError>("done")
            })
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!((counts.begin, counts.commit, counts.rollback), (1, 1, 0));
    }

    #[tokio::test]
    async fn run_rolls_back_on_error() {
        let mut counts = Counts::default();
        let result: Result<(), UowError> = AsyncUnitOfWorkController::run(&mut counts, |_| {
            Box::pin(async move { Err(UowError::FactoryContractViolation) })
        })
        .await;

        assert!(matches!(result, Err(UowError::FactoryContractViolation)));
        assert_eq!((counts.begin, counts.commit, counts.rollback), (1, 0, 1));
    }

    #[tokio::test]
    async fn run_honours_abort_inside_body() {
        let mut counts = Counts::default();
        AsyncUnitOfWorkController::run(&mut counts, |scope| {
            Box::pin(async move {
                scope.abort().await?;
                Ok::<_, UowError>(())
            })
        })
        .await
        .unwrap();

        assert_eq!((counts.begin, counts.commit, counts.rollback), (1, 0, 1));
    }
}
