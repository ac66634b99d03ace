//! Cooperative cancellation.

use crate::error::{UowError, UowResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable cancellation flag.
///
/// All clones share the same flag. A unit of work checks its signal right
/// before each driver call; once cancelled, the operation fails with
/// [`UowError::Cancelled`] without touching the connection or transaction.
/// Drivers receive the signal too and may honour it while a call is in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Creates a signal that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with [`UowError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> UowResult<()> {
        if self.is_cancelled() {
            Err(UowError::Cancelled)
        } else {
            Ok(())
        }
    }
}
