//! # txscope testkit
//!
//! Test utilities for txscope.
//!
//! This crate provides:
//! - [`RecordingScope`], a transactional scope that counts calls
//! - connection factories that yield nothing or always fail
//! - proptest generators for operation sequences and options, plus a model of
//!   the unit of work state machine
//! - [`init_tracing`] for log output in tests
//!
//! ## Usage
//!
//! ```rust
//! use txscope_testkit::prelude::*;
//!
//! let mut scope = RecordingScope::new();
//! let observer = scope.clone();
//! let mut controller = UnitOfWorkController::wrap(&mut scope)?;
//! controller.abort()?;
//! controller.release()?;
//! assert_eq!(observer.counts(), CallCounts::new(1, 0, 1));
//! # Ok::<(), UowError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod factories;
pub mod generators;
pub mod logging;
pub mod scope;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::factories::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::scope::*;
    pub use txscope_core::*;
    pub use txscope_memory::*;
}

pub use factories::*;
pub use generators::*;
pub use logging::init_tracing;
pub use scope::*;
