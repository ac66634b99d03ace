//! Unit of work policy.
//!
//! [`UnitOfWorkOptions`] decides whether redundant open/begin attempts are
//! errors or no-ops. Units of work resolve their options through an
//! [`OptionsSource`] at every decision point, so a provider can hand out
//! contextual configuration. A provider that yields nothing falls back to
//! [`UnitOfWorkOptions::strict`], and the fallback is reported by
//! [`OptionsSource::resolve_with_origin`].

use std::fmt;
use std::sync::Arc;

/// Isolation level requested when a transaction begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// Dirty reads are allowed.
    ReadUncommitted,
    /// Only committed data is visible.
    #[default]
    ReadCommitted,
    /// Rows read stay stable for the whole transaction.
    RepeatableRead,
    /// Full serializability.
    Serializable,
    /// Reads see a consistent snapshot taken when the transaction began.
    Snapshot,
}

/// Policy applied by a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitOfWorkOptions {
    /// Fail when a connection is opened while one is already open.
    ///
    /// When `false` the second attempt is a no-op: no new connection is opened.
    pub error_on_multiple_connection_attempts: bool,
    /// Fail when a transaction is begun while one is already running.
    ///
    /// When `false` the second attempt is a no-op: no new transaction begins.
    pub error_on_multiple_transaction_attempts: bool,
    /// Isolation level passed to the driver when a transaction begins.
    pub isolation_level: IsolationLevel,
}

impl UnitOfWorkOptions {
    /// Strict options: every redundant open/begin attempt is an error.
    pub const STRICT: Self = Self {
        error_on_multiple_connection_attempts: true,
        error_on_multiple_transaction_attempts: true,
        isolation_level: IsolationLevel::ReadCommitted,
    };

    /// Returns the strict options. Same as [`Default::default`].
    #[must_use]
    pub fn strict() -> Self {
        Self::STRICT
    }

    /// Returns options that turn redundant open/begin attempts into no-ops.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            error_on_multiple_connection_attempts: false,
            error_on_multiple_transaction_attempts: false,
            ..Self::STRICT
        }
    }

    /// Sets whether a second open attempt is an error.
    #[must_use]
    pub fn with_error_on_multiple_connection_attempts(mut self, enabled: bool) -> Self {
        self.error_on_multiple_connection_attempts = enabled;
        self
    }

    /// Sets whether a second begin attempt is an error.
    #[must_use]
    pub fn with_error_on_multiple_transaction_attempts(mut self, enabled: bool) -> Self {
        self.error_on_multiple_transaction_attempts = enabled;
        self
    }

    /// Sets the isolation level.
    #[must_use]
    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }
}

impl Default for UnitOfWorkOptions {
    fn default() -> Self {
        Self::STRICT
    }
}

/// Provider queried for the options of a unit of work.
pub type OptionsProvider = Arc<dyn Fn() -> Option<UnitOfWorkOptions> + Send + Sync>;

/// Where a resolved options snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsOrigin {
    /// A fixed options value.
    Fixed,
    /// The provider returned a value.
    Provider,
    /// The provider returned nothing and the strict options were substituted.
    StrictFallback,
}

/// Source of the options a unit of work applies.
#[derive(Clone)]
pub enum OptionsSource {
    /// Always the same options.
    Fixed(UnitOfWorkOptions),
    /// Options resolved lazily on each decision.
    Provider(OptionsProvider),
}

impl OptionsSource {
    /// Creates a source backed by a provider function.
    pub fn provider<P>(provider: P) -> Self
    where
        P: Fn() -> Option<UnitOfWorkOptions> + Send + Sync + 'static,
    {
        Self::Provider(Arc::new(provider))
    }

    /// Resolves the current options.
    #[must_use]
    pub fn resolve(&self) -> UnitOfWorkOptions {
        self.resolve_with_origin().0
    }

    /// Resolves the current options and reports where they came from.
    #[must_use]
    pub fn resolve_with_origin(&self) -> (UnitOfWorkOptions, OptionsOrigin) {
        match self {
            OptionsSource::Fixed(options) => (*options, OptionsOrigin::Fixed),
            OptionsSource::Provider(provider) => match provider() {
                Some(options) => (options, OptionsOrigin::Provider),
                None => {
                    tracing::trace!("options provider returned nothing, using strict options");
                    (UnitOfWorkOptions::STRICT, OptionsOrigin::StrictFallback)
                }
            },
        }
    }
}

impl Default for OptionsSource {
    fn default() -> Self {
        Self::Fixed(UnitOfWorkOptions::STRICT)
    }
}

impl From<UnitOfWorkOptions> for OptionsSource {
    fn from(options: UnitOfWorkOptions) -> Self {
        Self::Fixed(options)
    }
}

impl fmt::Debug for OptionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsSource::Fixed(options) => f.debug_tuple("Fixed").field(options).finish(),
            OptionsSource::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}
