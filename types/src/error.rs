//! Cancellation errors.
//!
//! Cancellation is reported as an ordinary value, never as control flow. A
//! canceled scope stores a [`ScopeError`] for its own error and another for
//! the cause that started the cascade; both are cheap shared handles so that
//! every descendant reports the ancestor's error by identity.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock};

use thiserror::Error;

/// The canonical error recorded by an explicitly canceled scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Error)]
#[error("scope canceled")]
pub struct Canceled;

/// Shared handle to the error or cause recorded by a canceled scope.
///
/// Clones share the underlying error, so identity survives propagation:
/// a descendant canceled by inheritance holds the very error its ancestor
/// recorded. Use [`ScopeError::ptr_eq`] to test identity.
#[derive(Clone)]
pub struct ScopeError(Arc<dyn Error + Send + Sync + 'static>);

impl ScopeError {
    pub fn new<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    /// The process-wide [`Canceled`] error. Every call returns the same handle.
    #[must_use]
    pub fn canceled() -> Self {
        static CANCELED: OnceLock<ScopeError> = OnceLock::new();
        CANCELED.get_or_init(|| ScopeError::new(Canceled)).clone()
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.0.is::<Canceled>()
    }

    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Error + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// True if both handles point at the same recorded error.
    #[must_use]
    pub fn ptr_eq(&self, other: &ScopeError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Canceled> for ScopeError {
    fn from(_: Canceled) -> Self {
        Self::canceled()
    }
}

impl fmt::Debug for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for ScopeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}
