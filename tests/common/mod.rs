//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use scopetree_core::{DoneSignal, Key, Scope, ScopeError, ScopeRef, Value};
use thiserror::Error;

/// Generous bound for waits that should complete immediately.
pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
#[error("{0}")]
pub struct Reason(pub &'static str);

pub fn reason(text: &'static str) -> ScopeError {
    ScopeError::new(Reason(text))
}

/// A scope implemented outside the library: carries a deadline and forwards
/// everything else to its parent.
pub struct WithDeadline {
    pub parent: ScopeRef,
    pub at: Instant,
}

impl Scope for WithDeadline {
    fn deadline(&self) -> Option<Instant> {
        Some(self.at)
    }

    fn done(&self) -> Option<Arc<DoneSignal>> {
        self.parent.done()
    }

    fn err(&self) -> Option<ScopeError> {
        self.parent.err()
    }

    fn value(&self, key: &dyn Key) -> Option<Value> {
        self.parent.value(key)
    }
}

pub fn with_deadline(parent: ScopeRef, at: Instant) -> ScopeRef {
    Arc::new(WithDeadline { parent, at })
}

/// A scope that hides its parent entirely, like a detached wrapper.
pub struct Opaque;

impl Scope for Opaque {
    fn deadline(&self) -> Option<Instant> {
        None
    }

    fn done(&self) -> Option<Arc<DoneSignal>> {
        None
    }

    fn err(&self) -> Option<ScopeError> {
        None
    }

    fn value(&self, _key: &dyn Key) -> Option<Value> {
        None
    }
}
