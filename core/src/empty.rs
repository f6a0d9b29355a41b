//! Root scopes.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use scopetree_types::{Key, ScopeError, Value};

use crate::scope::{Scope, ScopeRef, Shape};
use crate::signal::DoneSignal;

/// Terminal node of every scope tree. Never canceled, carries no deadline
/// and no values.
///
/// The two variants behave identically and differ only in their names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmptyScope {
    /// Root for top-level work.
    Background,
    /// Placeholder root for code that has not decided which scope to use.
    Todo,
}

impl EmptyScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EmptyScope::Background => "scope.Background",
            EmptyScope::Todo => "scope.TODO",
        }
    }
}

impl Scope for EmptyScope {
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

    fn shape(&self) -> Shape<'_> {
        Shape::Empty
    }

    fn name(&self) -> String {
        self.as_str().to_string()
    }
}

impl fmt::Display for EmptyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The process-wide background scope. Every call returns the same node.
#[must_use]
pub fn background() -> ScopeRef {
    static BACKGROUND: OnceLock<ScopeRef> = OnceLock::new();
    BACKGROUND
        .get_or_init(|| Arc::new(EmptyScope::Background))
        .clone()
}

/// The process-wide TODO scope. Every call returns the same node, distinct
/// from [`background`].
#[must_use]
pub fn todo() -> ScopeRef {
    static TODO: OnceLock<ScopeRef> = OnceLock::new();
    TODO.get_or_init(|| Arc::new(EmptyScope::Todo)).clone()
}
