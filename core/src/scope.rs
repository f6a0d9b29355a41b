//! The scope capability set.

use std::any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use scopetree_types::{Key, ScopeError, Value};

use crate::cancel::CancelScope;
use crate::signal::DoneSignal;
use crate::value::ValueScope;

/// Shared handle to any node of a scope tree.
pub type ScopeRef = Arc<dyn Scope>;

/// A node in a cancellation and value tree.
///
/// The built-in nodes are [`EmptyScope`](crate::EmptyScope),
/// [`CancelScope`] and [`ValueScope`]. Other implementations can be
/// composed into a chain; they take part in lookups through their own
/// [`Scope::value`], which should forward unknown keys to their parent.
pub trait Scope: Send + Sync {
    /// Time at which work under this scope should be abandoned, if any.
    fn deadline(&self) -> Option<Instant>;

    /// Signal fired when this scope is canceled. `None` means the scope can
    /// never be canceled.
    fn done(&self) -> Option<Arc<DoneSignal>>;

    /// Why this scope was canceled, or `None` while it is live.
    fn err(&self) -> Option<ScopeError>;

    /// Value attached to `key` on this scope or its nearest ancestor.
    fn value(&self, key: &dyn Key) -> Option<Value>;

    /// Which built-in node kind this is. Used by the lookup chain to walk
    /// built-in layers without recursion.
    fn shape(&self) -> Shape<'_> {
        Shape::External
    }

    /// Diagnostic name.
    fn name(&self) -> String {
        any::type_name::<Self>().to_string()
    }
}

/// Closed set of node kinds the lookup chain understands, plus an open case
/// for everything else.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Empty,
    Value(&'a ValueScope),
    Cancel(&'a CancelScope),
    External,
}

impl fmt::Debug for dyn Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Display for dyn Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
