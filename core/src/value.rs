//! Value scopes and the lookup chain.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use scopetree_types::{Key, ScopeError, Value};

use crate::cancel::is_cancel_scope_key;
use crate::scope::{Scope, ScopeRef, Shape};
use crate::signal::DoneSignal;

/// Immutable node carrying one key/value pair.
///
/// Unmatched lookups continue at the parent. Cancellation state is always
/// the parent's.
#[derive(Debug)]
pub struct ValueScope {
    parent: ScopeRef,
    key: Box<dyn Key>,
    value: Value,
}

impl ValueScope {
    #[must_use]
    pub fn parent(&self) -> &dyn Scope {
        self.parent.as_ref()
    }

    #[must_use]
    pub fn key(&self) -> &dyn Key {
        self.key.as_ref()
    }

    fn stringify_value(&self) -> Cow<'_, str> {
        let value: &(dyn Any + Send + Sync) = &*self.value;
        if let Some(s) = value.downcast_ref::<String>() {
            Cow::Borrowed(s.as_str())
        } else if let Some(s) = value.downcast_ref::<&'static str>() {
            Cow::Borrowed(*s)
        } else {
            Cow::Borrowed("<not Stringer>")
        }
    }
}

/// Derive a scope that carries `value` under `key`.
///
/// Lookups for an equal key of the same type on the returned scope or any
/// descendant (until shadowed) resolve to `value`.
pub fn with_value<K, V>(parent: ScopeRef, key: K, value: V) -> Arc<ValueScope>
where
    K: Key,
    V: Any + Send + Sync,
{
    tracing::trace!(
        parent = %parent,
        key = ?key,
        "attaching scope value"
    );
    Arc::new(ValueScope {
        parent,
        key: Box::new(key),
        value: Arc::new(value),
    })
}

/// Look up `key` starting at `scope` and downcast the result.
///
/// Returns `None` if the key is unset or holds a value of another type.
pub fn value_of<T>(scope: &dyn Scope, key: &dyn Key) -> Option<Arc<T>>
where
    T: Any + Send + Sync,
{
    scope.value(key)?.downcast::<T>().ok()
}

impl Scope for ValueScope {
    fn deadline(&self) -> Option<Instant> {
        self.parent.deadline()
    }

    fn done(&self) -> Option<Arc<DoneSignal>> {
        self.parent.done()
    }

    fn err(&self) -> Option<ScopeError> {
        self.parent.err()
    }

    fn value(&self, key: &dyn Key) -> Option<Value> {
        if self.key.key_eq(key) {
            return Some(Arc::clone(&self.value));
        }
        resolve(self.parent.as_ref(), key)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Value(self)
    }

    fn name(&self) -> String {
        format!(
            "{}.with_value(type {}, val {})",
            self.parent.name(),
            self.key.type_name(),
            self.stringify_value()
        )
    }
}

/// Resolve `key` by walking from `node` towards the root.
///
/// Built-in layers are stepped over in a loop; the walk hands off to an
/// external node's own `value` the first time it meets one.
pub(crate) fn resolve(mut node: &dyn Scope, key: &dyn Key) -> Option<Value> {
    loop {
        match node.shape() {
            Shape::Value(scope) => {
                if scope.key().key_eq(key) {
                    return Some(Arc::clone(&scope.value));
                }
                node = scope.parent();
            }
            Shape::Cancel(scope) => {
                if is_cancel_scope_key(key) {
                    return scope.as_value();
                }
                node = scope.parent();
            }
            Shape::Empty => return None,
            Shape::External => return node.value(key),
        }
    }
}
