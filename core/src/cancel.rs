//! Cancelable scopes and the propagation engine.
//!
//! A [`CancelScope`] registers itself with its nearest cancelable ancestor
//! when it is created. Canceling a scope records its error and cause, fires
//! its done signal, and cancels every registered descendant before
//! returning.
//!
//! Locks are only ever taken parent before child: a scope holds its own lock
//! while it cancels its children, and never reaches for an ancestor's lock
//! while holding its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Instant;

use scopetree_types::{Key, ScopeError, ScopeId, Value};

use crate::scope::{Scope, ScopeRef, Shape};
use crate::signal::DoneSignal;
use crate::value::resolve;

/// Key answered only by [`CancelScope`], with the scope itself.
///
/// The type is private to this module, so no caller outside the engine can
/// construct it and reach a cancelable node through `value`.
#[derive(Debug, PartialEq)]
struct CancelScopeKey;

static CANCEL_SCOPE_KEY: CancelScopeKey = CancelScopeKey;

pub(crate) fn is_cancel_scope_key(key: &dyn Key) -> bool {
    key.as_any().is::<CancelScopeKey>()
}

/// A scope that can be canceled explicitly and is canceled with its nearest
/// cancelable ancestor.
pub struct CancelScope {
    id: ScopeId,
    parent: ScopeRef,
    this: Weak<CancelScope>,
    // Written only while `state` is locked; read without it once set.
    done: OnceLock<Arc<DoneSignal>>,
    state: Mutex<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    children: Option<HashMap<ScopeId, Arc<CancelScope>>>,
    err: Option<ScopeError>,
    cause: Option<ScopeError>,
}

impl CancelScope {
    fn new(parent: ScopeRef) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: ScopeId::next(),
            parent,
            this: this.clone(),
            done: OnceLock::new(),
            state: Mutex::new(CancelState::default()),
        })
    }

    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> &dyn Scope {
        self.parent.as_ref()
    }

    /// Cause recorded when this scope was canceled.
    #[must_use]
    pub fn cause(&self) -> Option<ScopeError> {
        self.lock_state().cause.clone()
    }

    /// Number of descendants currently registered for fan-out.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.lock_state().children.as_ref().map_or(0, HashMap::len)
    }

    pub(crate) fn as_value(&self) -> Option<Value> {
        self.this.upgrade().map(|scope| scope as Value)
    }

    fn lock_state(&self) -> MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel this scope and its registered descendants.
    ///
    /// Only the first call records `err` and `cause`; later calls return
    /// immediately. A missing `cause` defaults to `err`. With `detach`, the
    /// scope also leaves its ancestor's children set afterwards.
    fn cancel(&self, detach: bool, err: ScopeError, cause: Option<ScopeError>) {
        let cause = cause.unwrap_or_else(|| err.clone());

        {
            let mut state = self.lock_state();
            if state.err.is_some() {
                return;
            }
            state.err = Some(err.clone());
            state.cause = Some(cause.clone());

            // A scope canceled before anyone asked for its signal gets the
            // shared closed one.
            self.done.get_or_init(DoneSignal::closed).fire();

            let children = state.children.take().unwrap_or_default();
            tracing::debug!(
                scope = %self.id,
                children = children.len(),
                err = %err,
                "scope canceled"
            );
            for child in children.values() {
                // Cleared together with ours, so children need not detach.
                child.cancel(false, err.clone(), Some(cause.clone()));
            }
        }

        if detach {
            remove_child(self.parent.as_ref(), self);
        }
    }
}

impl Scope for CancelScope {
    fn deadline(&self) -> Option<Instant> {
        self.parent.deadline()
    }

    fn done(&self) -> Option<Arc<DoneSignal>> {
        if let Some(done) = self.done.get() {
            return Some(Arc::clone(done));
        }

        let _state = self.lock_state();
        // A concurrent cancel may have published the closed signal already.
        let done = self.done.get_or_init(|| {
            tracing::trace!(scope = %self.id, "done signal created");
            Arc::new(DoneSignal::new())
        });
        Some(Arc::clone(done))
    }

    fn err(&self) -> Option<ScopeError> {
        self.lock_state().err.clone()
    }

    fn value(&self, key: &dyn Key) -> Option<Value> {
        if is_cancel_scope_key(key) {
            return self.as_value();
        }
        resolve(self.parent.as_ref(), key)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Cancel(self)
    }

    fn name(&self) -> String {
        format!("{}.with_cancel", self.parent.name())
    }
}

impl fmt::Debug for CancelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelScope")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for CancelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Cancels one [`CancelScope`] with the canonical
/// [`Canceled`](scopetree_types::Canceled) error.
///
/// Calling it more than once, or from several threads at the same time, is
/// safe; only the first call has an effect.
#[derive(Clone)]
pub struct CancelFn {
    scope: Arc<CancelScope>,
}

impl CancelFn {
    pub fn cancel(&self) {
        self.scope.cancel(true, ScopeError::canceled(), None);
    }
}

impl fmt::Debug for CancelFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelFn").field(&self.scope.id).finish()
    }
}

/// Like [`CancelFn`], but records a caller-supplied cause.
#[derive(Clone)]
pub struct CancelCauseFn {
    scope: Arc<CancelScope>,
}

impl CancelCauseFn {
    /// Cancel with `cause`. The scope's error is still
    /// [`Canceled`](scopetree_types::Canceled).
    pub fn cancel(&self, cause: ScopeError) {
        self.scope.cancel(true, ScopeError::canceled(), Some(cause));
    }
}

impl fmt::Debug for CancelCauseFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelCauseFn").field(&self.scope.id).finish()
    }
}

/// Derive a cancelable scope from `parent`.
///
/// The returned scope is canceled when the returned [`CancelFn`] is called
/// or when its nearest cancelable ancestor is canceled, whichever happens
/// first. If `parent` is already canceled, so is the new scope.
pub fn with_cancel(parent: ScopeRef) -> (Arc<CancelScope>, CancelFn) {
    let scope = derive(parent);
    let cancel = CancelFn {
        scope: Arc::clone(&scope),
    };
    (scope, cancel)
}

/// Derive a cancelable scope whose cancel function takes a cause.
pub fn with_cancel_cause(parent: ScopeRef) -> (Arc<CancelScope>, CancelCauseFn) {
    let scope = derive(parent);
    let cancel = CancelCauseFn {
        scope: Arc::clone(&scope),
    };
    (scope, cancel)
}

fn derive(parent: ScopeRef) -> Arc<CancelScope> {
    let scope = CancelScope::new(Arc::clone(&parent));
    propagate(&parent, &scope);
    scope
}

/// Hook `child` up so that it is canceled together with `parent`.
fn propagate(parent: &ScopeRef, child: &Arc<CancelScope>) {
    let Some(done) = parent.done() else {
        tracing::trace!(scope = %child.id, "parent never cancels");
        return;
    };

    let inherit = || {
        let err = parent.err().unwrap_or_else(ScopeError::canceled);
        child.cancel(false, err, cause(parent.as_ref()));
    };

    if done.is_fired() {
        inherit();
        return;
    }

    let Some(ancestor) = parent_cancel_scope(parent.as_ref()) else {
        if done.is_fired() {
            inherit();
            return;
        }
        tracing::debug!(
            scope = %child.id,
            parent = %parent,
            "no cancelable ancestor owns the parent's signal; not registered"
        );
        return;
    };

    let mut state = ancestor.lock_state();
    if let Some(err) = state.err.clone() {
        // Canceled between the check above and taking the lock.
        let cause = state.cause.clone();
        drop(state);
        child.cancel(false, err, cause);
        return;
    }

    state
        .children
        .get_or_insert_with(HashMap::new)
        .insert(child.id, Arc::clone(child));
    tracing::debug!(
        scope = %child.id,
        ancestor = %ancestor.id,
        "registered with cancelable ancestor"
    );
}

/// Nearest cancelable ancestor of `parent`, if it is still live and is the
/// node that actually drives `parent`'s done signal.
fn parent_cancel_scope(parent: &dyn Scope) -> Option<Arc<CancelScope>> {
    let done = parent.done()?;
    if done.is_fired() {
        return None;
    }

    let ancestor = nearest_cancel_scope(parent)?;
    let ancestor_done = ancestor.done.get()?;
    // A wrapper that substitutes its own signal is not driven by the ancestor.
    if !Arc::ptr_eq(ancestor_done, &done) {
        return None;
    }
    Some(ancestor)
}

fn nearest_cancel_scope(scope: &dyn Scope) -> Option<Arc<CancelScope>> {
    scope.value(&CANCEL_SCOPE_KEY)?.downcast::<CancelScope>().ok()
}

fn remove_child(parent: &dyn Scope, child: &CancelScope) {
    let Some(ancestor) = parent_cancel_scope(parent) else {
        return;
    };

    let mut state = ancestor.lock_state();
    if let Some(children) = state.children.as_mut()
        && children.remove(&child.id).is_some()
    {
        tracing::trace!(
            scope = %child.id,
            ancestor = %ancestor.id,
            "detached from cancelable ancestor"
        );
    }
}

/// Cause of the cancellation that reached `scope`.
///
/// Resolves the nearest enclosing [`CancelScope`] and returns the cause it
/// recorded. A scope canceled by inheritance reports the cause given to the
/// ancestor that started the cascade. Returns `None` if no cancelable scope
/// encloses `scope` or it has not been canceled.
///
/// The lookup uses a key that only this module can construct:
///
/// ```compile_fail
/// use scopetree_core::cancel::CancelScopeKey;
/// ```
#[must_use]
pub fn cause(scope: &dyn Scope) -> Option<ScopeError> {
    nearest_cancel_scope(scope)?.cause()
}
