//! Cancellation and value scopes.
//!
//! A scope tree starts at an empty root ([`background`] or [`todo`]) and
//! grows by derivation:
//!
//! - [`with_cancel`] / [`with_cancel_cause`] add a [`CancelScope`] that can be
//!   canceled explicitly and is canceled together with its nearest cancelable
//!   ancestor.
//! - [`with_value`] adds a [`ValueScope`] carrying one key/value pair, visible
//!   to every descendant.
//!
//! Canceling a scope is synchronous: when the cancel call returns, every
//! registered descendant reports an error and has fired its done signal.
//!
//! ```
//! use scopetree_core::{Scope, background, cause, value_of, with_cancel, with_value};
//!
//! let (parent, cancel) = with_cancel(background());
//! let (child, _cancel_child) = with_cancel(parent.clone());
//! let leaf = with_value(child, "a", 1_i32);
//!
//! cancel.cancel();
//!
//! assert!(parent.err().is_some());
//! assert!(leaf.err().is_some());
//! assert!(cause(&*leaf).is_some());
//! assert_eq!(value_of::<i32>(&*leaf, &"a").as_deref(), Some(&1));
//! ```

mod cancel;
mod empty;
mod scope;
mod signal;
mod value;

pub use cancel::{CancelCauseFn, CancelFn, CancelScope, cause, with_cancel, with_cancel_cause};
pub use empty::{EmptyScope, background, todo};
pub use scope::{Scope, ScopeRef, Shape};
pub use scopetree_types::{Canceled, Key, ScopeError, ScopeId, Value};
pub use signal::DoneSignal;
pub use value::{ValueScope, value_of, with_value};
