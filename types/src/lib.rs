//! Core domain types for scopetree.
//!
//! This crate contains the pure value types shared by the scope tree: the
//! cancellation error carried by canceled scopes, scope identifiers, and the
//! type-erased key/value pair attached to value scopes. No IO, no async, and
//! no locking beyond what the identifier counter needs.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod error;
mod ids;
mod key;

pub use error::{Canceled, ScopeError};
pub use ids::ScopeId;
pub use key::{Key, Value};
