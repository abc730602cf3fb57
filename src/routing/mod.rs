//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (method, path terms)
//!     → key.rs (RouteKey identity, wildcard-aware equality)
//!     → table.rs (two-level index: method × term count → cell probe)
//!     → Return: Arc<HandlerDescriptor> or not-found
//!
//! Registration (at startup):
//!     ordered RouteRegistration list
//!     → prefix concatenation (RouteSet)
//!     → RouteTable::register, duplicates rejected loudly
//! ```
//!
//! # Design Decisions
//! - Deliberately coarse key hash (method + term count); matching carried
//!   by equality, see key.rs
//! - Registration races are serialized; lookups stay lock-free
//! - Ambiguous routes (wildcard/literal overlap) fail registration instead
//!   of relying on precedence rules

pub mod handler;
pub mod key;
pub mod table;

pub use handler::{
    HandlerDescriptor, HandlerFn, HandlerOutcome, HandlerResult, RouteRegistration, RouteSet,
};
pub use key::{HttpMethod, RouteKey, VARIABLE_MARKER};
pub use table::{RouteTable, MAX_TERMS};
