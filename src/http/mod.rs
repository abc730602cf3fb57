//! HTTP request/response model.
//!
//! # Data Flow
//! ```text
//! Parsed request (from the codec, behind RequestVisitor)
//!     → visitor.rs (transport-agnostic access, param merge)
//!     → context.rs (immutable RequestContext, keep-alive decision)
//!     → [dispatch layer resolves route and runs the handler]
//!     → response.rs (identity headers, outcome → status mapping)
//!     → Send to client
//! ```

pub mod context;
pub mod response;
pub mod visitor;

pub use context::RequestContext;
pub use response::{response_for, Response, ResponseBuilder, SERVER_IDENT};
pub use visitor::{HyperRequestVisitor, RequestVisitor};
