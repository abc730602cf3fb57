//! Request/response interceptor hooks.
//!
//! # Responsibilities
//! - Pre-hooks observe (and may veto) a request before the handler runs
//! - Post-hooks observe the outgoing response and may replace it
//!
//! # Ordering
//! Interceptors run in registration order, for the pre-chain and the
//! post-chain alike. A pre-hook returning `false` denies the request with
//! 403, skips the remaining pre-hooks and the handler, but the post-chain
//! still runs and observes the final (403) response, so logging/metrics
//! interceptors see every reply that leaves the server.

use crate::http::context::RequestContext;
use crate::http::response::Response;

/// Hook pair wrapping handler execution. Both methods default to
/// pass-through so implementations override only the side they need.
pub trait Interceptor: Send + Sync {
    /// Called before the handler, in registration order. Returning `false`
    /// denies the request with 403.
    fn before(&self, _ctx: &RequestContext) -> bool {
        true
    }

    /// Called after the response is built, in registration order. Return a
    /// replacement response, or `None` to keep the current one.
    fn after(&self, _ctx: &RequestContext, _response: &Response) -> Option<Response> {
        None
    }
}
