//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! RequestContext (from the I/O task)
//!     → method check        unknown method → 405, stop
//!     → route lookup        miss → 404 + miss counter, stop
//!                           hit (non-internal) → hit counters, last-served
//!     → worker pool submit  rejection → 503 + last-failed
//!     → task.rs             pre-chain → handler → mapping → post-chain
//!     → response awaited on the I/O task and written back
//! ```
//!
//! # Design Decisions
//! - Every exit produces a response; nothing below this boundary may take
//!   down a serving thread. A dropped completion channel (handler panic)
//!   surfaces as 503, not as a crash.
//! - Internal routes are dispatched normally but never touch the public
//!   hit/miss counters or last-served markers, on any path.

pub mod interceptor;
pub mod task;

use std::sync::Arc;

use hyper::StatusCode;
use tokio::sync::oneshot;

use crate::executor::WorkerPool;
use crate::http::context::RequestContext;
use crate::http::response::{Response, ResponseBuilder};
use crate::routing::key::{HttpMethod, RouteKey};
use crate::routing::table::RouteTable;
use crate::stats::ServerStats;

pub use interceptor::Interceptor;
pub use task::DispatchTask;

/// Orchestrates lookup, admission and execution for one request at a time.
/// Cheap to clone per connection; all state is shared.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    pool: Arc<WorkerPool>,
    stats: Arc<ServerStats>,
}

impl Dispatcher {
    pub fn new(
        table: Arc<RouteTable>,
        interceptors: Vec<Arc<dyn Interceptor>>,
        pool: Arc<WorkerPool>,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            table,
            interceptors: interceptors.into(),
            pool,
            stats,
        }
    }

    /// Drive one request through the pipeline and return its response.
    ///
    /// Runs on an I/O task; the handler itself runs on the worker pool,
    /// except under backpressure when the pool runs it on this thread.
    pub async fn dispatch(&self, ctx: Arc<RequestContext>) -> Response {
        // method check
        if ctx.method() == HttpMethod::Unknown {
            return ResponseBuilder::status(&ctx, StatusCode::METHOD_NOT_ALLOWED);
        }

        // route lookup
        let key = RouteKey::from_terms(ctx.method(), ctx.path_terms().to_vec());
        let Some(descriptor) = self.table.lookup(&key) else {
            self.stats.incr_request_miss();
            tracing::debug!(
                request_id = %ctx.request_id(),
                method = %ctx.method(),
                uri = %ctx.uri(),
                "no route matched"
            );
            return ResponseBuilder::status(&ctx, StatusCode::NOT_FOUND);
        };

        if !descriptor.is_internal() {
            self.stats.incr_request_hit();
            descriptor.hit();
            self.stats.mark_served(ctx.request_id());
        }

        // hand off to the worker pool and await completion
        let task = DispatchTask::new(
            Arc::clone(&ctx),
            Arc::clone(&self.interceptors),
            descriptor,
        );
        let (tx, rx) = oneshot::channel();
        let submitted = self.pool.execute(move || {
            let _ = tx.send(task.run());
        });

        if let Err(err) = submitted {
            tracing::error!(request_id = %ctx.request_id(), error = %err, "task submission failed");
            self.stats.mark_failed(ctx.request_id());
            return ResponseBuilder::status(&ctx, StatusCode::SERVICE_UNAVAILABLE);
        }

        match rx.await {
            Ok(response) => response,
            // sender dropped without a response: the task panicked
            Err(_) => {
                tracing::error!(request_id = %ctx.request_id(), "task died before responding");
                self.stats.mark_failed(ctx.request_id());
                ResponseBuilder::status(&ctx, StatusCode::SERVICE_UNAVAILABLE)
            }
        }
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }
}
