//! Built-in statistics route.
//!
//! Registered at `GET /` with the internal flag set, so requesting it
//! never perturbs the counters it reports. Can be disabled via
//! configuration or `ServerBuilder::disable_introspection`.

use std::sync::Arc;

use crate::error::HandlerError;
use crate::routing::handler::{HandlerFn, HandlerOutcome};
use crate::routing::table::RouteTable;
use crate::stats::ServerStats;

/// Handler returning the current stats snapshot as JSON.
pub(crate) fn stats_handler(stats: Arc<ServerStats>, table: Arc<RouteTable>) -> HandlerFn {
    Arc::new(move |_ctx| {
        let snapshot = stats.snapshot(table.hit_counts());
        serde_json::to_value(&snapshot)
            .map(HandlerOutcome::Content)
            .map_err(|_| HandlerError::ResponseNotValid)
    })
}
