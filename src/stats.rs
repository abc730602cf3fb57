//! Serving statistics.
//!
//! # Responsibilities
//! - Hit/miss/connection counters spanning a server's lifetime
//! - Last-served timestamp and request id, last-failed request id
//! - Runtime kill switch: disabling makes every write a no-op while reads
//!   keep returning the last recorded values
//!
//! # Design Decisions
//! - Atomics only, no locks; counters use relaxed ordering since they are
//!   independent monotonic tallies, not synchronization points
//! - The id markers are arc-swapped strings so writers never block readers
//! - Owned per server instance rather than process-global statics, so tests
//!   can run several independent servers

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use serde::Serialize;

/// Counters for one server instance. No operation here can fail.
pub struct ServerStats {
    enabled: AtomicBool,
    request_miss: AtomicU64,
    request_hit: AtomicU64,
    connections: AtomicI64,
    last_served_millis: AtomicU64,
    last_served_id: ArcSwapOption<String>,
    last_failed_id: ArcSwapOption<String>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            request_miss: AtomicU64::new(0),
            request_hit: AtomicU64::new(0),
            connections: AtomicI64::new(0),
            last_served_millis: AtomicU64::new(now_millis()),
            last_served_id: ArcSwapOption::empty(),
            last_failed_id: ArcSwapOption::empty(),
        }
    }

    /// Stop recording. Reads keep returning the values recorded so far.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Resume recording.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn incr_request_miss(&self) {
        if self.is_enabled() {
            self.request_miss.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn request_miss(&self) -> u64 {
        self.request_miss.load(Ordering::Relaxed)
    }

    pub fn incr_request_hit(&self) {
        if self.is_enabled() {
            self.request_hit.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn request_hit(&self) -> u64 {
        self.request_hit.load(Ordering::Relaxed)
    }

    pub fn incr_connections(&self) {
        if self.is_enabled() {
            self.connections.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn decr_connections(&self) {
        if self.is_enabled() {
            self.connections.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn connections(&self) -> i64 {
        self.connections.load(Ordering::Relaxed)
    }

    /// Record a regular (non-internal) request about to be served.
    pub fn mark_served(&self, request_id: &str) {
        if self.is_enabled() {
            self.last_served_millis.store(now_millis(), Ordering::Relaxed);
            self.last_served_id
                .store(Some(Arc::new(request_id.to_owned())));
        }
    }

    /// Record a request whose execution failed below the dispatcher.
    pub fn mark_failed(&self, request_id: &str) {
        if self.is_enabled() {
            self.last_failed_id
                .store(Some(Arc::new(request_id.to_owned())));
        }
    }

    pub fn last_served_millis(&self) -> u64 {
        self.last_served_millis.load(Ordering::Relaxed)
    }

    pub fn last_served_id(&self) -> Option<String> {
        self.last_served_id.load_full().map(|s| (*s).clone())
    }

    pub fn last_failed_id(&self) -> Option<String> {
        self.last_failed_id.load_full().map(|s| (*s).clone())
    }

    /// Point-in-time copy of every counter, for the introspection route.
    pub fn snapshot(&self, route_hits: Vec<(String, u64)>) -> StatsSnapshot {
        StatsSnapshot {
            requests_miss: self.request_miss(),
            requests_hit: self.request_hit(),
            connections: self.connections(),
            last_served_millis: self.last_served_millis(),
            last_served_id: self.last_served_id(),
            last_failed_id: self.last_failed_id(),
            route_hits: route_hits.into_iter().collect(),
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view served by the built-in introspection route.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub requests_miss: u64,
    pub requests_hit: u64,
    pub connections: i64,
    pub last_served_millis: u64,
    pub last_served_id: Option<String>,
    pub last_failed_id: Option<String>,
    pub route_hits: std::collections::BTreeMap<String, u64>,
}

/// Guard tying the connection counter to a connection's lifetime: increments
/// on creation, decrements on drop, so the count survives handler panics and
/// early disconnects alike.
pub struct ConnectionGuard {
    stats: Arc<ServerStats>,
}

impl ConnectionGuard {
    pub fn new(stats: Arc<ServerStats>) -> Self {
        stats.incr_connections();
        Self { stats }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.stats.decr_connections();
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
