//! Handler binding and registration input.
//!
//! # Responsibilities
//! - Bind a route to an invocable handler closure
//! - Track per-route hit counts for the process lifetime
//! - Carry the `internal` flag excluding a route from public statistics
//! - Describe the external registration input (ordered route lists with
//!   optional group prefixes)
//!
//! # Design Decisions
//! - Handlers are typed closures resolved at registration time, not looked
//!   up by name/signature at request time. Each takes the request context
//!   and returns a typed outcome.
//! - Descriptors are created at startup and live until shutdown; the hit
//!   counter is their only mutable state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::error::HandlerError;
use crate::http::context::RequestContext;
use crate::routing::key::{HttpMethod, RouteKey};

/// What a handler produced on success.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    /// A JSON-serializable payload; rendered as a 200 response body.
    Content(Value),
    /// Nothing to send back; rendered as 204.
    NoContent,
}

/// Result type every route handler returns.
pub type HandlerResult = Result<HandlerOutcome, HandlerError>;

/// A route handler: invoked on a worker thread with the immutable request
/// context. May block; that is why execution is offloaded from I/O threads.
pub type HandlerFn = Arc<dyn Fn(&RequestContext) -> HandlerResult + Send + Sync>;

/// Binds a route to its handler, with a process-lifetime hit counter.
pub struct HandlerDescriptor {
    route: RouteKey,
    handler: HandlerFn,
    hits: AtomicU64,
    internal: bool,
}

impl HandlerDescriptor {
    pub fn new(route: RouteKey, handler: HandlerFn) -> Self {
        Self {
            route,
            handler,
            hits: AtomicU64::new(0),
            internal: false,
        }
    }

    /// Mark this descriptor as internal: it still serves requests but never
    /// touches public hit/miss statistics.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn route(&self) -> &RouteKey {
        &self.route
    }

    /// Atomically record one served request; returns the new count.
    pub fn hit(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Invoke the bound handler.
    pub fn invoke(&self, ctx: &RequestContext) -> HandlerResult {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("route", &self.route.to_string())
            .field("hits", &self.hit_count())
            .field("internal", &self.internal)
            .finish()
    }
}

/// One entry of the external registration input: an ordered list of these
/// is produced by whatever wiring/scanning layer the embedding application
/// uses, and handed to the server builder.
pub struct RouteRegistration {
    pub path: String,
    pub method: HttpMethod,
    pub handler: HandlerFn,
}

impl RouteRegistration {
    /// Method defaults to GET when the wiring layer does not specify one.
    pub fn new(path: impl Into<String>, handler: HandlerFn) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::Get,
            handler,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }
}

/// An ordered group of registrations sharing a path prefix. The prefix is
/// concatenated before each member path, mirroring class-level mappings
/// prefixing method-level ones.
pub struct RouteSet {
    prefix: String,
    routes: Vec<RouteRegistration>,
}

impl RouteSet {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            routes: Vec::new(),
        }
    }

    pub fn route<F>(mut self, method: HttpMethod, path: &str, handler: F) -> Self
    where
        F: Fn(&RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.routes.push(
            RouteRegistration::new(format!("{}{}", self.prefix, path), Arc::new(handler))
                .with_method(method),
        );
        self
    }

    /// Consume the set into plain registrations, prefix already applied.
    pub fn into_registrations(self) -> Vec<RouteRegistration> {
        self.routes
    }
}

impl Default for RouteSet {
    fn default() -> Self {
        Self::new()
    }
}
