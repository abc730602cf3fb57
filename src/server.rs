//! Server assembly and lifecycle.
//!
//! # Responsibilities
//! - Builder: collect options, route registrations (ordered, prefix-aware)
//!   and interceptors; fail loudly on invalid or ambiguous routes
//! - Lifecycle: start (bind + spawn accept loop), join, shutdown
//!
//! # Design Decisions
//! - The route table and interceptor list are owned by the server instance
//!   and injected into it at construction; no process-wide statics, so
//!   tests can run any number of independent servers
//! - `start` is synchronous: the server owns its runtimes instead of
//!   borrowing the caller's

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::sync::watch;

use crate::config::schema::ServerConfig;
use crate::dispatch::{Dispatcher, Interceptor};
use crate::error::{RegistrationError, ServerError};
use crate::executor::WorkerPool;
use crate::http::context::RequestContext;
use crate::introspection;
use crate::net::acceptor::IoAcceptor;
use crate::net::connection::ConnectionParams;
use crate::routing::handler::{
    HandlerDescriptor, HandlerResult, RouteRegistration, RouteSet,
};
use crate::routing::key::{HttpMethod, RouteKey};
use crate::routing::table::RouteTable;
use crate::stats::ServerStats;

const ROOT_PATH: &str = "/";

/// Collects everything a server instance needs before it can start.
pub struct ServerBuilder {
    config: ServerConfig,
    registrations: Vec<RouteRegistration>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    introspection: bool,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registrations: Vec::new(),
            interceptors: Vec::new(),
            introspection: true,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.introspection = config.introspection_enabled;
        self.config = config;
        self
    }

    /// Register one route. Paths must start with `/`; duplicates are
    /// rejected when the server is built.
    pub fn route<F>(mut self, method: HttpMethod, path: &str, handler: F) -> Self
    where
        F: Fn(&RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.registrations
            .push(RouteRegistration::new(path, Arc::new(handler)).with_method(method));
        self
    }

    /// Register a prefixed group of routes.
    pub fn mount(mut self, set: RouteSet) -> Self {
        self.registrations.extend(set.into_registrations());
        self
    }

    /// Register routes produced by an external wiring layer, in order.
    pub fn register_all(mut self, registrations: Vec<RouteRegistration>) -> Self {
        self.registrations.extend(registrations);
        self
    }

    /// Append an interceptor. Pre- and post-hooks both run in the order
    /// interceptors were added.
    pub fn interceptor<I>(mut self, interceptor: I) -> Self
    where
        I: Interceptor + 'static,
    {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Drop the built-in stats route at `GET /`.
    pub fn disable_introspection(mut self) -> Self {
        self.introspection = false;
        self
    }

    /// Materialize the route table. Any invalid path or ambiguous route
    /// aborts construction; registration problems are startup failures,
    /// never silent.
    pub fn build(self) -> Result<HttpServer, RegistrationError> {
        let table = Arc::new(RouteTable::new());
        let stats = Arc::new(ServerStats::new());
        if !self.config.stats_enabled {
            stats.disable();
        }

        // the built-in route claims `GET /` first; an application route for
        // the same path then fails loudly, pointing at disable_introspection
        if self.introspection {
            let key = RouteKey::from_path(HttpMethod::Get, ROOT_PATH);
            let handler = introspection::stats_handler(Arc::clone(&stats), Arc::clone(&table));
            let descriptor =
                Arc::new(HandlerDescriptor::new(key.clone(), handler).internal());
            table.register(key, descriptor)?;
        }

        for registration in self.registrations {
            if !registration.path.starts_with('/') {
                return Err(RegistrationError::InvalidPath(registration.path));
            }
            let key = RouteKey::from_path(registration.method, &registration.path);
            let descriptor = Arc::new(HandlerDescriptor::new(key.clone(), registration.handler));
            table.register(key.clone(), descriptor)?;
            tracing::debug!(route = %key, "route registered");
        }

        Ok(HttpServer {
            config: self.config,
            table,
            interceptors: self.interceptors,
            stats,
            running: None,
            stopped: Arc::new((Mutex::new(false), Condvar::new())),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Running {
    acceptor: IoAcceptor,
    pool: Arc<WorkerPool>,
    shutdown_tx: watch::Sender<bool>,
    local_addr: SocketAddr,
}

/// One embedded server instance.
pub struct HttpServer {
    config: ServerConfig,
    table: Arc<RouteTable>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    stats: Arc<ServerStats>,
    running: Option<Running>,
    stopped: Arc<(Mutex<bool>, Condvar)>,
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("interceptors", &self.interceptors.len())
            .field("running", &self.running.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Bind and start serving. Returns the bound address (useful with a
    /// `:0` port in tests).
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.config.bind_address.clone()))?;

        let pool = Arc::new(WorkerPool::new(self.config.handler_threads));
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.table),
            self.interceptors.clone(),
            Arc::clone(&pool),
            Arc::clone(&self.stats),
        );

        let acceptor = IoAcceptor::new(self.config.io_threads)?;
        let listener = acceptor.bind(addr, self.config.max_connections)?;
        let local_addr = listener.local_addr()?;

        let params = Arc::new(ConnectionParams {
            dispatcher,
            stats: Arc::clone(&self.stats),
            max_packet_size: self.config.max_packet_size,
            handler_timeout: self.config.handler_timeout(),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        acceptor.spawn_accept_loop(listener, params, shutdown_rx);

        tracing::info!(
            address = %local_addr,
            routes = self.table.len(),
            io_threads = self.config.io_threads,
            handler_threads = self.config.handler_threads,
            "server started"
        );

        self.running = Some(Running {
            acceptor,
            pool,
            shutdown_tx,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Block the calling thread until `shutdown` is invoked (from another
    /// thread or a signal handler).
    pub fn join(&self) {
        let (lock, condvar) = &*self.stopped;
        let mut stopped = lock.lock();
        while !*stopped {
            condvar.wait(&mut stopped);
        }
    }

    /// Stop accepting, drain the worker pool, and release the runtimes.
    /// Idempotent; a server that never started is a no-op.
    pub fn shutdown(&mut self) {
        if let Some(running) = self.running.take() {
            tracing::info!(address = %running.local_addr, "server stopping");
            let _ = running.shutdown_tx.send(true);
            running.pool.shutdown();
            running.acceptor.shutdown();
        }
        let (lock, condvar) = &*self.stopped;
        *lock.lock() = true;
        condvar.notify_all();
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    pub fn route_table(&self) -> Arc<RouteTable> {
        Arc::clone(&self.table)
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::HandlerOutcome;

    #[test]
    fn build_registers_routes_and_introspection() {
        let server = HttpServer::builder()
            .route(HttpMethod::Get, "/ping", |_| Ok(HandlerOutcome::NoContent))
            .build()
            .unwrap();
        // /ping plus the internal stats route
        assert_eq!(server.route_table().len(), 2);
    }

    #[test]
    fn disabled_introspection_leaves_root_free() {
        let server = HttpServer::builder()
            .disable_introspection()
            .route(HttpMethod::Get, "/", |_| Ok(HandlerOutcome::NoContent))
            .build()
            .unwrap();
        assert_eq!(server.route_table().len(), 1);
    }

    #[test]
    fn invalid_path_fails_build() {
        let err = HttpServer::builder()
            .route(HttpMethod::Get, "ping", |_| Ok(HandlerOutcome::NoContent))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPath(_)));
    }

    #[test]
    fn ambiguous_routes_fail_build() {
        let err = HttpServer::builder()
            .route(HttpMethod::Get, "/users/{id}", |_| Ok(HandlerOutcome::NoContent))
            .route(HttpMethod::Get, "/users/profile", |_| Ok(HandlerOutcome::NoContent))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateRoute(_)));
    }

    #[test]
    fn mounted_set_paths_get_the_prefix() {
        let server = HttpServer::builder()
            .disable_introspection()
            .mount(
                RouteSet::with_prefix("/api").route(HttpMethod::Get, "/users", |_| {
                    Ok(HandlerOutcome::NoContent)
                }),
            )
            .build()
            .unwrap();
        let key = RouteKey::from_path(HttpMethod::Get, "/api/users");
        assert!(server.route_table().lookup(&key).is_some());
    }
}
