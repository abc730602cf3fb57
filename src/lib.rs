//! Embedded HTTP server framework.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                 EMBEDDED SERVER                   │
//!                    │                                                   │
//!   Client ─────────▶│  net/acceptor ──▶ net/connection ──▶ dispatch    │
//!   Connection       │  (accept pool)    (I/O pool, hyper)     │         │
//!                    │                                         ▼         │
//!                    │                              routing (key/table)  │
//!                    │                                         │         │
//!                    │                                         ▼         │
//!   Client ◀─────────│  http/response ◀── dispatch/task ◀── executor    │
//!   Response         │  (status map)      (interceptors +    (bounded   │
//!                    │                     handler)           workers)  │
//!                    │                                                   │
//!                    │  ┌─────────────────────────────────────────────┐ │
//!                    │  │  Cross-cutting: config · stats · logging    │ │
//!                    │  └─────────────────────────────────────────────┘ │
//!                    └──────────────────────────────────────────────────┘
//! ```
//!
//! The serving split mirrors a classic reactor: a small accept pool hands
//! connections to a larger I/O pool; parsed requests are dispatched through
//! an indexed route table; handler logic runs on a separate bounded worker
//! pool whose overflow policy (caller runs) is the system's backpressure.
//!
//! # Quick Start
//!
//! ```no_run
//! use nova_rest::routing::{HttpMethod, HandlerOutcome};
//! use nova_rest::server::HttpServer;
//!
//! let mut server = HttpServer::builder()
//!     .route(HttpMethod::Get, "/users/{id}", |ctx| {
//!         let id = ctx.path_terms().get(1).cloned().unwrap_or_default();
//!         Ok(HandlerOutcome::Content(serde_json::json!({ "id": id })))
//!     })
//!     .build()
//!     .expect("route registration");
//! server.start().expect("bind");
//! server.join();
//! ```

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod http;
pub mod net;
pub mod routing;
pub mod server;
pub mod stats;

// Cross-cutting concerns
pub mod observability;

mod introspection;

pub use config::schema::ServerConfig;
pub use dispatch::{Dispatcher, Interceptor};
pub use error::{HandlerError, RegistrationError, ServerError};
pub use http::{RequestContext, Response, ResponseBuilder};
pub use routing::{HandlerOutcome, HttpMethod, RouteKey, RouteSet, RouteTable};
pub use server::{HttpServer, ServerBuilder};
pub use stats::{ServerStats, StatsSnapshot};
