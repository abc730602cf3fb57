//! Error taxonomy.
//!
//! # Responsibilities
//! - Registration errors: fatal at startup, surfaced to the wiring code
//! - Handler errors: typed signals consumed only by status mapping
//! - Server errors: bind/runtime failures during lifecycle operations
//!
//! # Design Decisions
//! - Protocol-level failures (unknown method, route miss, oversized body)
//!   never appear here; they are answered with a status code directly
//! - Handler panics are not part of the taxonomy either; the worker pool
//!   contains them and the dispatcher answers 503

use thiserror::Error;

/// Errors raised while building the route table. All of these abort server
/// construction; none are recoverable at runtime.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A route with the same method, term count and (wildcard-aware) terms
    /// already exists. Accepting both would make dispatch ambiguous.
    #[error("ambiguous route: {0} is already registered")]
    DuplicateRoute(String),

    /// Route paths must start with '/'.
    #[error("invalid route path {0:?}: must start with '/'")]
    InvalidPath(String),

    /// Routes cannot be registered under the unknown-method sentinel.
    #[error("cannot register a route for an unrecognized HTTP method")]
    UnsupportedMethod,

    /// The table indexes routes by segment count with a fixed upper bound.
    #[error("route {0:?} has too many path segments (limit {1})")]
    TooManySegments(String, usize),
}

/// Typed failure signals a handler may return. Consumed exclusively by the
/// outcome-to-status mapping step; carries no other behavior.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler produced a value that cannot be rendered as a response.
    #[error("handler produced an invalid response")]
    ResponseNotValid,

    /// A required parameter was missing or had the wrong shape.
    #[error("request parameters did not match the handler signature")]
    ParamsNotMatched,

    /// A parameter was present but could not be parsed/converted.
    #[error("request parameter could not be converted: {0}")]
    ParamsConvertError(String),

    /// Internal handler failure.
    #[error("handler system error: {0}")]
    System(String),
}

/// Lifecycle and configuration failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server is not running")]
    NotRunning,

    #[error("server is already running")]
    AlreadyRunning,
}
