//! Observability subsystem.
//!
//! Structured logging only: serving events carry the request id, route and
//! peer as fields so one request can be followed across the accept, I/O
//! and worker threads.

pub mod logging;
