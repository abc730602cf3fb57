//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → acceptor.rs (accept runtime: accept + handoff only)
//!     → connection.rs (I/O runtime: codec, timeouts, keep-alive, guard)
//!     → Dispatcher
//! ```
//!
//! # Design Decisions
//! - Two independent runtimes sized from the configured I/O thread count:
//!   acceptors do nothing but accept(), so a small pool suffices; the
//!   larger I/O pool carries read/write and parsing
//! - Connection admission is bounded by the accept backlog
//!   (`max_connections`); each accepted connection is counted via a
//!   drop-guard so the statistics survive panics and early disconnects

pub mod acceptor;
pub mod connection;

pub use acceptor::{acceptor_thread_count, io_thread_count, round_down_to_even};
