//! Accept / I-O runtime split.
//!
//! # Responsibilities
//! - Size and own the two serving runtimes
//! - Bind the listening socket with the configured accept backlog
//! - Run the accept loop: accept, count, hand off, nothing else
//!
//! # Sizing
//! Acceptors only park in `accept()`, so they get the small share:
//! `max(2, round_down_to_even(io_threads * 0.3))`. Read/write plus request
//! parsing and dispatch bookkeeping live on the I/O runtime:
//! `max(4, round_down_to_even(io_threads * 0.7))`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;

use crate::error::ServerError;
use crate::net::connection::{self, ConnectionParams};

/// Truncate to integer, then clear the low bit.
pub fn round_down_to_even(x: f64) -> usize {
    (x as usize) & !1
}

/// Threads for the accept runtime.
pub fn acceptor_thread_count(io_threads: usize) -> usize {
    usize::max(2, round_down_to_even(io_threads as f64 * 0.3))
}

/// Threads for the read/write runtime.
pub fn io_thread_count(io_threads: usize) -> usize {
    usize::max(4, round_down_to_even(io_threads as f64 * 0.7))
}

/// Owns the accept and I/O runtimes for one server instance.
pub(crate) struct IoAcceptor {
    accept_rt: Runtime,
    io_rt: Runtime,
}

impl IoAcceptor {
    pub(crate) fn new(io_threads: usize) -> Result<Self, ServerError> {
        let accept_rt = named_runtime("accept-pool", acceptor_thread_count(io_threads))?;
        let io_rt = named_runtime("io-pool", io_thread_count(io_threads))?;
        Ok(Self { accept_rt, io_rt })
    }

    /// Bind `addr` with `backlog` as the accept queue bound. Connections
    /// beyond the backlog are refused by the kernel, which is how the
    /// `max_connections` limit is enforced.
    pub(crate) fn bind(&self, addr: SocketAddr, backlog: usize) -> Result<TcpListener, ServerError> {
        let _ctx = self.accept_rt.enter();
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|source| ServerError::Bind { addr, source })?;

        socket
            .set_reuseaddr(true)
            .and_then(|()| socket.bind(addr))
            .map_err(|source| ServerError::Bind { addr, source })?;

        let backlog = u32::try_from(backlog).unwrap_or(u32::MAX);
        socket
            .listen(backlog)
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Start accepting. Each accepted stream is spawned onto the I/O
    /// runtime; the accept task itself does nothing further with it.
    pub(crate) fn spawn_accept_loop(
        &self,
        listener: TcpListener,
        params: Arc<ConnectionParams>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let io_handle = self.io_rt.handle().clone();
        self.accept_rt.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        tracing::info!("acceptor stopping");
                        break;
                    }
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            tracing::trace!(peer = %peer, "connection accepted");
                            io_handle.spawn(connection::serve(stream, peer, Arc::clone(&params)));
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "accept failed");
                        }
                    }
                }
            }
        });
    }

    /// Tear both runtimes down, abandoning tasks that outlive the grace
    /// period (in-flight handlers keep running on the worker pool and are
    /// discarded per the timeout policy).
    pub(crate) fn shutdown(self) {
        self.accept_rt.shutdown_timeout(Duration::from_secs(1));
        self.io_rt.shutdown_timeout(Duration::from_secs(1));
    }
}

fn named_runtime(prefix: &'static str, threads: usize) -> Result<Runtime, ServerError> {
    let counter = AtomicUsize::new(1);
    Builder::new_multi_thread()
        .worker_threads(threads)
        .thread_name_fn(move || {
            let id = counter.fetch_add(1, Ordering::Relaxed);
            format!("{prefix}-{id}")
        })
        .enable_all()
        .build()
        .map_err(ServerError::Io)
}
