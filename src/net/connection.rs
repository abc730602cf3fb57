//! Per-connection serving.
//!
//! # Responsibilities
//! - Run the HTTP/1.x codec (hyper) over one accepted stream
//! - Cap aggregated request bodies at `max_packet_size`
//! - Enforce the handler timeout: 504 while the peer is still reachable,
//!   silent drop once it is gone
//! - Honor the context's keep-alive decision when writing responses
//! - Keep the connection counter balanced via a drop-guard
//!
//! # Ordering
//! hyper serves one request at a time per connection, so responses go out
//! in the order requests arrived; there is no pipelining reordering.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONNECTION};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;

use crate::dispatch::Dispatcher;
use crate::http::context::RequestContext;
use crate::http::response::{Response, ResponseBuilder};
use crate::http::visitor::HyperRequestVisitor;
use crate::stats::{ConnectionGuard, ServerStats};

/// Everything a connection needs, shared across all connections of one
/// server instance.
pub(crate) struct ConnectionParams {
    pub dispatcher: Dispatcher,
    pub stats: Arc<ServerStats>,
    pub max_packet_size: usize,
    pub handler_timeout: Duration,
}

/// Serve one connection to completion. Runs on the I/O runtime.
pub(crate) async fn serve(stream: TcpStream, peer: SocketAddr, params: Arc<ConnectionParams>) {
    let _guard = ConnectionGuard::new(Arc::clone(&params.stats));

    if let Err(err) = stream.set_nodelay(true) {
        tracing::debug!(peer = %peer, error = %err, "set_nodelay failed");
    }

    let handler_timeout = params.handler_timeout;
    let service_params = Arc::clone(&params);
    let service = service_fn(move |req| {
        let params = Arc::clone(&service_params);
        async move { Ok::<Response, Infallible>(handle(req, peer, params).await) }
    });

    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(handler_timeout)
        .serve_connection(TokioIo::new(stream), service);

    if let Err(err) = conn.await {
        // includes the peer disappearing mid-response; nothing to write then
        tracing::debug!(peer = %peer, error = %err, "connection closed with error");
    }
}

async fn handle(
    req: hyper::Request<Incoming>,
    peer: SocketAddr,
    params: Arc<ConnectionParams>,
) -> Response {
    let (parts, body) = req.into_parts();

    // aggregate the body, bounded by max_packet_size
    let bytes = match Limited::new(body, params.max_packet_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            tracing::warn!(peer = %peer, error = %err, "request body rejected");
            return ResponseBuilder::bare(StatusCode::BAD_REQUEST);
        }
    };

    let visitor = HyperRequestVisitor::new(&parts, &bytes, peer);
    let ctx = Arc::new(RequestContext::from_visitor(&visitor));

    let dispatched = tokio::time::timeout(
        params.handler_timeout,
        params.dispatcher.dispatch(Arc::clone(&ctx)),
    )
    .await;

    let mut response = match dispatched {
        Ok(response) => response,
        Err(_elapsed) => {
            // the handler task keeps running on the worker pool; its result
            // is discarded when it eventually completes
            tracing::warn!(
                request_id = %ctx.request_id(),
                uri = %ctx.uri(),
                "handler exceeded timeout"
            );
            ResponseBuilder::status(&ctx, StatusCode::GATEWAY_TIMEOUT)
        }
    };

    if !ctx.keep_alive() {
        response
            .headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("close"));
    }
    response
}
