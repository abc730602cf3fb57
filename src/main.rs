//! Demo server binary.
//!
//! Wires a few sample routes and a logging interceptor into the framework,
//! the way an embedding application would. Not part of the library surface.

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use nova_rest::config::{load_config, ServerConfig};
use nova_rest::dispatch::Interceptor;
use nova_rest::error::HandlerError;
use nova_rest::http::RequestContext;
use nova_rest::observability::logging;
use nova_rest::routing::{HandlerOutcome, HttpMethod};
use nova_rest::server::HttpServer;

#[derive(Parser)]
#[command(name = "nova-rest", about = "Embedded HTTP server framework demo")]
struct Args {
    /// Bind address, host:port
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable the built-in stats route at GET /
    #[arg(long)]
    no_introspection: bool,
}

/// Logs one line per request/response pair.
struct AccessLog;

impl Interceptor for AccessLog {
    fn before(&self, ctx: &RequestContext) -> bool {
        tracing::info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            uri = %ctx.uri(),
            remote = %ctx.remote_address(),
            "request received"
        );
        true
    }

    fn after(
        &self,
        ctx: &RequestContext,
        response: &nova_rest::Response,
    ) -> Option<nova_rest::Response> {
        tracing::info!(
            request_id = %ctx.request_id(),
            status = response.status().as_u16(),
            "response sent"
        );
        None
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("nova_rest=info");

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    config.bind_address = args.bind.clone();
    if args.no_introspection {
        config.introspection_enabled = false;
    }

    tracing::info!(
        bind_address = %config.bind_address,
        handler_threads = config.handler_threads,
        handler_timeout_millis = config.handler_timeout_millis,
        "configuration loaded"
    );

    let mut server = HttpServer::builder()
        .config(config)
        .interceptor(AccessLog)
        .route(HttpMethod::Post, "/echo", |ctx| {
            Ok(HandlerOutcome::Content(json!({
                "body": ctx.body(),
                "params": ctx.params(),
            })))
        })
        .route(HttpMethod::Get, "/users/{id}", |ctx| {
            let id = ctx
                .path_terms()
                .get(1)
                .cloned()
                .ok_or(HandlerError::ParamsNotMatched)?;
            if id.chars().all(|c| c.is_ascii_digit()) {
                Ok(HandlerOutcome::Content(json!({
                    "id": id,
                    "name": format!("user-{id}"),
                })))
            } else {
                Err(HandlerError::ParamsConvertError(format!(
                    "user id {id:?} is not numeric"
                )))
            }
        })
        .route(HttpMethod::Get, "/healthz", |_| Ok(HandlerOutcome::NoContent))
        .build()?;

    let addr = server.start()?;
    tracing::info!(address = %addr, "serving; Ctrl+C to stop");
    server.join();
    Ok(())
}
