//! Per-request context.
//!
//! # Responsibilities
//! - Snapshot one inbound request: address, URI, terms, method, headers,
//!   params, body, request id, keep-alive flag
//! - Decide keep-alive from HTTP version + Connection header
//! - Offer an attributes map as interceptor scratch storage
//!
//! # Design Decisions
//! - Immutable after construction except for the attributes map; built at
//!   the start of request handling, dropped after the response is written
//! - Request ids are always server-generated (UUID v4); honoring an
//!   incoming id header is possible later without changing callers
//! - Header lookups compare names case-insensitively so the keep-alive
//!   rules do not depend on how the codec cases header names

use std::collections::HashMap;

use dashmap::DashMap;
use hyper::Version;
use serde_json::Value;
use uuid::Uuid;

use crate::http::visitor::RequestVisitor;
use crate::routing::key::HttpMethod;

const HEADER_CONNECTION: &str = "connection";
const CONNECTION_CLOSE: &str = "close";
const CONNECTION_KEEP_ALIVE: &str = "keep-alive";

/// Immutable-after-construction view of one inbound request.
pub struct RequestContext {
    request_id: String,
    remote_address: String,
    uri: String,
    terms: Vec<String>,
    method: HttpMethod,
    headers: HashMap<String, String>,
    params: HashMap<String, String>,
    body: String,
    keep_alive: bool,
    attributes: DashMap<String, Value>,
}

impl RequestContext {
    /// Build a context from any transport's visitor.
    pub fn from_visitor(visitor: &dyn RequestVisitor) -> Self {
        let headers = visitor.headers();
        let keep_alive = keep_alive_for(visitor.http_version(), &headers);

        Self {
            request_id: Uuid::new_v4().to_string(),
            remote_address: visitor.remote_address(),
            uri: visitor.uri(),
            terms: visitor.path_terms(),
            method: visitor.method(),
            params: visitor.params(),
            body: visitor.body(),
            headers,
            keep_alive,
            attributes: DashMap::new(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path_terms(&self) -> &[String] {
        &self.terms
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Merged query/body parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Header by name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Interceptor scratch storage; the only mutation the context allows.
    pub fn set_attribute(&self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).map(|v| v.value().clone())
    }
}

/// Keep-alive table:
///
/// | version | Connection header            | keep_alive |
/// |---------|------------------------------|------------|
/// | 1.1     | absent or not "close"        | true       |
/// | 1.1     | "close"                      | false      |
/// | 1.0     | "keep-alive" (any case)      | true       |
/// | 1.0     | absent or anything else      | false      |
///
/// The 1.1 check compares exactly, the 1.0 check case-insensitively.
fn keep_alive_for(version: Version, headers: &HashMap<String, String>) -> bool {
    let connection = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(HEADER_CONNECTION))
        .map(|(_, v)| v.as_str());

    let mut keep_alive = true;
    if version == Version::HTTP_11 && connection == Some(CONNECTION_CLOSE) {
        keep_alive = false;
    }
    if version == Version::HTTP_10
        && !connection.is_some_and(|v| v.eq_ignore_ascii_case(CONNECTION_KEEP_ALIVE))
    {
        keep_alive = false;
    }
    keep_alive
}
