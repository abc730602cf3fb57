//! Transport-agnostic request access.
//!
//! # Responsibilities
//! - Decouple the core from the HTTP codec library behind a visitor trait
//! - Provide the hyper-backed implementation used by the serving path
//! - Merge query-string and body-form parameters into one map
//!
//! # Design Decisions
//! - The visitor is the only seam that sees codec types; everything above
//!   it works with plain strings and maps
//! - Parameter merge order: query string first, then body form params for
//!   non-GET methods. First write wins per key: later values never
//!   override earlier ones. This reproduces long-standing behavior that
//!   callers may depend on; see DESIGN.md before "fixing" it.

use std::collections::HashMap;
use std::net::SocketAddr;

use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::Version;
use url::form_urlencoded;

use crate::routing::key::{split_terms, HttpMethod};

const HEADER_FORWARDED_FOR: &str = "x-forwarded-for";

/// Read-only view of one parsed inbound request.
///
/// Implemented by the hyper adapter below; tests implement it directly to
/// drive the context builder without sockets.
pub trait RequestVisitor {
    /// Originating client address, preferring a forwarded-for header over
    /// the peer socket address.
    fn remote_address(&self) -> String;

    /// Raw URI including any query string.
    fn uri(&self) -> String;

    /// Path split on `/` with empty segments omitted.
    fn path_terms(&self) -> Vec<String>;

    /// Parsed method; unrecognized tokens classify as `Unknown`.
    fn method(&self) -> HttpMethod;

    /// Raw body decoded as UTF-8 (lossy).
    fn body(&self) -> String;

    /// Merged query + body parameters, first write wins per key.
    fn params(&self) -> HashMap<String, String>;

    /// Header map; names are lower-cased by the codec.
    fn headers(&self) -> HashMap<String, String>;

    fn http_version(&self) -> Version;
}

/// `RequestVisitor` over a hyper request that has already been read to
/// completion (head + aggregated body bytes).
pub struct HyperRequestVisitor<'a> {
    parts: &'a Parts,
    body: &'a Bytes,
    peer: SocketAddr,
}

impl<'a> HyperRequestVisitor<'a> {
    pub fn new(parts: &'a Parts, body: &'a Bytes, peer: SocketAddr) -> Self {
        Self { parts, body, peer }
    }
}

impl RequestVisitor for HyperRequestVisitor<'_> {
    fn remote_address(&self) -> String {
        self.parts
            .headers
            .get(HEADER_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| self.peer.ip().to_string())
    }

    fn uri(&self) -> String {
        self.parts.uri.to_string()
    }

    fn path_terms(&self) -> Vec<String> {
        split_terms(self.parts.uri.path())
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::parse(self.parts.method.as_str())
    }

    fn body(&self) -> String {
        String::from_utf8_lossy(self.body).into_owned()
    }

    fn params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();

        if let Some(query) = self.parts.uri.query() {
            for (k, v) in form_urlencoded::parse(query.as_bytes()) {
                params.entry(k.into_owned()).or_insert_with(|| v.into_owned());
            }
        }

        if self.method() != HttpMethod::Get {
            for (k, v) in form_urlencoded::parse(self.body) {
                params.entry(k.into_owned()).or_insert_with(|| v.into_owned());
            }
        }

        params
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::with_capacity(self.parts.headers.len());
        for (name, value) in self.parts.headers.iter() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_owned())
                    .or_insert_with(|| value.to_owned());
            }
        }
        headers
    }

    fn http_version(&self) -> Version {
        self.parts.version
    }
}
