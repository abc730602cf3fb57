//! Route identity and matching semantics.
//!
//! # Responsibilities
//! - Represent a route as HTTP method + ordered path terms
//! - Wildcard-aware equality: `{name}` terms match any literal
//! - Coarse hashing so equal keys land in the same index cell
//!
//! # Design Decisions
//! - Hash covers only method and term count, never term content. Matching
//!   correctness is carried entirely by equality; the cost is a linear probe
//!   within a (method, count) cell when looking up routes that do not exist.
//!   Deliberate trade of bucket precision for cheap hashing.
//! - Equality with wildcards is not transitive (`a/{x}` equals both `a/b`
//!   and `a/c`). The route table compensates by rejecting registrations that
//!   would make two keys mutually equal, so within one cell every stored key
//!   matches at most one probe.

use std::fmt;
use std::hash::{Hash, Hasher};

/// First character marking a path term as a variable (wildcard) segment.
pub const VARIABLE_MARKER: char = '{';

/// Closed enumeration of HTTP methods.
///
/// `Unknown` is an explicit sentinel, never an `Option`: request parsing is
/// total and the dispatcher answers 405 for it instead of erroring out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
    Connect,
    Unknown,
}

impl HttpMethod {
    /// Number of registrable methods (everything except `Unknown`).
    pub(crate) const REGISTRABLE: usize = 9;

    /// Classify a method token. Unrecognized or empty input becomes
    /// `Unknown` rather than an error.
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "TRACE" => Self::Trace,
            "CONNECT" => Self::Connect,
            _ => Self::Unknown,
        }
    }

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Stable index used by the route table's first-level dimension.
    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Get => 0,
            Self::Post => 1,
            Self::Put => 2,
            Self::Delete => 3,
            Self::Head => 4,
            Self::Options => 5,
            Self::Patch => 6,
            Self::Trace => 7,
            Self::Connect => 8,
            Self::Unknown => Self::REGISTRABLE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a registered route: method plus ordered path terms.
#[derive(Debug, Clone)]
pub struct RouteKey {
    method: HttpMethod,
    terms: Vec<String>,
}

impl RouteKey {
    /// Build a key from an explicit method and path string.
    ///
    /// The path is truncated at the first `?`, split on `/`, each term
    /// trimmed, and empty terms dropped, so `/users//42?x=1` and
    /// `/users/42` produce the same terms.
    pub fn from_path(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            terms: split_terms(path),
        }
    }

    /// Build a key from already-split terms (the request path of an inbound
    /// message arrives pre-split from the visitor).
    pub fn from_terms(method: HttpMethod, terms: Vec<String>) -> Self {
        Self { method, terms }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// True if the term at `index` is a variable segment.
    pub fn is_variable(&self, index: usize) -> bool {
        self.terms
            .get(index)
            .map(|t| is_wildcard(t))
            .unwrap_or(false)
    }
}

/// Truncate at `?`, split on `/`, trim, omit empty segments.
pub(crate) fn split_terms(path: &str) -> Vec<String> {
    let base = path.split('?').next().unwrap_or(path);
    base.split('/')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_wildcard(term: &str) -> bool {
    term.as_bytes().first() == Some(&(VARIABLE_MARKER as u8))
}

impl PartialEq for RouteKey {
    /// Wildcard-aware matching: methods and term counts must agree, and at
    /// every position either side may be a wildcard or both literals must be
    /// equal.
    fn eq(&self, other: &Self) -> bool {
        if self.method != other.method || self.terms.len() != other.terms.len() {
            return false;
        }
        self.terms
            .iter()
            .zip(other.terms.iter())
            .all(|(a, b)| is_wildcard(a) || is_wildcard(b) || a == b)
    }
}

impl Eq for RouteKey {}

impl Hash for RouteKey {
    /// Coarse on purpose: method + term count only. See the module docs.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method.hash(state);
        self.terms.len().hash(state);
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}", self.method, self.terms.join("/"))
    }
}
