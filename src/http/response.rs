//! Response construction and outcome mapping.
//!
//! # Responsibilities
//! - Build responses carrying the identity headers every reply gets:
//!   `request-id`, `server`, `connection: keep-alive`
//! - Map handler outcomes to HTTP status codes
//!
//! # Design Decisions
//! - Status-only responses carry an empty JSON object body so clients
//!   always receive valid JSON; 204 stays body-less per protocol
//! - The keep-alive header is set unconditionally here; the connection
//!   layer overrides it to `close` on the non-keep-alive path

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONNECTION, CONTENT_TYPE, SERVER};
use hyper::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use crate::error::HandlerError;
use crate::http::context::RequestContext;
use crate::routing::handler::{HandlerOutcome, HandlerResult};

/// The response type flowing through interceptors and out to the codec.
pub type Response = hyper::Response<Full<Bytes>>;

/// Identity reported in the `server` header of every response.
pub const SERVER_IDENT: &str = "nova-rest/0.1";

pub const HEADER_REQUEST_ID: HeaderName = HeaderName::from_static("request-id");

const CONTENT_TYPE_JSON: &str = "application/json";
const EMPTY_JSON_BODY: &[u8] = b"{}";

/// Builder for the crate's uniform response shape.
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Status-only response for a request with a known context.
    pub fn status(ctx: &RequestContext, status: StatusCode) -> Response {
        Self::build(ctx.request_id(), status, Self::filler_body(status))
    }

    /// 200 response with a JSON payload. A payload that cannot be encoded
    /// counts as an invalid handler response and becomes 502.
    pub fn json(ctx: &RequestContext, value: &Value) -> Response {
        match serde_json::to_vec(value) {
            Ok(body) => Self::build(ctx.request_id(), StatusCode::OK, Bytes::from(body)),
            Err(_) => Self::status(ctx, StatusCode::BAD_GATEWAY),
        }
    }

    /// Status response for failures that occur before a context exists
    /// (e.g. an oversized body). Still carries a generated request id so
    /// the reply stays correlatable.
    pub fn bare(status: StatusCode) -> Response {
        Self::build(
            &Uuid::new_v4().to_string(),
            status,
            Self::filler_body(status),
        )
    }

    fn filler_body(status: StatusCode) -> Bytes {
        if status == StatusCode::NO_CONTENT {
            Bytes::new()
        } else {
            Bytes::from_static(EMPTY_JSON_BODY)
        }
    }

    fn build(request_id: &str, status: StatusCode, body: Bytes) -> Response {
        let mut response = hyper::Response::new(Full::new(body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        headers.insert(
            HEADER_REQUEST_ID,
            HeaderValue::from_str(request_id)
                .unwrap_or_else(|_| HeaderValue::from_static("invalid")),
        );
        headers.insert(SERVER, HeaderValue::from_static(SERVER_IDENT));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        response
    }
}

/// Map a handler result to the response it produces.
///
/// | outcome                    | status |
/// |----------------------------|--------|
/// | content                    | 200    |
/// | no content                 | 204    |
/// | response not valid         | 502    |
/// | params not matched         | 400    |
/// | params convert error       | 400    |
/// | system / unclassified      | 500    |
pub fn response_for(ctx: &RequestContext, result: HandlerResult) -> Response {
    match result {
        Ok(HandlerOutcome::Content(value)) => ResponseBuilder::json(ctx, &value),
        Ok(HandlerOutcome::NoContent) => ResponseBuilder::status(ctx, StatusCode::NO_CONTENT),
        Err(HandlerError::ResponseNotValid) => ResponseBuilder::status(ctx, StatusCode::BAD_GATEWAY),
        Err(HandlerError::ParamsNotMatched) | Err(HandlerError::ParamsConvertError(_)) => {
            ResponseBuilder::status(ctx, StatusCode::BAD_REQUEST)
        }
        Err(HandlerError::System(_)) => {
            ResponseBuilder::status(ctx, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::visitor::RequestVisitor;
    use hyper::Version;
    use serde_json::json;
    use std::collections::HashMap;

    struct NullVisitor;

    impl RequestVisitor for NullVisitor {
        fn remote_address(&self) -> String {
            "127.0.0.1".into()
        }
        fn uri(&self) -> String {
            "/".into()
        }
        fn path_terms(&self) -> Vec<String> {
            Vec::new()
        }
        fn method(&self) -> crate::routing::HttpMethod {
            crate::routing::HttpMethod::Get
        }
        fn body(&self) -> String {
            String::new()
        }
        fn params(&self) -> HashMap<String, String> {
            HashMap::new()
        }
        fn headers(&self) -> HashMap<String, String> {
            HashMap::new()
        }
        fn http_version(&self) -> Version {
            Version::HTTP_11
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::from_visitor(&NullVisitor)
    }

    #[test]
    fn every_response_carries_identity_headers() {
        let ctx = ctx();
        let resp = ResponseBuilder::status(&ctx, StatusCode::NOT_FOUND);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get(HEADER_REQUEST_ID).unwrap(),
            ctx.request_id()
        );
        assert_eq!(resp.headers().get(SERVER).unwrap(), SERVER_IDENT);
        assert_eq!(resp.headers().get(CONNECTION).unwrap(), "keep-alive");
    }

    #[test]
    fn content_maps_to_200() {
        let resp = response_for(&ctx(), Ok(HandlerOutcome::Content(json!({"ok": true}))));
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn no_content_maps_to_204_without_body() {
        let resp = response_for(&ctx(), Ok(HandlerOutcome::NoContent));
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn handler_errors_map_to_their_status_codes() {
        let cases: Vec<(HandlerError, StatusCode)> = vec![
            (HandlerError::ResponseNotValid, StatusCode::BAD_GATEWAY),
            (HandlerError::ParamsNotMatched, StatusCode::BAD_REQUEST),
            (
                HandlerError::ParamsConvertError("id".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                HandlerError::System("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let resp = response_for(&ctx(), Err(err));
            assert_eq!(resp.status(), expected);
        }
    }
}
