//! Worker-side execution unit.
//!
//! One task is created per routed request and runs entirely on a worker
//! pool thread (or, under backpressure, on the submitting I/O thread):
//! pre-chain → handler → status mapping → post-chain.

use std::sync::Arc;

use hyper::StatusCode;

use crate::dispatch::interceptor::Interceptor;
use crate::http::context::RequestContext;
use crate::http::response::{response_for, Response, ResponseBuilder};
use crate::routing::handler::HandlerDescriptor;

pub struct DispatchTask {
    ctx: Arc<RequestContext>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    descriptor: Arc<HandlerDescriptor>,
}

impl DispatchTask {
    pub fn new(
        ctx: Arc<RequestContext>,
        interceptors: Arc<[Arc<dyn Interceptor>]>,
        descriptor: Arc<HandlerDescriptor>,
    ) -> Self {
        Self {
            ctx,
            interceptors,
            descriptor,
        }
    }

    /// Run the full chain and produce the response to write.
    pub fn run(self) -> Response {
        let mut denied = false;
        for interceptor in self.interceptors.iter() {
            if !interceptor.before(&self.ctx) {
                denied = true;
                break;
            }
        }

        let mut response = if denied {
            ResponseBuilder::status(&self.ctx, StatusCode::FORBIDDEN)
        } else {
            response_for(&self.ctx, self.descriptor.invoke(&self.ctx))
        };

        // post-chain runs even on the denied path; each hook may swap in a
        // replacement response
        for interceptor in self.interceptors.iter() {
            if let Some(replacement) = interceptor.after(&self.ctx, &response) {
                response = replacement;
            }
        }

        response
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http::visitor::RequestVisitor;
    use crate::routing::handler::{HandlerOutcome, HandlerResult};
    use crate::routing::key::{HttpMethod, RouteKey};
    use hyper::Version;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StubVisitor {
        method: HttpMethod,
    }

    impl RequestVisitor for StubVisitor {
        fn remote_address(&self) -> String {
            "127.0.0.1".into()
        }
        fn uri(&self) -> String {
            "/tasks".into()
        }
        fn path_terms(&self) -> Vec<String> {
            vec!["tasks".into()]
        }
        fn method(&self) -> HttpMethod {
            self.method
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

    pub(crate) fn test_context(method: HttpMethod) -> RequestContext {
        RequestContext::from_visitor(&StubVisitor { method })
    }

    fn descriptor_with<F>(handler: F) -> Arc<HandlerDescriptor>
    where
        F: Fn(&RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        Arc::new(HandlerDescriptor::new(
            RouteKey::from_path(HttpMethod::Get, "/tasks"),
            Arc::new(handler),
        ))
    }

    struct Deny;
    impl Interceptor for Deny {
        fn before(&self, _ctx: &RequestContext) -> bool {
            false
        }
    }

    struct Tag;
    impl Interceptor for Tag {
        fn after(&self, ctx: &RequestContext, response: &Response) -> Option<Response> {
            ctx.set_attribute("post_saw_status", response.status().as_u16().into());
            None
        }
    }

    #[test]
    fn handler_runs_when_chain_allows() {
        let ctx = Arc::new(test_context(HttpMethod::Get));
        let calls = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&calls);
        let task = DispatchTask::new(
            ctx,
            Vec::new().into(),
            descriptor_with(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(HandlerOutcome::NoContent)
            }),
        );
        let resp = task.run();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn denied_request_skips_handler_but_runs_post_chain() {
        let ctx = Arc::new(test_context(HttpMethod::Get));
        let calls = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&calls);
        let interceptors: Arc<[Arc<dyn Interceptor>]> =
            vec![Arc::new(Deny) as Arc<dyn Interceptor>, Arc::new(Tag)].into();
        let task = DispatchTask::new(
            Arc::clone(&ctx),
            interceptors,
            descriptor_with(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(HandlerOutcome::NoContent)
            }),
        );
        let resp = task.run();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "handler must not run");
        assert_eq!(
            ctx.attribute("post_saw_status"),
            Some(serde_json::Value::from(403u16))
        );
    }

    #[test]
    fn post_hook_can_replace_the_response() {
        struct Rewrite;
        impl Interceptor for Rewrite {
            fn after(&self, ctx: &RequestContext, _response: &Response) -> Option<Response> {
                Some(ResponseBuilder::status(ctx, StatusCode::IM_A_TEAPOT))
            }
        }
        let ctx = Arc::new(test_context(HttpMethod::Get));
        let interceptors: Arc<[Arc<dyn Interceptor>]> =
            vec![Arc::new(Rewrite) as Arc<dyn Interceptor>].into();
        let task = DispatchTask::new(
            ctx,
            interceptors,
            descriptor_with(|_| Ok(HandlerOutcome::NoContent)),
        );
        assert_eq!(task.run().status(), StatusCode::IM_A_TEAPOT);
    }
}
