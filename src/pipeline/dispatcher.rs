//! Per-route dispatch.
//!
//! Each mounted route owns one `RoutePipeline`: the controller instance,
//! the merged guard/interceptor/filter chains for its scopes, the param
//! bindings, and the erased handler. The pipeline is shared across
//! concurrent requests; everything mutable lives in the per-request
//! [`RequestContext`].

use crate::controller::ErasedHandler;
use crate::exception::HttpException;
use crate::pipeline::{
    FilterChain, Guard, Interceptor, Next, ParamBinding, PipelineResult, RequestContext,
};
use crate::provider::Instance;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::sync::Arc;

pub(crate) struct RoutePipeline {
    pub controller: Instance,
    pub controller_name: String,
    pub handler_name: String,
    /// Global, then controller, then method guards.
    pub guards: Vec<Arc<dyn Guard>>,
    /// Global outermost, method innermost.
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    pub filters: FilterChain,
    pub params: Vec<ParamBinding>,
    pub handler: ErasedHandler,
}

impl RoutePipeline {
    pub(crate) async fn dispatch(self: Arc<Self>, request: Request<Body>) -> Response {
        let ctx = match RequestContext::from_request(request).await {
            Ok(ctx) => ctx,
            Err(exception) => return exception.to_response(),
        };
        let snapshot = ctx.snapshot();

        match self.execute(ctx).await {
            Ok(response) => response,
            Err(exception) => {
                tracing::debug!(
                    handler = %format!("{}::{}", self.controller_name, self.handler_name),
                    status = exception.status_code(),
                    "request failed: {}",
                    exception.message
                );
                self.filters.handle(&exception, &snapshot)
            }
        }
    }

    async fn execute(&self, mut ctx: RequestContext) -> PipelineResult {
        // GUARD stage: all guards run before any interceptor. Guards may
        // write to the states bag (an authenticated user, say).
        for guard in &self.guards {
            if !guard.can_activate(&mut ctx).await? {
                return Err(HttpException::forbidden("Forbidden resource"));
            }
        }

        // Innermost link: evaluate param bindings, then call the handler.
        let controller = self.controller.clone();
        let handler = self.handler.clone();
        let params = self.params.clone();
        let mut chain = Next::new(move |ctx: RequestContext| {
            Box::pin(async move {
                let mut values = Vec::with_capacity(params.len());
                for binding in &params {
                    values.push(binding.extract(&ctx)?);
                }
                handler(controller, ctx, values).await
            })
        });

        // Wrap interceptors in reverse so interceptors[0] is outermost.
        for i in (0..self.interceptors.len()).rev() {
            let interceptor = self.interceptors[i].clone();
            let next_chain = chain;
            chain = Next::new(move |ctx| {
                Box::pin(async move { interceptor.intercept(ctx, next_chain).await })
            });
        }

        chain.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CatchScope;
    use async_trait::async_trait;
    use axum::http::{Method, StatusCode};
    use axum::response::IntoResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct DenyGuard;

    #[async_trait]
    impl Guard for DenyGuard {
        async fn can_activate(&self, _ctx: &mut RequestContext) -> Result<bool, HttpException> {
            Ok(false)
        }
    }

    struct TraceInterceptor {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_after: bool,
    }

    #[async_trait]
    impl Interceptor for TraceInterceptor {
        async fn intercept(&self, ctx: RequestContext, next: Next) -> PipelineResult {
            self.log.lock().unwrap().push(format!("{}:pre", self.label));
            // An inner exception propagates here and skips the post-code.
            let response = next.run(ctx).await?;
            self.log.lock().unwrap().push(format!("{}:post", self.label));
            if self.fail_after {
                return Err(HttpException::conflict("post-handler failure"));
            }
            Ok(response)
        }
    }

    fn pipeline(
        guards: Vec<Arc<dyn Guard>>,
        interceptors: Vec<Arc<dyn Interceptor>>,
        filters: FilterChain,
        calls: Arc<AtomicUsize>,
    ) -> Arc<RoutePipeline> {
        Arc::new(RoutePipeline {
            controller: Arc::new(()),
            controller_name: "TestController".into(),
            handler_name: "handle".into(),
            guards,
            interceptors,
            filters,
            params: Vec::new(),
            handler: Arc::new(move |_, _, _| {
                let calls = calls.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(StatusCode::OK.into_response())
                })
            }),
        })
    }

    fn request() -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri("/test")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn guard_false_short_circuits_with_forbidden_resource() {
        let calls = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(
            vec![Arc::new(DenyGuard)],
            vec![Arc::new(TraceInterceptor {
                label: "a",
                log: Arc::clone(&log),
                fail_after: false,
            })],
            FilterChain::default(),
            Arc::clone(&calls),
        );

        let response = pipeline.dispatch(request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["statusCode"], 403);
        assert_eq!(body["message"], "Forbidden resource");

        // Neither the handler nor any interceptor pre-code ran.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn interceptors_wrap_the_handler_outer_to_inner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(
            Vec::new(),
            vec![
                Arc::new(TraceInterceptor {
                    label: "outer",
                    log: Arc::clone(&log),
                    fail_after: false,
                }),
                Arc::new(TraceInterceptor {
                    label: "inner",
                    log: Arc::clone(&log),
                    fail_after: false,
                }),
            ],
            FilterChain::default(),
            Arc::clone(&calls),
        );

        let response = pipeline.dispatch(request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:pre", "inner:pre", "inner:post", "outer:post"]
        );
    }

    #[tokio::test]
    async fn post_next_exception_goes_to_filters_not_back_through_interceptors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        struct Marker;
        impl crate::pipeline::ExceptionFilter for Marker {
            fn catches(&self) -> CatchScope {
                CatchScope::Kinds(vec![crate::exception::ExceptionKind::Conflict])
            }
            fn catch(
                &self,
                _exception: &HttpException,
                _request: &crate::pipeline::RequestSnapshot,
            ) -> Response {
                (StatusCode::CONFLICT, "filtered").into_response()
            }
        }

        let pipeline = pipeline(
            Vec::new(),
            vec![
                Arc::new(TraceInterceptor {
                    label: "outer",
                    log: Arc::clone(&log),
                    fail_after: false,
                }),
                // The inner interceptor throws after next resolves.
                Arc::new(TraceInterceptor {
                    label: "inner",
                    log: Arc::clone(&log),
                    fail_after: true,
                }),
            ],
            FilterChain::new(vec![Arc::new(Marker)]),
            Arc::clone(&calls),
        );

        let response = pipeline.dispatch(request()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The exception skipped the outer interceptor's post-code and
        // went straight to the filter layer.
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:pre", "inner:pre", "inner:post"]
        );
    }
}
