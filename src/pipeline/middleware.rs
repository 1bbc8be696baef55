//! Framework middleware.
//!
//! Middleware wraps the whole router through a tower [`Layer`], so it
//! runs for every request reaching the server, including requests that
//! will 404. Exceptions raised by middleware are converted into their
//! normalized JSON response here; they never reach the engine as errors.

use crate::exception::HttpException;
use crate::pipeline::BoxFuture;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// The rest of the middleware chain (ultimately the router).
pub struct MiddlewareNext {
    run: Box<dyn FnOnce(Request<Body>) -> BoxFuture<Result<Response, HttpException>> + Send>,
}

impl MiddlewareNext {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxFuture<Result<Response, HttpException>> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    pub async fn run(self, request: Request<Body>) -> Result<Response, HttpException> {
        (self.run)(request).await
    }
}

/// A stage that sees every raw request before routing.
///
/// Middleware typically rewrites headers, records metrics, or seeds the
/// downstream [`crate::pipeline::StateSeed`] extension for matched
/// routes.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(
        &self,
        request: Request<Body>,
        next: MiddlewareNext,
    ) -> Result<Response, HttpException>;
}

/// Tower layer running a shared middleware chain around the router.
#[derive(Clone)]
pub struct MiddlewareLayer {
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareLayer {
    pub fn new(middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            middleware: Arc::new(middleware),
        }
    }
}

impl<S> Layer<S> for MiddlewareLayer {
    type Service = MiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareService {
            inner,
            middleware: self.middleware.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MiddlewareService<S> {
    inner: S,
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
}

impl<S> Service<Request<Body>> for MiddlewareService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let middleware = self.middleware.clone();
        // Take the service that was polled ready, leave a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut chain = MiddlewareNext::new(move |request| {
                Box::pin(async move {
                    match inner.call(request).await {
                        Ok(response) => Ok(response),
                        Err(never) => match never {},
                    }
                })
            });

            // Fold in reverse so the first middleware wraps the rest.
            for i in (0..middleware.len()).rev() {
                let stage = middleware[i].clone();
                let next_chain = chain;
                chain = MiddlewareNext::new(move |request| {
                    Box::pin(async move { stage.handle(request, next_chain).await })
                });
            }

            match chain.run(request).await {
                Ok(response) => Ok(response),
                Err(exception) => Ok(exception.to_response()),
            }
        })
    }
}
