use crate::pipeline::{BoxFuture, PipelineResult, RequestContext};
use async_trait::async_trait;

/// The rest of the pipeline, from the current interceptor inward.
///
/// Consuming `Next` without calling [`Next::run`] short-circuits the
/// chain: the handler (and every inner interceptor) never executes.
pub struct Next {
    run: Box<dyn FnOnce(RequestContext) -> BoxFuture<PipelineResult> + Send>,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(RequestContext) -> BoxFuture<PipelineResult> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the rest of the chain.
    pub async fn run(self, ctx: RequestContext) -> PipelineResult {
        (self.run)(ctx).await
    }
}

/// A pipeline stage wrapping handler execution.
///
/// Code before `next.run(ctx)` runs pre-handler; code after it runs
/// post-handler and may rewrite the response. An exception thrown after
/// `next` resolves skips the remaining inner interceptors and goes
/// straight to the filter layer; it never re-enters earlier
/// interceptors.
///
/// # Example: response caching
/// ```
/// use cadre::pipeline::{Interceptor, Next, PipelineResult, RequestContext};
/// use cadre::async_trait;
/// use dashmap::DashMap;
/// use axum::response::IntoResponse;
///
/// #[derive(Default)]
/// struct CacheInterceptor {
///     cache: DashMap<String, String>,
/// }
///
/// #[async_trait]
/// impl Interceptor for CacheInterceptor {
///     async fn intercept(&self, ctx: RequestContext, next: Next) -> PipelineResult {
///         let key = ctx.uri.to_string();
///         if ctx.method == axum::http::Method::GET {
///             if let Some(hit) = self.cache.get(&key) {
///                 // Short-circuit: the handler never runs.
///                 return Ok(hit.clone().into_response());
///             }
///         }
///         next.run(ctx).await
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, ctx: RequestContext, next: Next) -> PipelineResult;
}
