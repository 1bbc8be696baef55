use crate::pipeline::{Interceptor, Next, PipelineResult, RequestContext};
use async_trait::async_trait;
use std::time::Instant;

/// An interceptor that logs request timing and status.
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, ctx: RequestContext, next: Next) -> PipelineResult {
        let method = ctx.method.clone();
        let uri = ctx.uri.clone();
        let start = Instant::now();

        tracing::info!("--> {} {}", method, uri);

        match next.run(ctx).await {
            Ok(response) => {
                tracing::info!(
                    "<-- {} {} {} {:?}",
                    method,
                    uri,
                    response.status(),
                    start.elapsed()
                );
                Ok(response)
            }
            Err(exception) => {
                tracing::info!(
                    "<-- {} {} {} {:?}",
                    method,
                    uri,
                    exception.status_code(),
                    start.elapsed()
                );
                Err(exception)
            }
        }
    }
}
