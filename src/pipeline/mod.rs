//! Request Pipeline Dispatcher
//!
//! Every matched request runs the fixed stage order
//!
//! ```text
//! RECEIVED -> MIDDLEWARE -> GUARD -> INTERCEPTOR(pre) -> HANDLER
//!          -> INTERCEPTOR(post) -> RESPONDED
//!                      \-> (exception at any stage) -> EXCEPTION_FILTER -> RESPONDED
//! ```
//!
//! Middleware is mounted at the router level and also runs for requests
//! that will 404; guards, interceptors, and the handler only run for
//! matched routes. The pipeline is reentrant: all per-request state lives
//! in [`RequestContext`], never in shared module-level state.

mod context;
mod dispatcher;
mod filter;
mod guard;
mod interceptor;
mod logging;
mod middleware;
mod params;

use std::future::Future;
use std::pin::Pin;

/// Boxed future used throughout the pipeline's type-erased chains.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The outcome of a pipeline stage: a response, or an exception bound
/// for the filter layer.
pub type PipelineResult = Result<axum::response::Response, crate::exception::HttpException>;

pub use context::{CancellationSignal, RequestContext, RequestSnapshot, StateSeed};
pub(crate) use dispatcher::RoutePipeline;
pub use filter::{CatchScope, ExceptionFilter, FilterChain};
pub use guard::Guard;
pub use interceptor::{Interceptor, Next};
pub use logging::LoggingInterceptor;
pub use middleware::{Middleware, MiddlewareLayer, MiddlewareNext};
pub use params::{ParamBinding, ParamValue};
