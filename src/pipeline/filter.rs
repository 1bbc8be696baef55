use crate::exception::{ExceptionKind, HttpException};
use crate::pipeline::RequestSnapshot;
use axum::response::Response;
use std::sync::Arc;

/// Which exceptions a filter claims.
#[derive(Debug, Clone)]
pub enum CatchScope {
    /// Catch everything not claimed by a kind-specific filter.
    All,
    /// Catch only the listed kinds.
    Kinds(Vec<ExceptionKind>),
}

/// A pipeline stage that converts thrown exceptions into structured
/// responses.
///
/// Filters may be bound at method, controller, or global scope. A
/// kind-specific filter always takes precedence over a catch-all for its
/// declared kinds, so registering a catch-all before (or after) a
/// specific filter never shadows the specific one. Among filters of the
/// same specificity, the more local scope wins, then declaration order.
pub trait ExceptionFilter: Send + Sync + 'static {
    fn catches(&self) -> CatchScope {
        CatchScope::All
    }

    fn catch(&self, exception: &HttpException, request: &RequestSnapshot) -> Response;
}

/// Ordered filter list for one route: method filters first, then
/// controller, then global, each in declaration order.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn ExceptionFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn ExceptionFilter>>) -> Self {
        Self { filters }
    }

    /// Route an exception to the first applicable filter, or fall back
    /// to the exception's own normalized JSON response.
    pub fn handle(&self, exception: &HttpException, request: &RequestSnapshot) -> Response {
        for filter in &self.filters {
            if let CatchScope::Kinds(kinds) = filter.catches() {
                if kinds.contains(&exception.kind) {
                    return filter.catch(exception, request);
                }
            }
        }
        for filter in &self.filters {
            if matches!(filter.catches(), CatchScope::All) {
                return filter.catch(exception, request);
            }
        }
        exception.to_response()
    }
}
