//! Parameter bindings.
//!
//! A route declares how each handler argument is extracted from the
//! request context. Bindings are evaluated at handler-invocation time,
//! after guards and interceptor pre-code, immediately before the handler
//! runs. Custom bindings read the `states` bag or the raw request, which
//! is how user-defined parameter extraction is expressed without
//! decorators.

use crate::exception::HttpException;
use crate::pipeline::RequestContext;
use serde_json::Value;
use std::sync::Arc;

/// An extracted handler argument.
pub type ParamValue = Value;

type Extractor = Arc<dyn Fn(&RequestContext) -> Result<ParamValue, HttpException> + Send + Sync>;

/// One declared handler argument.
#[derive(Clone)]
pub struct ParamBinding {
    pub name: String,
    extractor: Extractor,
}

impl ParamBinding {
    /// A path parameter, e.g. the `id` in `/cats/{id}`. Missing
    /// parameters are a 400, which only happens when the binding names a
    /// segment the route does not declare.
    pub fn path(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.clone();
        Self {
            name,
            extractor: Arc::new(move |ctx| {
                ctx.path_params
                    .get(&key)
                    .map(|v| Value::String(v.clone()))
                    .ok_or_else(|| {
                        HttpException::bad_request(format!("Missing path parameter '{key}'"))
                    })
            }),
        }
    }

    /// A query-string parameter; `Null` when absent.
    pub fn query(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.clone();
        Self {
            name,
            extractor: Arc::new(move |ctx| {
                Ok(ctx
                    .query
                    .get(&key)
                    .map(|v| Value::String(v.clone()))
                    .unwrap_or(Value::Null))
            }),
        }
    }

    /// The request body parsed as JSON; `Null` for an empty body.
    pub fn body() -> Self {
        Self {
            name: "body".to_string(),
            extractor: Arc::new(|ctx| ctx.body_json()),
        }
    }

    /// An entry from the context's `states` bag; `Null` when absent.
    pub fn state(key: impl Into<String>) -> Self {
        let name = key.into();
        let key = name.clone();
        Self {
            name,
            extractor: Arc::new(move |ctx| Ok(ctx.state(&key).cloned().unwrap_or(Value::Null))),
        }
    }

    /// The request id assigned by the dispatcher.
    pub fn request_id() -> Self {
        Self {
            name: "request_id".to_string(),
            extractor: Arc::new(|ctx| Ok(Value::String(ctx.id.to_string()))),
        }
    }

    /// A user-defined extraction over the raw context.
    pub fn custom<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<ParamValue, HttpException> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            extractor: Arc::new(f),
        }
    }

    pub(crate) fn extract(&self, ctx: &RequestContext) -> Result<ParamValue, HttpException> {
        (self.extractor)(ctx)
    }
}
