//! Controller and route definitions.
//!
//! Controllers are declared through builders rather than attribute
//! macros: a [`ControllerBuilder`] names the class, its path prefix, its
//! dependencies, and its routes; each [`RouteBuilder`] binds an HTTP
//! method and path to a typed handler closure over the controller
//! instance. Guards, interceptors, and filters may be attached at either
//! level; method-level bindings are additive to controller-level ones.

use crate::exception::HttpException;
use crate::pipeline::{BoxFuture, ExceptionFilter, Guard, Interceptor, ParamBinding, ParamValue, RequestContext};
use crate::provider::{FactoryArgs, InjectDep, Instance, ProviderFactory};
use axum::http::Method;
use axum::response::Response;
use axum::routing::MethodFilter;
use std::sync::Arc;

/// HTTP methods a route can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_method(&self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    pub(crate) fn method_filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Delete => MethodFilter::DELETE,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Head => MethodFilter::HEAD,
            HttpMethod::Options => MethodFilter::OPTIONS,
        }
    }
}

/// Type-erased route handler: controller instance, request context,
/// extracted params in binding order.
pub type ErasedHandler = Arc<
    dyn Fn(Instance, RequestContext, Vec<ParamValue>) -> BoxFuture<Result<Response, HttpException>>
        + Send
        + Sync,
>;

/// One route on a controller.
#[derive(Clone)]
pub struct RouteDefinition {
    pub method: HttpMethod,
    pub path: String,
    /// Secondary path registered for the same handler.
    pub alias: Option<String>,
    /// Register only the alias, suppressing the prefixed primary path.
    pub is_alias_only: bool,
    pub handler_name: String,
    pub handler: ErasedHandler,
    pub params: Vec<ParamBinding>,
    pub guards: Vec<Arc<dyn Guard>>,
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    pub filters: Vec<Arc<dyn ExceptionFilter>>,
}

/// Builder for [`RouteDefinition`].
pub struct RouteBuilder {
    method: HttpMethod,
    path: String,
    alias: Option<String>,
    is_alias_only: bool,
    handler_name: String,
    handler: Option<ErasedHandler>,
    params: Vec<ParamBinding>,
    guards: Vec<Arc<dyn Guard>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    filters: Vec<Arc<dyn ExceptionFilter>>,
}

macro_rules! route_ctor {
    ($name:ident, $method:ident) => {
        pub fn $name(path: impl Into<String>) -> Self {
            Self::new(HttpMethod::$method, path)
        }
    };
}

impl RouteBuilder {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            alias: None,
            is_alias_only: false,
            handler_name: String::new(),
            handler: None,
            params: Vec::new(),
            guards: Vec::new(),
            interceptors: Vec::new(),
            filters: Vec::new(),
        }
    }

    route_ctor!(get, Get);
    route_ctor!(post, Post);
    route_ctor!(put, Put);
    route_ctor!(delete, Delete);
    route_ctor!(patch, Patch);
    route_ctor!(head, Head);
    route_ctor!(options, Options);

    /// Also serve this handler at `path`, untouched by the controller's
    /// path prefix.
    pub fn alias(mut self, path: impl Into<String>) -> Self {
        self.alias = Some(path.into());
        self
    }

    /// Only serve the alias path.
    pub fn alias_only(mut self) -> Self {
        self.is_alias_only = true;
        self
    }

    /// Bind the handler. `C` is the controller type; `params` are handed
    /// over in the order the bindings were declared.
    pub fn handler<C, F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(Arc<C>, RequestContext, Vec<ParamValue>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, HttpException>> + Send + 'static,
    {
        self.handler_name = name.into();
        self.handler = Some(Arc::new(move |instance, ctx, params| {
            match instance.downcast::<C>() {
                Ok(controller) => Box::pin(f(controller, ctx, params)),
                Err(_) => Box::pin(async {
                    Err(HttpException::internal_server_error(
                        "Controller instance type mismatch",
                    ))
                }),
            }
        }));
        self
    }

    pub fn param(mut self, binding: ParamBinding) -> Self {
        self.params.push(binding);
        self
    }

    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn ExceptionFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn build(self) -> RouteDefinition {
        let handler_name = if self.handler_name.is_empty() {
            format!("{:?} {}", self.method, self.path)
        } else {
            self.handler_name
        };
        let handler = self.handler.unwrap_or_else(|| {
            Arc::new(|_, _, _| {
                Box::pin(async { Err(HttpException::not_implemented("No handler bound")) })
            })
        });
        RouteDefinition {
            method: self.method,
            path: self.path,
            alias: self.alias,
            is_alias_only: self.is_alias_only,
            handler_name,
            handler,
            params: self.params,
            guards: self.guards,
            interceptors: self.interceptors,
            filters: self.filters,
        }
    }
}

/// A declared controller: class name, path prefixes, dependencies,
/// bindings, routes.
#[derive(Clone)]
pub struct ControllerDefinition {
    pub name: String,
    pub path_prefix: String,
    pub alias_prefix: Option<String>,
    pub inject: Vec<InjectDep>,
    pub factory: ProviderFactory,
    pub guards: Vec<Arc<dyn Guard>>,
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    pub filters: Vec<Arc<dyn ExceptionFilter>>,
    pub routes: Vec<RouteDefinition>,
}

/// Builder for [`ControllerDefinition`].
///
/// # Example
/// ```no_run
/// use cadre::controller::{ControllerBuilder, RouteBuilder};
/// use cadre::pipeline::ParamBinding;
/// use axum::response::IntoResponse;
/// use axum::Json;
/// use std::sync::Arc;
///
/// struct CatsController;
///
/// impl CatsController {
///     async fn find_one(&self, id: String) -> Json<String> {
///         Json(format!("cat {id}"))
///     }
/// }
///
/// let controller = ControllerBuilder::new::<CatsController>("/cats")
///     .factory(|_| Ok(Arc::new(CatsController)))
///     .route(
///         RouteBuilder::get("/{id}")
///             .param(ParamBinding::path("id"))
///             .handler::<CatsController, _, _>("find_one", |ctrl, _ctx, params| async move {
///                 let id = params[0].as_str().unwrap_or_default().to_string();
///                 Ok(ctrl.find_one(id).await.into_response())
///             })
///             .build(),
///     )
///     .build();
/// ```
pub struct ControllerBuilder {
    definition: ControllerDefinition,
}

impl ControllerBuilder {
    pub fn new<C: 'static>(path_prefix: impl Into<String>) -> Self {
        Self {
            definition: ControllerDefinition {
                name: short_type_name::<C>(),
                path_prefix: path_prefix.into(),
                alias_prefix: None,
                inject: Vec::new(),
                factory: Arc::new(|_| {
                    Err(crate::error::CadreError::ModuleRegistrationFailed {
                        message: "controller declares no factory".to_string(),
                    })
                }),
                guards: Vec::new(),
                interceptors: Vec::new(),
                filters: Vec::new(),
                routes: Vec::new(),
            },
        }
    }

    /// Prefix applied to route aliases instead of `path_prefix`.
    pub fn alias_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.definition.alias_prefix = Some(prefix.into());
        self
    }

    /// Declare the controller's dependencies, in factory argument order.
    pub fn inject<I, D>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<InjectDep>,
    {
        self.definition.inject = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&FactoryArgs) -> crate::error::Result<Instance> + Send + Sync + 'static,
    {
        self.definition.factory = Arc::new(factory);
        self
    }

    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.definition.guards.push(guard);
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.definition.interceptors.push(interceptor);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn ExceptionFilter>) -> Self {
        self.definition.filters.push(filter);
        self
    }

    pub fn route(mut self, route: RouteDefinition) -> Self {
        self.definition.routes.push(route);
        self
    }

    pub fn build(self) -> ControllerDefinition {
        self.definition
    }
}

/// Last path segment of a type name; `foo::bar::CatsController`
/// becomes `CatsController`.
pub(crate) fn short_type_name<T: 'static>() -> String {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

/// Join a prefix and a route path into a mountable axum path.
pub(crate) fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{path}")
    };
    if joined.is_empty() {
        "/".to_string()
    } else if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}
