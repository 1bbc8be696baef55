//! Application assembly and runtime.
//!
//! [`ApplicationBuilder`] turns a root module into a running axum server:
//! it resolves the module graph, eagerly instantiates singletons, wires
//! lifecycle hooks in instantiation order, mounts every controller route
//! behind its dispatch pipeline, and drives the lifecycle state machine
//! through bootstrap, listening, and shutdown.
//!
//! Closing an application runs the shutdown hook phases and releases the
//! listener, but never terminates the host process: timers and background
//! tasks started by application code keep running.

use crate::controller::join_paths;
use crate::error::{CadreError, Result};
use crate::injector::Injector;
use crate::lifecycle::{
    shutdown_signal, signal_capability, AppState, LifecycleManager, StateMachine,
};
use crate::metadata::{MetadataRegistry, MetadataTarget};
use crate::module::ModuleDefinition;
use crate::pipeline::{
    ExceptionFilter, FilterChain, Guard, Interceptor, Middleware, MiddlewareLayer, RoutePipeline,
};
use crate::provider::HookAttachment;
use axum::body::Body;
use axum::http::{Method, Request, Uri};
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Notify;

/// Where and how `listen` binds.
#[derive(Clone)]
pub struct ListenOptions {
    pub port: u16,
    pub hostname: String,
    on_listen: Option<Arc<dyn Fn(SocketAddr) + Send + Sync>>,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "127.0.0.1".to_string(),
            on_listen: None,
        }
    }
}

impl ListenOptions {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Callback invoked with the bound address once the listener is up.
    pub fn on_listen<F>(mut self, f: F) -> Self
    where
        F: Fn(SocketAddr) + Send + Sync + 'static,
    {
        self.on_listen = Some(Arc::new(f));
        self
    }
}

/// Builder for [`Application`].
///
/// Global guards, interceptors, and filters apply to every mounted route;
/// middleware wraps the whole router and also sees requests that 404.
pub struct ApplicationBuilder {
    root: ModuleDefinition,
    global_guards: Vec<Arc<dyn Guard>>,
    global_interceptors: Vec<Arc<dyn Interceptor>>,
    global_filters: Vec<Arc<dyn ExceptionFilter>>,
    middleware: Vec<Arc<dyn Middleware>>,
    shutdown_hooks: bool,
    listen_options: ListenOptions,
}

impl ApplicationBuilder {
    pub fn new(root: ModuleDefinition) -> Self {
        Self {
            root,
            global_guards: Vec::new(),
            global_interceptors: Vec::new(),
            global_filters: Vec::new(),
            middleware: Vec::new(),
            shutdown_hooks: false,
            listen_options: ListenOptions::default(),
        }
    }

    pub fn global_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.global_guards.push(guard);
        self
    }

    pub fn global_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.global_interceptors.push(interceptor);
        self
    }

    pub fn global_filter(mut self, filter: Arc<dyn ExceptionFilter>) -> Self {
        self.global_filters.push(filter);
        self
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Opt in to OS signal listeners. Without this, only an explicit
    /// `close()` triggers the shutdown hook phases.
    pub fn enable_shutdown_hooks(mut self) -> Self {
        self.shutdown_hooks = true;
        self
    }

    pub fn listen_options(mut self, options: ListenOptions) -> Self {
        self.listen_options = options;
        self
    }

    /// Resolve, instantiate, mount, and run the startup hook phases.
    ///
    /// Any structural error (unknown token, cycle, bad export) or failing
    /// `OnModuleInit`/`OnApplicationBootstrap` hook aborts the build; a
    /// partially initialized application never starts listening.
    pub async fn build(self) -> Result<Application> {
        let state = StateMachine::new();

        let graph = self.root.resolve()?;
        let injector = Injector::new(graph);
        injector.instantiate_all()?;

        let lifecycle = register_hooks(&injector);
        let metadata = MetadataRegistry::new();
        let router = mount_routes(
            &injector,
            &metadata,
            &self.global_guards,
            &self.global_interceptors,
            &self.global_filters,
        )?
        .fallback(not_found)
        .layer(MiddlewareLayer::new(self.middleware));

        lifecycle.call_module_init().await?;
        state.advance(AppState::ModulesInitialized)?;
        lifecycle.call_application_bootstrap().await?;
        state.advance(AppState::Bootstrapped)?;

        Ok(Application {
            injector: Arc::new(injector),
            metadata: Arc::new(metadata),
            lifecycle: Arc::new(lifecycle),
            state: Arc::new(state),
            router,
            shutdown_hooks: self.shutdown_hooks,
            listen_options: self.listen_options,
            shutdown_notify: Arc::new(Notify::new()),
        })
    }
}

/// A bootstrapped application.
pub struct Application {
    injector: Arc<Injector>,
    metadata: Arc<MetadataRegistry>,
    lifecycle: Arc<LifecycleManager>,
    state: Arc<StateMachine>,
    router: Router,
    shutdown_hooks: bool,
    listen_options: ListenOptions,
    shutdown_notify: Arc<Notify>,
}

impl Application {
    /// Start building an application from its root module.
    pub fn builder(root: ModuleDefinition) -> ApplicationBuilder {
        ApplicationBuilder::new(root)
    }

    /// The mounted router, for in-process testing with `oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> AppState {
        self.state.current()
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    /// Resolve a provider from the root module's viewpoint.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.injector.get::<T>()
    }

    /// Bind the listener and serve until `close()` or, when shutdown
    /// hooks are enabled, a trapped OS signal.
    pub async fn listen(&self) -> Result<()> {
        self.state.advance(AppState::Listening)?;

        let addr = format!(
            "{}:{}",
            self.listen_options.hostname, self.listen_options.port
        );
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| CadreError::Internal(format!("failed to bind {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| CadreError::Internal(format!("failed to read local address: {e}")))?;

        tracing::info!("Listening on http://{local_addr}");
        if let Some(on_listen) = &self.listen_options.on_listen {
            on_listen(local_addr);
        }

        let notify = self.shutdown_notify.clone();
        let server = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move { notify.notified().await })
            .into_future();

        if self.shutdown_hooks {
            let capability = signal_capability();
            tracing::debug!(signals = ?capability.interceptable, "shutdown hooks enabled");

            tokio::pin!(server);
            tokio::select! {
                result = &mut server => {
                    result.map_err(|e| CadreError::Internal(format!("server error: {e}")))?;
                }
                signal = shutdown_signal() => {
                    self.begin_close(Some(signal)).await?;
                    // Drain in-flight requests before the final phase.
                    server
                        .await
                        .map_err(|e| CadreError::Internal(format!("server error: {e}")))?;
                    self.finish_close(Some(signal)).await?;
                }
            }
        } else {
            server
                .await
                .map_err(|e| CadreError::Internal(format!("server error: {e}")))?;
        }

        Ok(())
    }

    /// Run the shutdown phases without a triggering signal.
    pub async fn close(&self) -> Result<()> {
        self.close_with(None).await
    }

    /// Run the shutdown phases: `OnModuleDestroy` in reverse order, then
    /// `BeforeApplicationShutdown`, then connection close, then
    /// `OnApplicationShutdown`. The process itself is left running.
    pub async fn close_with(&self, signal: Option<&str>) -> Result<()> {
        self.begin_close(signal).await?;
        self.finish_close(signal).await
    }

    async fn begin_close(&self, signal: Option<&str>) -> Result<()> {
        self.state.advance(AppState::Destroying)?;
        self.lifecycle.call_module_destroy().await;
        self.state.advance(AppState::BeforeShutdown)?;
        self.lifecycle.call_before_shutdown(signal).await;
        // Stops accepting connections; a running `listen` drains and
        // returns.
        self.shutdown_notify.notify_waiters();
        Ok(())
    }

    async fn finish_close(&self, signal: Option<&str>) -> Result<()> {
        self.state.advance(AppState::Shutdown)?;
        self.lifecycle.call_application_shutdown(signal).await;
        self.state.advance(AppState::Terminal)?;
        tracing::info!("Application closed");
        Ok(())
    }
}

/// Register every instantiated provider's hook attachments, in plan
/// order (imports before importer, declaration order within a module).
fn register_hooks(injector: &Injector) -> LifecycleManager {
    let mut lifecycle = LifecycleManager::new();
    for (id, definition) in injector.provider_definitions() {
        if definition.hooks.is_empty() {
            continue;
        }
        // Transient providers have no application-owned instance to hook.
        let Some(instance) = injector.singleton(id) else {
            continue;
        };
        let name = definition.token.label().to_string();
        for hook in &definition.hooks {
            match hook {
                HookAttachment::Init(cast) => match cast(&instance) {
                    Some(service) => lifecycle.register_init(service, &name),
                    None => tracing::warn!(provider = %name, "OnModuleInit cast failed"),
                },
                HookAttachment::Bootstrap(cast) => match cast(&instance) {
                    Some(service) => lifecycle.register_bootstrap(service, &name),
                    None => tracing::warn!(provider = %name, "OnApplicationBootstrap cast failed"),
                },
                HookAttachment::Destroy(cast) => match cast(&instance) {
                    Some(service) => lifecycle.register_destroy(service, &name),
                    None => tracing::warn!(provider = %name, "OnModuleDestroy cast failed"),
                },
                HookAttachment::BeforeShutdown(cast) => match cast(&instance) {
                    Some(service) => lifecycle.register_before_shutdown(service, &name),
                    None => {
                        tracing::warn!(provider = %name, "BeforeApplicationShutdown cast failed")
                    }
                },
                HookAttachment::Shutdown(cast) => match cast(&instance) {
                    Some(service) => lifecycle.register_shutdown(service, &name),
                    None => tracing::warn!(provider = %name, "OnApplicationShutdown cast failed"),
                },
            }
        }
    }
    lifecycle
}

/// Instantiate every controller and mount its routes behind a dispatch
/// pipeline. Routes sharing a path merge into one method router.
fn mount_routes(
    injector: &Injector,
    metadata: &MetadataRegistry,
    global_guards: &[Arc<dyn Guard>],
    global_interceptors: &[Arc<dyn Interceptor>],
    global_filters: &[Arc<dyn ExceptionFilter>],
) -> Result<Router> {
    let mut mounted: Vec<(String, MethodRouter)> = Vec::new();

    for module_index in 0..injector.module_count() {
        for controller in &injector.module(module_index).controllers {
            let instance = injector.instantiate_controller(module_index, controller)?;

            let class_target = MetadataTarget::class(&controller.name);
            metadata.set("path", controller.path_prefix.clone(), class_target.clone());
            metadata.set("guards", controller.guards.clone(), class_target.clone());
            metadata.set(
                "interceptors",
                controller.interceptors.clone(),
                class_target.clone(),
            );
            metadata.set("filters", controller.filters.clone(), class_target.clone());

            for route in &controller.routes {
                let method_target =
                    MetadataTarget::method(&controller.name, &route.handler_name);
                metadata.set("guards", route.guards.clone(), method_target.clone());
                metadata.set(
                    "interceptors",
                    route.interceptors.clone(),
                    method_target.clone(),
                );
                metadata.set("filters", route.filters.clone(), method_target.clone());

                // Global first, then class, then method.
                let mut guards = global_guards.to_vec();
                guards.extend(metadata.get_aggregate::<Arc<dyn Guard>>("guards", &method_target));
                let mut interceptors = global_interceptors.to_vec();
                interceptors.extend(
                    metadata.get_aggregate::<Arc<dyn Interceptor>>("interceptors", &method_target),
                );

                // Filters resolve most-local first.
                let mut filters = metadata
                    .get::<Vec<Arc<dyn ExceptionFilter>>>("filters", &method_target)
                    .unwrap_or_default();
                filters.extend(
                    metadata
                        .get::<Vec<Arc<dyn ExceptionFilter>>>("filters", &class_target)
                        .unwrap_or_default(),
                );
                filters.extend(global_filters.iter().cloned());

                let pipeline = Arc::new(RoutePipeline {
                    controller: instance.clone(),
                    controller_name: controller.name.clone(),
                    handler_name: route.handler_name.clone(),
                    guards,
                    interceptors,
                    filters: FilterChain::new(filters),
                    params: route.params.clone(),
                    handler: route.handler.clone(),
                });

                let mut paths = Vec::new();
                if !route.is_alias_only {
                    paths.push(join_paths(&controller.path_prefix, &route.path));
                }
                if let Some(alias) = &route.alias {
                    let prefix = controller.alias_prefix.as_deref().unwrap_or("");
                    paths.push(join_paths(prefix, alias));
                }

                for path in paths {
                    let pipeline = pipeline.clone();
                    let handler = move |request: Request<Body>| {
                        let pipeline = pipeline.clone();
                        async move { pipeline.dispatch(request).await }
                    };

                    let method_router = match mounted.iter().position(|(p, _)| *p == path) {
                        Some(index) => mounted.remove(index).1,
                        None => MethodRouter::new(),
                    };
                    tracing::debug!(
                        "Mounted {:?} {} -> {}::{}",
                        route.method,
                        path,
                        controller.name,
                        route.handler_name
                    );
                    mounted.push((path, method_router.on(route.method.method_filter(), handler)));
                }
            }
        }
    }

    let mut router = Router::new();
    for (path, method_router) in mounted {
        router = router.route(&path, method_router);
    }
    Ok(router)
}

/// Fallback for unmatched requests, after middleware has run.
async fn not_found(method: Method, uri: Uri) -> Response {
    crate::exception::HttpException::not_found(format!("Cannot {} {}", method, uri.path()))
        .to_response()
}
