//! Lifecycle Manager
//!
//! Owns the ordered hook registries and executes each lifecycle phase.
//! Registration order is module import order; the application registers
//! hooks module by module as providers are instantiated.

use super::{
    BeforeApplicationShutdown, LifecycleError, OnApplicationBootstrap, OnApplicationShutdown,
    OnModuleDestroy, OnModuleInit, Result,
};
use std::sync::Arc;

struct LifecycleHook<T: ?Sized> {
    service: Arc<T>,
    name: String,
}

impl<T: ?Sized> LifecycleHook<T> {
    fn new(service: Arc<T>, name: impl Into<String>) -> Self {
        Self {
            service,
            name: name.into(),
        }
    }
}

/// Executes lifecycle hooks in the correct order.
///
/// Startup phases (`on_module_init`, `on_application_bootstrap`) run
/// strictly sequentially in registration order and abort on the first
/// failure: a partially initialized application must never begin
/// listening. Shutdown phases are best-effort: a failed hook is logged
/// and the remaining hooks still run.
pub struct LifecycleManager {
    init_hooks: Vec<LifecycleHook<dyn OnModuleInit>>,
    bootstrap_hooks: Vec<LifecycleHook<dyn OnApplicationBootstrap>>,
    destroy_hooks: Vec<LifecycleHook<dyn OnModuleDestroy>>,
    before_shutdown_hooks: Vec<LifecycleHook<dyn BeforeApplicationShutdown>>,
    shutdown_hooks: Vec<LifecycleHook<dyn OnApplicationShutdown>>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            init_hooks: Vec::new(),
            bootstrap_hooks: Vec::new(),
            destroy_hooks: Vec::new(),
            before_shutdown_hooks: Vec::new(),
            shutdown_hooks: Vec::new(),
        }
    }

    pub fn register_init(&mut self, service: Arc<dyn OnModuleInit>, name: impl Into<String>) {
        self.init_hooks.push(LifecycleHook::new(service, name));
    }

    pub fn register_bootstrap(
        &mut self,
        service: Arc<dyn OnApplicationBootstrap>,
        name: impl Into<String>,
    ) {
        self.bootstrap_hooks.push(LifecycleHook::new(service, name));
    }

    pub fn register_destroy(&mut self, service: Arc<dyn OnModuleDestroy>, name: impl Into<String>) {
        self.destroy_hooks.push(LifecycleHook::new(service, name));
    }

    pub fn register_before_shutdown(
        &mut self,
        service: Arc<dyn BeforeApplicationShutdown>,
        name: impl Into<String>,
    ) {
        self.before_shutdown_hooks.push(LifecycleHook::new(service, name));
    }

    pub fn register_shutdown(
        &mut self,
        service: Arc<dyn OnApplicationShutdown>,
        name: impl Into<String>,
    ) {
        self.shutdown_hooks.push(LifecycleHook::new(service, name));
    }

    /// Execute all `OnModuleInit` hooks, each awaited to completion
    /// before the next begins.
    pub async fn call_module_init(&self) -> Result<()> {
        tracing::info!("Calling OnModuleInit hooks...");

        for hook in &self.init_hooks {
            tracing::debug!("Initializing: {}", hook.name);
            hook.service.on_module_init().await.map_err(|e| {
                tracing::error!("OnModuleInit failed for {}: {}", hook.name, e);
                LifecycleError::hook_failed(&hook.name, e.to_string())
            })?;
            tracing::debug!("Initialized: {}", hook.name);
        }

        tracing::info!(
            "OnModuleInit complete ({} hooks executed)",
            self.init_hooks.len()
        );
        Ok(())
    }

    /// Execute all `OnApplicationBootstrap` hooks in registration order.
    pub async fn call_application_bootstrap(&self) -> Result<()> {
        tracing::info!("Calling OnApplicationBootstrap hooks...");

        for hook in &self.bootstrap_hooks {
            tracing::debug!("Bootstrapping: {}", hook.name);
            hook.service.on_application_bootstrap().await.map_err(|e| {
                tracing::error!("OnApplicationBootstrap failed for {}: {}", hook.name, e);
                LifecycleError::hook_failed(&hook.name, e.to_string())
            })?;
            tracing::debug!("Bootstrapped: {}", hook.name);
        }

        tracing::info!(
            "OnApplicationBootstrap complete ({} hooks executed)",
            self.bootstrap_hooks.len()
        );
        Ok(())
    }

    /// Execute all `OnModuleDestroy` hooks, in **reverse** registration
    /// order so dependents are destroyed before their dependencies.
    ///
    /// Failures are logged and do not stop the remaining hooks.
    pub async fn call_module_destroy(&self) {
        tracing::info!("Calling OnModuleDestroy hooks...");

        for hook in self.destroy_hooks.iter().rev() {
            tracing::debug!("Destroying: {}", hook.name);
            if let Err(e) = hook.service.on_module_destroy().await {
                tracing::error!("OnModuleDestroy failed for {}: {}", hook.name, e);
            }
            tracing::debug!("Destroyed: {}", hook.name);
        }

        tracing::info!(
            "OnModuleDestroy complete ({} hooks executed)",
            self.destroy_hooks.len()
        );
    }

    /// Execute all `BeforeApplicationShutdown` hooks. Failures are logged
    /// and do not stop the remaining hooks.
    pub async fn call_before_shutdown(&self, signal: Option<&str>) {
        tracing::info!("Calling BeforeApplicationShutdown hooks...");

        for hook in &self.before_shutdown_hooks {
            if let Err(e) = hook.service.before_application_shutdown(signal).await {
                tracing::error!("BeforeApplicationShutdown failed for {}: {}", hook.name, e);
            }
        }

        tracing::info!(
            "BeforeApplicationShutdown complete ({} hooks executed)",
            self.before_shutdown_hooks.len()
        );
    }

    /// Execute all `OnApplicationShutdown` hooks. Failures are logged and
    /// do not stop the remaining hooks.
    pub async fn call_application_shutdown(&self, signal: Option<&str>) {
        tracing::info!("Calling OnApplicationShutdown hooks...");

        for hook in &self.shutdown_hooks {
            if let Err(e) = hook.service.on_application_shutdown(signal).await {
                tracing::error!("OnApplicationShutdown failed for {}: {}", hook.name, e);
            }
        }

        tracing::info!(
            "OnApplicationShutdown complete ({} hooks executed)",
            self.shutdown_hooks.len()
        );
    }

    pub fn init_hook_count(&self) -> usize {
        self.init_hooks.len()
    }

    pub fn bootstrap_hook_count(&self) -> usize {
        self.bootstrap_hooks.len()
    }

    pub fn destroy_hook_count(&self) -> usize {
        self.destroy_hooks.len()
    }

    pub fn shutdown_hook_count(&self) -> usize {
        self.shutdown_hooks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        id: usize,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn record(&self, phase: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", phase, self.id));
        }
    }

    #[async_trait]
    impl OnModuleInit for Recorder {
        async fn on_module_init(&self) -> Result<()> {
            // Yield so a wrongly-parallel implementation would interleave.
            tokio::task::yield_now().await;
            self.record("init");
            Ok(())
        }
    }

    #[async_trait]
    impl OnModuleDestroy for Recorder {
        async fn on_module_destroy(&self) -> Result<()> {
            self.record("destroy");
            Ok(())
        }
    }

    #[async_trait]
    impl OnApplicationShutdown for Recorder {
        async fn on_application_shutdown(&self, _signal: Option<&str>) -> Result<()> {
            self.record("shutdown");
            Err(LifecycleError::shutdown_failed("boom"))
        }
    }

    #[tokio::test]
    async fn init_hooks_run_sequentially_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = LifecycleManager::new();
        for id in 1..=3 {
            let recorder = Arc::new(Recorder {
                id,
                log: Arc::clone(&log),
            });
            manager.register_init(recorder, format!("Recorder{id}"));
        }

        manager.call_module_init().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["init:1", "init:2", "init:3"]);
    }

    #[tokio::test]
    async fn destroy_hooks_run_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = LifecycleManager::new();
        for id in 1..=3 {
            let recorder = Arc::new(Recorder {
                id,
                log: Arc::clone(&log),
            });
            manager.register_destroy(recorder, format!("Recorder{id}"));
        }

        manager.call_module_destroy().await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["destroy:3", "destroy:2", "destroy:1"]
        );
    }

    #[tokio::test]
    async fn failing_shutdown_hook_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = LifecycleManager::new();
        for id in 1..=2 {
            let recorder = Arc::new(Recorder {
                id,
                log: Arc::clone(&log),
            });
            manager.register_shutdown(recorder, format!("Recorder{id}"));
        }

        // Every hook errors; both must still have run.
        manager.call_application_shutdown(Some("SIGTERM")).await;
        assert_eq!(*log.lock().unwrap(), vec!["shutdown:1", "shutdown:2"]);
    }

    #[tokio::test]
    async fn failing_init_hook_aborts_startup() {
        struct Failing;

        #[async_trait]
        impl OnModuleInit for Failing {
            async fn on_module_init(&self) -> Result<()> {
                Err(LifecycleError::init_failed("no database"))
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = LifecycleManager::new();
        manager.register_init(Arc::new(Failing), "Failing");
        manager.register_init(
            Arc::new(Recorder {
                id: 2,
                log: Arc::clone(&log),
            }),
            "Recorder2",
        );

        assert!(manager.call_module_init().await.is_err());
        assert!(log.lock().unwrap().is_empty());
    }
}
