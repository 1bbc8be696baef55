//! Lifecycle hook traits.
//!
//! Providers opt into lifecycle participation by implementing these
//! traits and declaring the binding on their provider definition
//! (`ProviderBuilder::on_init`, etc.). Hooks take `&self`; services that
//! mutate state during a hook use interior mutability, since instances
//! are shared across the application.

use super::LifecycleError;
use async_trait::async_trait;

/// Called once the owning module's dependencies are resolved.
///
/// Runs strictly in module import order: a later module's hook never
/// starts before an earlier module's hook has fully resolved.
///
/// Use this hook to:
/// - Initialize database connections
/// - Warm up caches
/// - Establish external service connections
#[async_trait]
pub trait OnModuleInit: Send + Sync {
    async fn on_module_init(&self) -> Result<(), LifecycleError>;
}

/// Called after every module has been initialized, before the
/// application starts accepting requests.
///
/// Use this hook to:
/// - Start background tasks
/// - Register event listeners
/// - Perform warm-up work that depends on other modules being ready
#[async_trait]
pub trait OnApplicationBootstrap: Send + Sync {
    async fn on_application_bootstrap(&self) -> Result<(), LifecycleError>;
}

/// Called first during shutdown, in reverse initialization order.
///
/// Use this hook to release module-owned resources: close connections,
/// flush buffers, cancel the module's own background work.
#[async_trait]
pub trait OnModuleDestroy: Send + Sync {
    async fn on_module_destroy(&self) -> Result<(), LifecycleError>;
}

/// Called after all modules are destroyed and before open connections
/// are closed.
///
/// `signal` names the OS signal that triggered the shutdown, or is
/// `None` when shutdown was requested programmatically via `close()`.
#[async_trait]
pub trait BeforeApplicationShutdown: Send + Sync {
    async fn before_application_shutdown(&self, signal: Option<&str>)
        -> Result<(), LifecycleError>;
}

/// The final hook, called once connections are closed.
///
/// The process is not terminated afterwards; outstanding timers and
/// tasks keep it alive until application code ends them.
#[async_trait]
pub trait OnApplicationShutdown: Send + Sync {
    async fn on_application_shutdown(&self, signal: Option<&str>) -> Result<(), LifecycleError>;
}
