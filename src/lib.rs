//! # Cadre
//!
//! A modular dependency-injection and request-pipeline runtime for axum.
//!
//! Cadre brings NestJS-style application structure to Rust without proc
//! macros: modules, providers, and controllers are declared through
//! explicit builders, resolved into a scoped injector at bootstrap, and
//! served through a fixed per-request pipeline of middleware, guards,
//! interceptors, handlers, and exception filters, with lifecycle hooks
//! around startup and shutdown.
//!
//! ## Features
//!
//! - **Dependency Injection**: token-based container with module-scoped
//!   visibility, singleton and transient scopes, and cycle detection
//! - **Module Graph**: imports, exports, global and dynamic modules,
//!   resolved once into a flattened instantiation plan
//! - **Request Pipeline**: middleware, guards, interceptors, parameter
//!   bindings, and exception filters in a fixed stage order
//! - **Lifecycle Hooks**: `OnModuleInit` through `OnApplicationShutdown`,
//!   with a state machine enforcing legal phase transitions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cadre::prelude::*;
//!
//! struct CatsService;
//!
//! impl CatsService {
//!     async fn find_all(&self) -> Vec<String> {
//!         vec!["Tom".to_string()]
//!     }
//! }
//!
//! struct CatsController {
//!     cats: Arc<CatsService>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> cadre::Result<()> {
//!     let cats_module = ModuleBuilder::new("CatsModule")
//!         .provider(ProviderDefinition::value(CatsService))
//!         .controller(
//!             ControllerBuilder::new::<CatsController>("/cats")
//!                 .inject([Token::of::<CatsService>()])
//!                 .factory(|args| {
//!                     Ok(Arc::new(CatsController {
//!                         cats: args.dep::<CatsService>(0)?,
//!                     }))
//!                 })
//!                 .route(
//!                     RouteBuilder::get("")
//!                         .handler::<CatsController, _, _>(
//!                             "find_all",
//!                             |ctrl, _ctx, _params| async move {
//!                                 Ok(Json(ctrl.cats.find_all().await).into_response())
//!                             },
//!                         )
//!                         .build(),
//!                 )
//!                 .build(),
//!         )
//!         .build();
//!
//!     let app = ApplicationBuilder::new(cats_module).build().await?;
//!     app.listen().await
//! }
//! ```

pub mod application;
pub mod config;
pub mod controller;
pub mod error;
pub mod exception;
pub mod injector;
pub mod lifecycle;
pub mod metadata;
pub mod module;
pub mod pipeline;
pub mod provider;
pub mod token;

// Re-export core types
pub use application::{Application, ApplicationBuilder, ListenOptions};
pub use error::{CadreError, Result};
pub use injector::Injector;
pub use module::{ModuleBuilder, ModuleDefinition};
pub use token::Token;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use cadre::prelude::*;
/// ```
pub mod prelude {
    pub use crate::application::{Application, ApplicationBuilder, ListenOptions};
    pub use crate::config::{config_module, ConfigModuleOptions, ConfigService};
    pub use crate::controller::{ControllerBuilder, HttpMethod, RouteBuilder};
    pub use crate::error::{CadreError, Result};
    pub use crate::exception::{ExceptionKind, HttpException};
    pub use crate::lifecycle::{
        shutdown_signal, AppState, BeforeApplicationShutdown, LifecycleError,
        OnApplicationBootstrap, OnApplicationShutdown, OnModuleDestroy, OnModuleInit,
    };
    pub use crate::metadata::{MetadataRegistry, MetadataTarget};
    pub use crate::module::{ModuleBuilder, ModuleDefinition};
    pub use crate::pipeline::{
        CatchScope, ExceptionFilter, Guard, Interceptor, LoggingInterceptor, Middleware,
        MiddlewareNext, Next, ParamBinding, ParamValue, PipelineResult, RequestContext,
        RequestSnapshot, StateSeed,
    };
    pub use crate::provider::{
        FactoryArgs, InjectDep, Instance, ProviderBuilder, ProviderDefinition, Scope,
    };
    pub use crate::token::Token;
    pub use async_trait::async_trait;
    pub use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json, Router,
    };
    pub use std::sync::Arc;
}
