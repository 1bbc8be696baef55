//! Lifecycle Coordinator
//!
//! Drives application-wide state transitions and lifecycle hooks.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Module Graph Resolution
//!    ↓
//! 2. Provider Instantiation
//!    ↓
//! 3. OnModuleInit (per module, import order)       ← Lifecycle Hook
//!    ↓
//! 4. OnApplicationBootstrap                        ← Lifecycle Hook
//!    ↓
//! 5. Listening
//!    ↓
//! [Running...]
//!    ↓
//! 6. close() or trapped signal (opt-in)
//!    ↓
//! 7. OnModuleDestroy (reverse order)               ← Lifecycle Hook
//!    ↓
//! 8. BeforeApplicationShutdown                     ← Lifecycle Hook
//!    ↓
//! 9. connections closed
//!    ↓
//! 10. OnApplicationShutdown                        ← Lifecycle Hook
//! ```
//!
//! Closing the application never terminates the host process: timers and
//! background tasks started by application code keep running.

mod error;
mod manager;
mod shutdown;
mod state;
mod traits;

pub use error::{LifecycleError, Result};
pub use manager::LifecycleManager;
pub use shutdown::{shutdown_signal, signal_capability, SignalCapability};
pub use state::{AppState, StateMachine};
pub use traits::{
    BeforeApplicationShutdown, OnApplicationBootstrap, OnApplicationShutdown, OnModuleDestroy,
    OnModuleInit,
};
