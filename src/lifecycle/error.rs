//! Lifecycle-specific error types

use thiserror::Error;

/// Errors that can occur during lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Service initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Shutdown operation failed
    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),

    /// Hook execution failed
    #[error("Hook execution failed for {provider}: {message}")]
    HookFailed {
        /// Token label of the provider that failed
        provider: String,
        /// Error message
        message: String,
    },

    /// An application state transition that the state machine forbids
    #[error("Illegal lifecycle transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    /// Wrapper for arbitrary failure causes raised inside a hook
    #[error("Lifecycle hook error: {0}")]
    Other(#[from] anyhow::Error),
}

impl LifecycleError {
    /// Create an initialization failure error
    pub fn init_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a shutdown failure error
    pub fn shutdown_failed(msg: impl Into<String>) -> Self {
        Self::ShutdownFailed(msg.into())
    }

    /// Create a hook failure error
    pub fn hook_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HookFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
