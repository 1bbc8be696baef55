use crate::token::Token;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CadreError>;

/// Errors raised while composing and bootstrapping an application.
///
/// Every variant except `Internal` is bootstrap-fatal: the application
/// must not begin listening if any of them occurs.
#[derive(Debug, Error)]
pub enum CadreError {
    #[error("No provider found for token '{token}' (requested by {requester})")]
    UnknownToken { token: Token, requester: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Circular module import detected: {cycle}")]
    CircularImport { cycle: String },

    #[error("Token '{token}' resolves ambiguously in module '{module}'")]
    AmbiguousToken { token: Token, module: String },

    #[error("Global modules export duplicate token '{token}'")]
    DuplicateGlobalExport { token: Token },

    #[error("Failed to downcast instance for token '{token}' to {type_name}")]
    DowncastFailed { token: Token, type_name: String },

    #[error("Module registration failed: {message}")]
    ModuleRegistrationFailed { message: String },

    #[error(transparent)]
    Lifecycle(#[from] crate::lifecycle::LifecycleError),

    #[error("Internal error: {0}")]
    Internal(String),
}
