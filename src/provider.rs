//! Provider definitions.
//!
//! A provider is an injectable unit of application logic. Providers are
//! declared explicitly through [`ProviderBuilder`] and attached to a
//! module; the injector instantiates them according to their scope.

use crate::error::{CadreError, Result};
use crate::lifecycle::{
    BeforeApplicationShutdown, OnApplicationBootstrap, OnApplicationShutdown, OnModuleDestroy,
    OnModuleInit,
};
use crate::token::Token;
use std::any::Any;
use std::sync::Arc;

/// A type-erased provider instance held by the container.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Lifetime policy for a provider instance.
///
/// `Singleton` providers are created at most once and shared across the
/// whole application. `Transient` providers get one instance per distinct
/// consumer class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Singleton,
    Transient,
}

/// One declared dependency of a provider.
///
/// Optional dependencies resolve to `None` instead of failing bootstrap
/// when no matching provider is visible.
#[derive(Debug, Clone)]
pub struct InjectDep {
    pub token: Token,
    pub optional: bool,
}

impl InjectDep {
    pub fn required(token: impl Into<Token>) -> Self {
        Self {
            token: token.into(),
            optional: false,
        }
    }

    pub fn optional(token: impl Into<Token>) -> Self {
        Self {
            token: token.into(),
            optional: true,
        }
    }
}

impl From<Token> for InjectDep {
    fn from(token: Token) -> Self {
        InjectDep::required(token)
    }
}

/// Arguments handed to a provider factory: the resolved dependencies in
/// declaration order, plus the inquirer (the class the instance is being
/// created for, when the provider is transient).
pub struct FactoryArgs {
    deps: Vec<(Token, Option<Instance>)>,
    inquirer: Option<String>,
}

impl FactoryArgs {
    pub(crate) fn new(deps: Vec<(Token, Option<Instance>)>, inquirer: Option<String>) -> Self {
        Self { deps, inquirer }
    }

    /// Resolved dependency at `index` in the `inject` list, downcast to
    /// its concrete type.
    pub fn dep<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        let (token, instance) = self.deps.get(index).ok_or_else(|| {
            CadreError::Internal(format!("factory requested dependency index {index} out of range"))
        })?;
        let instance = instance.as_ref().ok_or_else(|| CadreError::UnknownToken {
            token: token.clone(),
            requester: self.inquirer.clone().unwrap_or_else(|| "factory".into()),
        })?;
        instance
            .clone()
            .downcast::<T>()
            .map_err(|_| CadreError::DowncastFailed {
                token: token.clone(),
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    /// Optional dependency at `index`; `None` if it was unresolvable.
    pub fn opt_dep<T: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.deps
            .get(index)
            .and_then(|(_, instance)| instance.clone())
            .and_then(|instance| instance.downcast::<T>().ok())
    }

    /// Name of the class this instance is being created for.
    ///
    /// Populated for transient providers (the `INQUIRER` pattern); `None`
    /// when resolving a singleton or resolving without a consumer.
    pub fn inquirer(&self) -> Option<&str> {
        self.inquirer.as_deref()
    }
}

pub type ProviderFactory = Arc<dyn Fn(&FactoryArgs) -> Result<Instance> + Send + Sync>;

/// How a provider produces its instance.
pub enum ProviderKind {
    /// A pre-built shared value.
    Value(Instance),
    /// A factory invoked with resolved dependencies. Class providers are
    /// expressed as factories with an explicit `inject` list.
    Factory(ProviderFactory),
    /// An alias for another token's definition.
    Existing(Token),
}

type HookCaster<H> = Arc<dyn Fn(&Instance) -> Option<Arc<H>> + Send + Sync>;

/// A lifecycle-hook binding declared on a provider.
///
/// Each attachment carries a caster that narrows the erased instance to
/// the relevant hook trait object once the provider has been
/// instantiated.
#[derive(Clone)]
pub enum HookAttachment {
    Init(HookCaster<dyn OnModuleInit>),
    Bootstrap(HookCaster<dyn OnApplicationBootstrap>),
    Destroy(HookCaster<dyn OnModuleDestroy>),
    BeforeShutdown(HookCaster<dyn BeforeApplicationShutdown>),
    Shutdown(HookCaster<dyn OnApplicationShutdown>),
}

impl Clone for ProviderKind {
    fn clone(&self) -> Self {
        match self {
            ProviderKind::Value(instance) => ProviderKind::Value(instance.clone()),
            ProviderKind::Factory(factory) => ProviderKind::Factory(factory.clone()),
            ProviderKind::Existing(token) => ProviderKind::Existing(token.clone()),
        }
    }
}

/// An immutable provider definition, registered with a module.
#[derive(Clone)]
pub struct ProviderDefinition {
    pub token: Token,
    pub scope: Scope,
    pub kind: ProviderKind,
    pub inject: Vec<InjectDep>,
    pub(crate) hooks: Vec<HookAttachment>,
}

impl ProviderDefinition {
    /// Shorthand for a singleton value provider keyed by its own type.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        ProviderBuilder::new(Token::of::<T>()).use_value(value).build()
    }
}

/// Fluent builder for [`ProviderDefinition`].
///
/// # Example
/// ```
/// use cadre::provider::{ProviderBuilder, InjectDep};
/// use cadre::token::Token;
/// use std::sync::Arc;
///
/// struct Repo;
/// struct Service { repo: Arc<Repo> }
///
/// let provider = ProviderBuilder::new(Token::of::<Service>())
///     .inject([InjectDep::required(Token::of::<Repo>())])
///     .use_factory(|args| {
///         Ok(Arc::new(Service { repo: args.dep::<Repo>(0)? }))
///     })
///     .build();
/// ```
pub struct ProviderBuilder {
    token: Token,
    scope: Scope,
    value: Option<Instance>,
    factory: Option<ProviderFactory>,
    existing: Option<Token>,
    inject: Vec<InjectDep>,
    hooks: Vec<HookAttachment>,
}

impl ProviderBuilder {
    pub fn new(token: impl Into<Token>) -> Self {
        Self {
            token: token.into(),
            scope: Scope::Singleton,
            value: None,
            factory: None,
            existing: None,
            inject: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Provide a pre-built value.
    pub fn use_value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.value = Some(Arc::new(value));
        self
    }

    /// Provide through a factory. The factory receives dependencies
    /// resolved per the `inject` list.
    pub fn use_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&FactoryArgs) -> Result<Instance> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Alias this token to an existing provider.
    pub fn use_existing(mut self, target: impl Into<Token>) -> Self {
        self.existing = Some(target.into());
        self
    }

    /// Declare the factory's dependencies, in argument order.
    pub fn inject<I, D>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<InjectDep>,
    {
        self.inject = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Switch the provider to transient scope.
    pub fn transient(mut self) -> Self {
        self.scope = Scope::Transient;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Register the instance for `OnModuleInit`. `T` must be the concrete
    /// type the provider produces.
    pub fn on_init<T: OnModuleInit + Send + Sync + 'static>(mut self) -> Self {
        self.hooks.push(HookAttachment::Init(Arc::new(|instance| {
            instance.clone().downcast::<T>().ok().map(|a| a as Arc<dyn OnModuleInit>)
        })));
        self
    }

    /// Register the instance for `OnApplicationBootstrap`.
    pub fn on_bootstrap<T: OnApplicationBootstrap + Send + Sync + 'static>(mut self) -> Self {
        self.hooks.push(HookAttachment::Bootstrap(Arc::new(|instance| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn OnApplicationBootstrap>)
        })));
        self
    }

    /// Register the instance for `OnModuleDestroy`.
    pub fn on_destroy<T: OnModuleDestroy + Send + Sync + 'static>(mut self) -> Self {
        self.hooks.push(HookAttachment::Destroy(Arc::new(|instance| {
            instance.clone().downcast::<T>().ok().map(|a| a as Arc<dyn OnModuleDestroy>)
        })));
        self
    }

    /// Register the instance for `BeforeApplicationShutdown`.
    pub fn before_shutdown<T: BeforeApplicationShutdown + Send + Sync + 'static>(mut self) -> Self {
        self.hooks.push(HookAttachment::BeforeShutdown(Arc::new(|instance| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn BeforeApplicationShutdown>)
        })));
        self
    }

    /// Register the instance for `OnApplicationShutdown`.
    pub fn on_shutdown<T: OnApplicationShutdown + Send + Sync + 'static>(mut self) -> Self {
        self.hooks.push(HookAttachment::Shutdown(Arc::new(|instance| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn OnApplicationShutdown>)
        })));
        self
    }

    /// Finalize the definition.
    ///
    /// If several strategies were set on the same builder (malformed
    /// input), the explicit precedence `value > factory > existing`
    /// decides which one wins.
    pub fn build(self) -> ProviderDefinition {
        let kind = if let Some(value) = self.value {
            ProviderKind::Value(value)
        } else if let Some(factory) = self.factory {
            ProviderKind::Factory(factory)
        } else if let Some(target) = self.existing {
            ProviderKind::Existing(target)
        } else {
            // A bare builder still yields a definition; resolving it
            // reports an internal error naming the token.
            let token = self.token.clone();
            ProviderKind::Factory(Arc::new(move |_| {
                Err(CadreError::Internal(format!(
                    "provider '{token}' declares no value, factory, or alias"
                )))
            }))
        };

        ProviderDefinition {
            token: self.token,
            scope: self.scope,
            kind,
            inject: self.inject,
            hooks: self.hooks,
        }
    }
}
