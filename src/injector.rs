//! Injector / IoC container.
//!
//! Resolves tokens to instances honoring provider scope. Singletons are
//! created at most once and cached for the application's lifetime;
//! transient providers get one instance per distinct consumer class (the
//! inquirer pattern): a transient injected into a singleton is created
//! once, at the consumer's creation, and reused for the consumer's
//! lifetime, while a transient consumer receives a fresh dependency each
//! time it is itself created.

use crate::controller::ControllerDefinition;
use crate::error::{CadreError, Result};
use crate::module::{ProviderId, ResolvedGraph, ResolvedModule};
use crate::provider::{FactoryArgs, Instance, ProviderDefinition, ProviderKind, Scope};
use crate::token::Token;
use dashmap::DashMap;
use std::sync::Arc;

struct ProviderSlot {
    module: usize,
    definition: ProviderDefinition,
}

/// The class an instance is being resolved for.
#[derive(Clone)]
struct Consumer {
    name: String,
    scope: Scope,
}

/// Scope-aware instance resolver over a resolved module graph.
pub struct Injector {
    providers: Vec<ProviderSlot>,
    modules: Vec<ResolvedModule>,
    root: usize,
    singletons: DashMap<ProviderId, Instance>,
    transients: DashMap<(ProviderId, String), Instance>,
}

impl Injector {
    pub(crate) fn new(graph: ResolvedGraph) -> Self {
        let providers = graph
            .providers
            .into_iter()
            .map(|(module, definition)| ProviderSlot { module, definition })
            .collect();
        Self {
            providers,
            modules: graph.modules,
            root: graph.root,
            singletons: DashMap::new(),
            transients: DashMap::new(),
        }
    }

    pub(crate) fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub(crate) fn module(&self, index: usize) -> &ResolvedModule {
        &self.modules[index]
    }

    /// Eagerly instantiate every singleton provider, in plan order.
    ///
    /// Transient providers are skipped: they only exist per consumer.
    /// Runs before any controller is instantiated so that every failure
    /// surfaces as a bootstrap error.
    pub(crate) fn instantiate_all(&self) -> Result<()> {
        for id in 0..self.providers.len() {
            let slot = &self.providers[id];
            if slot.definition.scope == Scope::Singleton
                && !matches!(slot.definition.kind, ProviderKind::Existing(_))
            {
                self.resolve_id(id, None, &mut Vec::new())?;
            }
        }
        Ok(())
    }

    /// The cached singleton for a provider, if it has been created.
    pub(crate) fn singleton(&self, id: ProviderId) -> Option<Instance> {
        self.singletons.get(&id).map(|entry| entry.value().clone())
    }

    /// Provider definitions in plan order, for hook registration.
    pub(crate) fn provider_definitions(
        &self,
    ) -> impl Iterator<Item = (ProviderId, &ProviderDefinition)> {
        self.providers
            .iter()
            .enumerate()
            .map(|(id, slot)| (id, &slot.definition))
    }

    /// Instantiate a controller in its module's scope.
    pub(crate) fn instantiate_controller(
        &self,
        module: usize,
        controller: &ControllerDefinition,
    ) -> Result<Instance> {
        let consumer = Consumer {
            name: controller.name.clone(),
            scope: Scope::Singleton,
        };
        let args = self.resolve_deps(
            module,
            &controller.inject,
            &controller.name,
            Some(&consumer),
            &mut Vec::new(),
            None,
        )?;
        (controller.factory)(&args)
    }

    /// Resolve a token from the root module's viewpoint and downcast.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.get_by_token(Token::of::<T>())
    }

    /// Resolve an arbitrary token from the root module's viewpoint,
    /// falling back to any module's scope for diagnostics-style access.
    pub fn get_by_token<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Arc<T>> {
        let token = token.into();
        let id = self.modules[self.root]
            .scope
            .get(&token)
            .copied()
            .or_else(|| {
                self.modules
                    .iter()
                    .find_map(|module| module.scope.get(&token).copied())
            })
            .ok_or_else(|| CadreError::UnknownToken {
                token: token.clone(),
                requester: "application".to_string(),
            })?;
        let instance = self.resolve_id(id, None, &mut Vec::new())?;
        instance
            .downcast::<T>()
            .map_err(|_| CadreError::DowncastFailed {
                token,
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    /// Resolve a token for a named consumer class. Exposed for the
    /// inquirer-style tests and tooling; regular dependency resolution
    /// goes through `inject` lists.
    pub fn get_for<T: Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
        consumer_class: &str,
    ) -> Result<Arc<T>> {
        let token = token.into();
        let id = self
            .modules
            .iter()
            .find_map(|module| module.scope.get(&token).copied())
            .ok_or_else(|| CadreError::UnknownToken {
                token: token.clone(),
                requester: consumer_class.to_string(),
            })?;
        let consumer = Consumer {
            name: consumer_class.to_string(),
            scope: Scope::Singleton,
        };
        let instance = self.resolve_id(id, Some(&consumer), &mut Vec::new())?;
        instance
            .downcast::<T>()
            .map_err(|_| CadreError::DowncastFailed {
                token,
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    fn resolve_id(
        &self,
        id: ProviderId,
        consumer: Option<&Consumer>,
        stack: &mut Vec<ProviderId>,
    ) -> Result<Instance> {
        let slot = &self.providers[id];

        if let ProviderKind::Existing(target) = &slot.definition.kind {
            return self.resolve_alias(id, target, consumer, stack);
        }

        match slot.definition.scope {
            Scope::Singleton => {
                if let Some(cached) = self.singletons.get(&id) {
                    return Ok(cached.value().clone());
                }
                let instance = self.instantiate(id, consumer, stack)?;
                // entry() gives check-and-set semantics: a concurrent
                // resolution of the same token keeps the first instance.
                Ok(self.singletons.entry(id).or_insert(instance).value().clone())
            }
            Scope::Transient => {
                // Cache per consumer class only when the consumer itself
                // outlives the resolution (a singleton). A transient
                // consumer gets a fresh instance on every creation, and a
                // consumerless resolution is never cached.
                match consumer {
                    Some(c) if c.scope == Scope::Singleton => {
                        let key = (id, c.name.clone());
                        if let Some(cached) = self.transients.get(&key) {
                            return Ok(cached.value().clone());
                        }
                        let instance = self.instantiate(id, consumer, stack)?;
                        Ok(self.transients.entry(key).or_insert(instance).value().clone())
                    }
                    _ => self.instantiate(id, consumer, stack),
                }
            }
        }
    }

    fn resolve_alias(
        &self,
        id: ProviderId,
        target: &Token,
        consumer: Option<&Consumer>,
        stack: &mut Vec<ProviderId>,
    ) -> Result<Instance> {
        if stack.contains(&id) {
            return Err(self.cycle_error(stack, id));
        }
        let slot = &self.providers[id];
        let target_id = self.modules[slot.module]
            .scope
            .get(target)
            .copied()
            .ok_or_else(|| CadreError::UnknownToken {
                token: target.clone(),
                requester: slot.definition.token.label().to_string(),
            })?;
        stack.push(id);
        let resolved = self.resolve_id(target_id, consumer, stack);
        stack.pop();
        resolved
    }

    fn instantiate(
        &self,
        id: ProviderId,
        consumer: Option<&Consumer>,
        stack: &mut Vec<ProviderId>,
    ) -> Result<Instance> {
        if stack.contains(&id) {
            return Err(self.cycle_error(stack, id));
        }
        let slot = &self.providers[id];

        match &slot.definition.kind {
            ProviderKind::Value(instance) => Ok(instance.clone()),
            ProviderKind::Factory(factory) => {
                stack.push(id);
                let own_consumer = Consumer {
                    name: slot.definition.token.label().to_string(),
                    scope: slot.definition.scope,
                };
                let inquirer = match slot.definition.scope {
                    Scope::Transient => consumer.map(|c| c.name.clone()),
                    Scope::Singleton => None,
                };
                let args = self.resolve_deps(
                    slot.module,
                    &slot.definition.inject,
                    slot.definition.token.label(),
                    Some(&own_consumer),
                    stack,
                    inquirer,
                )?;
                let instance = factory(&args);
                stack.pop();
                instance
            }
            ProviderKind::Existing(_) => unreachable!("aliases are chased in resolve_id"),
        }
    }

    fn resolve_deps(
        &self,
        module: usize,
        inject: &[crate::provider::InjectDep],
        requester: &str,
        consumer: Option<&Consumer>,
        stack: &mut Vec<ProviderId>,
        inquirer: Option<String>,
    ) -> Result<FactoryArgs> {
        let scope = &self.modules[module].scope;
        let mut deps = Vec::with_capacity(inject.len());
        for dep in inject {
            match scope.get(&dep.token).copied() {
                Some(dep_id) => {
                    let instance = self.resolve_id(dep_id, consumer, stack)?;
                    deps.push((dep.token.clone(), Some(instance)));
                }
                None if dep.optional => deps.push((dep.token.clone(), None)),
                None => {
                    return Err(CadreError::UnknownToken {
                        token: dep.token.clone(),
                        requester: requester.to_string(),
                    })
                }
            }
        }
        Ok(FactoryArgs::new(deps, inquirer))
    }

    fn cycle_error(&self, stack: &[ProviderId], id: ProviderId) -> CadreError {
        let mut names: Vec<&str> = stack
            .iter()
            .map(|&i| self.providers[i].definition.token.label())
            .collect();
        names.push(self.providers[id].definition.token.label());
        CadreError::CircularDependency {
            cycle: names.join(" -> "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleBuilder;
    use crate::provider::{InjectDep, ProviderBuilder};

    struct Repo {
        url: String,
    }

    struct Service {
        repo: Arc<Repo>,
    }

    fn app_with(providers: Vec<ProviderDefinition>) -> Injector {
        let mut builder = ModuleBuilder::new("AppModule");
        for provider in providers {
            builder = builder.provider(provider);
        }
        Injector::new(builder.build().resolve().unwrap())
    }

    #[test]
    fn singleton_resolutions_share_one_instance() {
        let injector = app_with(vec![ProviderDefinition::value(Repo {
            url: "postgres://".into(),
        })]);
        injector.instantiate_all().unwrap();

        let first = injector.get::<Repo>().unwrap();
        let second = injector.get::<Repo>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn factories_receive_resolved_dependencies() {
        let injector = app_with(vec![
            ProviderDefinition::value(Repo {
                url: "postgres://".into(),
            }),
            ProviderBuilder::new(Token::of::<Service>())
                .inject([InjectDep::required(Token::of::<Repo>())])
                .use_factory(|args| {
                    Ok(Arc::new(Service {
                        repo: args.dep::<Repo>(0)?,
                    }))
                })
                .build(),
        ]);
        injector.instantiate_all().unwrap();

        let service = injector.get::<Service>().unwrap();
        assert_eq!(service.repo.url, "postgres://");
        // The repo handle is the shared singleton.
        let repo = injector.get::<Repo>().unwrap();
        assert!(Arc::ptr_eq(&service.repo, &repo));
    }

    #[test]
    fn unresolved_mandatory_token_names_token_and_requester() {
        let injector = app_with(vec![ProviderBuilder::new(Token::of::<Service>())
            .inject([InjectDep::required(Token::name("MISSING_REPO"))])
            .use_factory(|args| {
                Ok(Arc::new(Service {
                    repo: args.dep::<Repo>(0)?,
                }))
            })
            .build()]);

        match injector.instantiate_all() {
            Err(CadreError::UnknownToken { token, requester }) => {
                assert_eq!(token, Token::name("MISSING_REPO"));
                assert!(requester.contains("Service"));
            }
            other => panic!("expected UnknownToken, got {other:?}"),
        }
    }

    #[test]
    fn optional_dependency_resolves_to_none() {
        struct Fallback {
            found: bool,
        }

        let injector = app_with(vec![ProviderBuilder::new(Token::of::<Fallback>())
            .inject([InjectDep::optional(Token::name("MISSING"))])
            .use_factory(|args| {
                Ok(Arc::new(Fallback {
                    found: args.opt_dep::<Repo>(0).is_some(),
                }))
            })
            .build()]);
        injector.instantiate_all().unwrap();

        assert!(!injector.get::<Fallback>().unwrap().found);
    }

    #[test]
    fn constructor_cycle_is_reported_with_its_path() {
        // Dependencies are resolved before the factory runs, so the
        // factories themselves are never reached.
        let a = ProviderBuilder::new(Token::name("A"))
            .inject([InjectDep::required(Token::name("B"))])
            .use_factory(|_| Ok(Arc::new(0u32) as Instance))
            .build();
        let b = ProviderBuilder::new(Token::name("B"))
            .inject([InjectDep::required(Token::name("A"))])
            .use_factory(|_| Ok(Arc::new(0u32) as Instance))
            .build();
        let injector = app_with(vec![a, b]);

        match injector.instantiate_all() {
            Err(CadreError::CircularDependency { cycle }) => {
                assert_eq!(cycle, "A -> B -> A");
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn existing_alias_chases_to_target() {
        let injector = app_with(vec![
            ProviderDefinition::value(Repo { url: "db".into() }),
            ProviderBuilder::new(Token::name("REPO_ALIAS"))
                .use_existing(Token::of::<Repo>())
                .build(),
        ]);
        injector.instantiate_all().unwrap();

        let direct = injector.get::<Repo>().unwrap();
        let aliased = injector.get_by_token::<Repo>(Token::name("REPO_ALIAS")).unwrap();
        assert!(Arc::ptr_eq(&direct, &aliased));
    }

    #[test]
    fn transient_instances_differ_per_consumer_class() {
        struct Logger {
            parent: Option<String>,
        }

        let injector = app_with(vec![ProviderBuilder::new(Token::of::<Logger>())
            .transient()
            .use_factory(|args| {
                Ok(Arc::new(Logger {
                    parent: args.inquirer().map(str::to_string),
                }))
            })
            .build()]);

        let for_a = injector.get_for::<Logger>(Token::of::<Logger>(), "A").unwrap();
        let for_b = injector.get_for::<Logger>(Token::of::<Logger>(), "B").unwrap();

        assert!(!Arc::ptr_eq(&for_a, &for_b));
        assert_eq!(for_a.parent.as_deref(), Some("A"));
        assert_eq!(for_b.parent.as_deref(), Some("B"));

        // The same consumer class keeps its instance.
        let again = injector.get_for::<Logger>(Token::of::<Logger>(), "A").unwrap();
        assert!(Arc::ptr_eq(&for_a, &again));
    }
}
