//! Module definitions and graph resolution.
//!
//! Modules group providers and controllers and control token visibility:
//! a module sees its own providers, the exports of the modules it
//! imports, and the exports of every global module. The graph is
//! resolved once at bootstrap into a flattened, dependency-ordered
//! instantiation plan; any structural problem (import cycle, ambiguous
//! token, bad export) is a bootstrap-fatal error.

use crate::controller::ControllerDefinition;
use crate::error::{CadreError, Result};
use crate::provider::ProviderDefinition;
use crate::token::Token;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A declared module: imports, providers, controllers, exports.
///
/// Built through [`ModuleBuilder`]. Dynamic modules are plain functions
/// returning a configured `ModuleDefinition` (the `register(options)`
/// pattern); each call yields an independent module identity, so two
/// differently-configured registrations never collide unless the module
/// is marked global.
#[derive(Clone)]
pub struct ModuleDefinition {
    /// Stable identity. Clones share it, so importing the same
    /// definition from two places instantiates it once.
    pub(crate) id: Uuid,
    pub name: String,
    pub imports: Vec<ModuleDefinition>,
    pub providers: Vec<ProviderDefinition>,
    pub controllers: Vec<ControllerDefinition>,
    pub exports: Vec<Token>,
    pub is_global: bool,
}

/// Builder for [`ModuleDefinition`].
///
/// # Example
/// ```
/// use cadre::module::ModuleBuilder;
/// use cadre::provider::ProviderDefinition;
/// use cadre::token::Token;
///
/// struct CatsService;
///
/// let module = ModuleBuilder::new("CatsModule")
///     .provider(ProviderDefinition::value(CatsService))
///     .export(Token::of::<CatsService>())
///     .build();
/// assert_eq!(module.name, "CatsModule");
/// ```
pub struct ModuleBuilder {
    definition: ModuleDefinition,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            definition: ModuleDefinition {
                id: Uuid::new_v4(),
                name: name.into(),
                imports: Vec::new(),
                providers: Vec::new(),
                controllers: Vec::new(),
                exports: Vec::new(),
                is_global: false,
            },
        }
    }

    pub fn import(mut self, module: ModuleDefinition) -> Self {
        self.definition.imports.push(module);
        self
    }

    pub fn provider(mut self, provider: ProviderDefinition) -> Self {
        self.definition.providers.push(provider);
        self
    }

    pub fn controller(mut self, controller: ControllerDefinition) -> Self {
        self.definition.controllers.push(controller);
        self
    }

    /// Make a token visible to importing modules.
    pub fn export(mut self, token: impl Into<Token>) -> Self {
        self.definition.exports.push(token.into());
        self
    }

    /// Merge this module's exports into every module's visible set,
    /// without requiring an explicit import.
    pub fn global(mut self, is_global: bool) -> Self {
        self.definition.is_global = is_global;
        self
    }

    pub fn build(self) -> ModuleDefinition {
        self.definition
    }
}

/// Numeric handle into the resolved graph's provider table.
pub(crate) type ProviderId = usize;

pub(crate) struct ResolvedModule {
    pub name: String,
    /// Providers declared by this module, in declaration order.
    pub providers: Vec<ProviderId>,
    pub controllers: Vec<ControllerDefinition>,
    /// Every token visible from this module.
    pub scope: HashMap<Token, ProviderId>,
}

/// The flattened instantiation plan: modules in bottom-up topological
/// order (imports before importer, import declaration order preserved),
/// providers in module order then declaration order.
pub(crate) struct ResolvedGraph {
    pub providers: Vec<(usize, ProviderDefinition)>,
    pub modules: Vec<ResolvedModule>,
    /// Index of the root module (always the last one resolved).
    pub root: usize,
}

impl fmt::Debug for ResolvedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedGraph")
            .field("providers", &self.providers.len())
            .field("modules", &self.modules.len())
            .field("root", &self.root)
            .finish()
    }
}

impl ModuleDefinition {
    /// Resolve the full graph rooted at `self`.
    pub(crate) fn resolve(self) -> Result<ResolvedGraph> {
        let mut resolver = GraphResolver::default();
        resolver.visit(&self, &mut Vec::new())?;
        resolver.apply_globals()?;
        let root = resolver.modules.len() - 1;
        Ok(ResolvedGraph {
            providers: resolver.providers,
            modules: resolver.modules,
            root,
        })
    }
}

#[derive(Default)]
struct GraphResolver {
    providers: Vec<(usize, ProviderDefinition)>,
    modules: Vec<ResolvedModule>,
    visited: HashMap<Uuid, usize>,
    /// (token, provider, exporting module name) per global module.
    global_exports: Vec<(Token, ProviderId, String)>,
}

impl GraphResolver {
    /// Post-order DFS. `path` carries the in-flight import chain; a
    /// module **id** repeating on the chain is a cycle. Names can
    /// legitimately repeat (every dynamic-module registration reuses its
    /// name), so they are carried only for the error message.
    fn visit(
        &mut self,
        module: &ModuleDefinition,
        path: &mut Vec<(Uuid, String)>,
    ) -> Result<usize> {
        if let Some(&index) = self.visited.get(&module.id) {
            return Ok(index);
        }
        if path.iter().any(|(id, _)| *id == module.id) {
            let mut cycle: Vec<&str> = path.iter().map(|(_, name)| name.as_str()).collect();
            cycle.push(&module.name);
            return Err(CadreError::CircularImport {
                cycle: cycle.join(" -> "),
            });
        }

        path.push((module.id, module.name.clone()));
        let mut imported = Vec::with_capacity(module.imports.len());
        for import in &module.imports {
            imported.push(self.visit(import, path)?);
        }
        path.pop();

        let module_index = self.modules.len();
        let mut scope: HashMap<Token, ProviderId> = HashMap::new();

        // Imported exports first, own providers second, so a module's own
        // declaration conflicting with an import is caught as ambiguous.
        for &import_index in &imported {
            let exports: Vec<(Token, ProviderId)> = {
                let import = &self.modules[import_index];
                module
                    .imports
                    .iter()
                    .find(|m| self.visited.get(&m.id) == Some(&import_index))
                    .map(|m| {
                        m.exports
                            .iter()
                            .filter_map(|token| {
                                import.scope.get(token).map(|&id| (token.clone(), id))
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            };
            for (token, id) in exports {
                Self::insert_visible(&mut scope, token, id, &module.name)?;
            }
        }

        let mut own_providers = Vec::with_capacity(module.providers.len());
        for provider in &module.providers {
            let id = self.providers.len();
            self.providers.push((module_index, provider.clone()));
            own_providers.push(id);
            Self::insert_visible(&mut scope, provider.token.clone(), id, &module.name)?;
        }

        // Every export must name something this module can see.
        for export in &module.exports {
            if !scope.contains_key(export) {
                return Err(CadreError::ModuleRegistrationFailed {
                    message: format!(
                        "module '{}' exports token '{}' which it neither provides nor imports",
                        module.name, export
                    ),
                });
            }
        }

        if module.is_global {
            for export in &module.exports {
                if let Some(&id) = scope.get(export) {
                    self.global_exports
                        .push((export.clone(), id, module.name.clone()));
                }
            }
        }

        self.modules.push(ResolvedModule {
            name: module.name.clone(),
            providers: own_providers,
            controllers: module.controllers.clone(),
            scope,
        });
        self.visited.insert(module.id, module_index);
        Ok(module_index)
    }

    /// Merge global exports into every module's scope. Two global
    /// modules exporting the same non-symbol token is a configuration
    /// error; symbol tokens cannot collide.
    fn apply_globals(&mut self) -> Result<()> {
        let mut seen: HashMap<Token, ProviderId> = HashMap::new();
        for (token, id, _module) in &self.global_exports {
            if let Some(&existing) = seen.get(token) {
                if existing != *id && !token.is_collision_free() {
                    return Err(CadreError::DuplicateGlobalExport {
                        token: token.clone(),
                    });
                }
            }
            seen.insert(token.clone(), *id);
        }

        for module in &mut self.modules {
            for (token, id) in &seen {
                // Explicit local definitions and imports win over globals.
                module.scope.entry(token.clone()).or_insert(*id);
            }
        }
        Ok(())
    }

    fn insert_visible(
        scope: &mut HashMap<Token, ProviderId>,
        token: Token,
        id: ProviderId,
        module_name: &str,
    ) -> Result<()> {
        match scope.get(&token) {
            Some(&existing) if existing != id => Err(CadreError::AmbiguousToken {
                token,
                module: module_name.to_string(),
            }),
            _ => {
                scope.insert(token, id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderBuilder;

    struct ServiceA;
    struct ServiceB;

    fn leaf(name: &str) -> ModuleDefinition {
        ModuleBuilder::new(name)
            .provider(ProviderDefinition::value(ServiceA))
            .export(Token::of::<ServiceA>())
            .build()
    }

    #[test]
    fn imports_resolve_before_importer() {
        let root = ModuleBuilder::new("AppModule")
            .import(leaf("CatsModule"))
            .provider(ProviderDefinition::value(ServiceB))
            .build();

        let graph = root.resolve().unwrap();
        assert_eq!(graph.modules.len(), 2);
        assert_eq!(graph.modules[0].name, "CatsModule");
        assert_eq!(graph.modules[graph.root].name, "AppModule");
        // Importer sees the import's export.
        assert!(graph.modules[graph.root]
            .scope
            .contains_key(&Token::of::<ServiceA>()));
    }

    #[test]
    fn shared_definition_is_instantiated_once() {
        let shared = leaf("SharedModule");
        let left = ModuleBuilder::new("Left").import(shared.clone()).build();
        let right = ModuleBuilder::new("Right").import(shared).build();
        let root = ModuleBuilder::new("AppModule")
            .import(left)
            .import(right)
            .build();

        let graph = root.resolve().unwrap();
        assert_eq!(
            graph
                .modules
                .iter()
                .filter(|m| m.name == "SharedModule")
                .count(),
            1
        );
    }

    #[test]
    fn circular_import_reports_the_cycle_path() {
        // Module identity repeats along one import chain: the outer
        // module is a clone of the inner one with an import spliced in.
        let inner = ModuleBuilder::new("AlphaModule").build();
        let middle = ModuleBuilder::new("BetaModule").import(inner.clone()).build();
        let mut outer = inner;
        outer.imports.push(middle);

        let err = outer.resolve().unwrap_err();
        match err {
            CadreError::CircularImport { cycle } => {
                assert_eq!(cycle, "AlphaModule -> BetaModule -> AlphaModule");
            }
            other => panic!("expected CircularImport, got {other}"),
        }
    }

    #[test]
    fn same_named_modules_on_one_chain_are_not_a_cycle() {
        // Two independent registrations of a dynamic module share a name
        // but not an identity; nesting them must resolve.
        let inner_db = ModuleBuilder::new("DatabaseModule").build();
        let feature = ModuleBuilder::new("FeatureModule").import(inner_db).build();
        let outer_db = ModuleBuilder::new("DatabaseModule").import(feature).build();
        let root = ModuleBuilder::new("AppModule").import(outer_db).build();

        let graph = root.resolve().unwrap();
        assert_eq!(
            graph
                .modules
                .iter()
                .filter(|m| m.name == "DatabaseModule")
                .count(),
            2
        );
    }

    #[test]
    fn unexported_providers_stay_module_local() {
        let hidden = ModuleBuilder::new("HiddenModule")
            .provider(ProviderDefinition::value(ServiceA))
            .build();
        let root = ModuleBuilder::new("AppModule").import(hidden).build();

        let graph = root.resolve().unwrap();
        assert!(!graph.modules[graph.root]
            .scope
            .contains_key(&Token::of::<ServiceA>()));
    }

    #[test]
    fn exporting_an_unknown_token_fails() {
        let module = ModuleBuilder::new("BrokenModule")
            .export(Token::name("MISSING"))
            .build();
        assert!(matches!(
            module.resolve(),
            Err(CadreError::ModuleRegistrationFailed { .. })
        ));
    }

    #[test]
    fn global_exports_reach_every_module() {
        let global = ModuleBuilder::new("GlobalConfig")
            .provider(ProviderBuilder::new(Token::name("CONFIG")).use_value(42u32).build())
            .export(Token::name("CONFIG"))
            .global(true)
            .build();
        let feature = ModuleBuilder::new("FeatureModule").build();
        let root = ModuleBuilder::new("AppModule")
            .import(global)
            .import(feature)
            .build();

        let graph = root.resolve().unwrap();
        let feature = graph.modules.iter().find(|m| m.name == "FeatureModule").unwrap();
        assert!(feature.scope.contains_key(&Token::name("CONFIG")));
    }

    #[test]
    fn duplicate_global_name_tokens_are_rejected() {
        let make_global = |name: &str| {
            ModuleBuilder::new(name)
                .provider(ProviderBuilder::new(Token::name("CONFIG")).use_value(1u32).build())
                .export(Token::name("CONFIG"))
                .global(true)
                .build()
        };
        let root = ModuleBuilder::new("AppModule")
            .import(make_global("GlobalA"))
            .import(make_global("GlobalB"))
            .build();

        assert!(matches!(
            root.resolve(),
            Err(CadreError::DuplicateGlobalExport { .. })
        ));
    }

    #[test]
    fn duplicate_global_symbol_tokens_are_fine() {
        let make_global = |name: &str| {
            let token = Token::symbol("CONFIG");
            ModuleBuilder::new(name)
                .provider(ProviderBuilder::new(token.clone()).use_value(1u32).build())
                .export(token)
                .global(true)
                .build()
        };
        let root = ModuleBuilder::new("AppModule")
            .import(make_global("GlobalA"))
            .import(make_global("GlobalB"))
            .build();

        assert!(root.resolve().is_ok());
    }
}
