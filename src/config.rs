//! Configuration module.
//!
//! `config_module` is the canonical dynamic module: a plain function
//! returning a configured [`ModuleDefinition`]. Each call produces an
//! independent module identity, so two registrations with different
//! options coexist; marking one global makes its [`ConfigService`]
//! visible everywhere under the `CONFIG` name token.

use crate::module::{ModuleBuilder, ModuleDefinition};
use crate::provider::ProviderBuilder;
use crate::token::Token;
use dashmap::DashMap;
use std::sync::Arc;

/// Name token the config module exports under.
pub const CONFIG_TOKEN: &str = "CONFIG";

/// Options for [`config_module`].
#[derive(Debug, Clone, Default)]
pub struct ConfigModuleOptions {
    /// Only environment variables starting with this prefix are loaded;
    /// the prefix is stripped from the stored key.
    pub env_prefix: Option<String>,
    /// Export the service to every module without explicit imports.
    pub global: bool,
}

/// Key-value configuration store seeded from the process environment.
#[derive(Debug, Default)]
pub struct ConfigService {
    values: DashMap<String, String>,
}

impl ConfigService {
    /// Load from the current environment, honoring the prefix filter.
    pub fn from_env(prefix: Option<&str>) -> Self {
        let values = DashMap::new();
        for (key, value) in std::env::vars() {
            match prefix {
                Some(prefix) => {
                    if let Some(stripped) = key.strip_prefix(prefix) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                None => {
                    values.insert(key, value);
                }
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Typed lookup via `FromStr`; `None` when missing or unparsable.
    pub fn get_as<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|value| value.parse().ok())
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build a config module for the given options.
pub fn config_module(options: ConfigModuleOptions) -> ModuleDefinition {
    let prefix = options.env_prefix.clone();
    ModuleBuilder::new("ConfigModule")
        .provider(
            ProviderBuilder::new(Token::name(CONFIG_TOKEN))
                .use_factory(move |_| Ok(Arc::new(ConfigService::from_env(prefix.as_deref()))))
                .build(),
        )
        .export(Token::name(CONFIG_TOKEN))
        .global(options.global)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_stripped_from_keys() {
        std::env::set_var("CADRE_TEST_DB_URL", "postgres://localhost");
        let config = ConfigService::from_env(Some("CADRE_TEST_"));
        assert_eq!(config.get("DB_URL").as_deref(), Some("postgres://localhost"));
        assert!(config.get("CADRE_TEST_DB_URL").is_none());
    }

    #[test]
    fn typed_lookup_parses_values() {
        let config = ConfigService::default();
        config.set("PORT", "8080");
        config.set("BAD", "eight");
        assert_eq!(config.get_as::<u16>("PORT"), Some(8080));
        assert_eq!(config.get_as::<u16>("BAD"), None);
        assert_eq!(config.get_or("MISSING", "fallback"), "fallback");
    }

    #[test]
    fn each_registration_is_a_distinct_module() {
        let first = config_module(ConfigModuleOptions::default());
        let second = config_module(ConfigModuleOptions::default());
        assert_eq!(first.name, second.name);
        assert_ne!(first.id, second.id);
    }
}
