//! Metadata store.
//!
//! Holds arbitrary key/value metadata attached to controller classes and
//! their methods by the builder API, and read back during bootstrap and
//! dispatch. The store is owned by the application instance rather than
//! being process-global, so independent applications (and test cases) do
//! not leak state into each other.

use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;

/// Identity of a metadata target: a registered class, or one of its
/// methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataTarget {
    Class(String),
    Method { class: String, method: String },
}

impl MetadataTarget {
    pub fn class(name: impl Into<String>) -> Self {
        MetadataTarget::Class(name.into())
    }

    pub fn method(class: impl Into<String>, method: impl Into<String>) -> Self {
        MetadataTarget::Method {
            class: class.into(),
            method: method.into(),
        }
    }

    /// The enclosing class target, if this is a method target.
    pub fn parent(&self) -> Option<MetadataTarget> {
        match self {
            MetadataTarget::Class(_) => None,
            MetadataTarget::Method { class, .. } => Some(MetadataTarget::Class(class.clone())),
        }
    }
}

type MetadataValue = Arc<dyn Any + Send + Sync>;

/// Application-scoped metadata registry.
pub struct MetadataRegistry {
    entries: DashMap<(MetadataTarget, String), MetadataValue>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Attach metadata to a target, overwriting any existing value for
    /// the same key.
    pub fn set<V: Any + Send + Sync>(&self, key: &str, value: V, target: MetadataTarget) {
        self.entries.insert((target, key.to_string()), Arc::new(value));
    }

    /// Read metadata from a target. Returns `None` for unknown targets
    /// or keys.
    pub fn get<V: Any + Send + Sync + Clone>(&self, key: &str, target: &MetadataTarget) -> Option<V> {
        self.entries
            .get(&(target.clone(), key.to_string()))
            .and_then(|entry| entry.value().downcast_ref::<V>().cloned())
    }

    /// Read a list-valued key across scopes.
    ///
    /// Method-level bindings are additive to class-level bindings, never a
    /// replacement: the class-level list comes first, then the method-level
    /// list. For a class target this is equivalent to [`MetadataRegistry::get`].
    pub fn get_aggregate<V: Any + Send + Sync + Clone>(
        &self,
        key: &str,
        target: &MetadataTarget,
    ) -> Vec<V> {
        let mut combined = Vec::new();
        if let Some(parent) = target.parent() {
            if let Some(outer) = self.get::<Vec<V>>(key, &parent) {
                combined.extend(outer);
            }
        }
        if let Some(own) = self.get::<Vec<V>>(key, target) {
            combined.extend(own);
        }
        combined
    }
}

impl Default for MetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_existing_value() {
        let registry = MetadataRegistry::new();
        let target = MetadataTarget::class("CatsController");

        registry.set("path", "/cats".to_string(), target.clone());
        registry.set("path", "/dogs".to_string(), target.clone());

        assert_eq!(registry.get::<String>("path", &target), Some("/dogs".into()));
    }

    #[test]
    fn unknown_target_reads_none() {
        let registry = MetadataRegistry::new();
        let target = MetadataTarget::method("Nope", "missing");
        assert_eq!(registry.get::<String>("path", &target), None);
    }

    #[test]
    fn method_metadata_is_additive_to_class_metadata() {
        let registry = MetadataRegistry::new();
        let class = MetadataTarget::class("CatsController");
        let method = MetadataTarget::method("CatsController", "find_all");

        registry.set("roles", vec!["admin".to_string()], class);
        registry.set("roles", vec!["reader".to_string()], method.clone());

        let combined = registry.get_aggregate::<String>("roles", &method);
        assert_eq!(combined, vec!["admin".to_string(), "reader".to_string()]);
    }
}
