//! PluginRegistry: the local table of field plugins.
//!
//! Maps a plugin `type` key to its `PluginDescriptor`. Forms read default
//! values and default configuration from here. The registry is an ordinary
//! owned value: build one, share it behind an `Arc`, rebuild it after each
//! catalog fetch.

use indexmap::IndexMap;
use tracing::debug;

use crate::types::{FieldConfig, PluginDescriptor};

/// In-memory plugin table keyed by plugin type, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: IndexMap<String, PluginDescriptor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor under its `type`.
    ///
    /// An existing entry with the same type is replaced wholesale (no merge),
    /// and keeps its original position in `list()`.
    pub fn register(&mut self, descriptor: PluginDescriptor) {
        let key = descriptor.type_.clone();
        match self.plugins.insert(key.clone(), descriptor) {
            Some(_) => debug!(plugin = %key, "replaced plugin"),
            None => debug!(plugin = %key, count = self.plugins.len(), "registered plugin"),
        }
    }

    /// Remove a plugin. Unknown types are a no-op.
    pub fn unregister(&mut self, type_: &str) -> Option<PluginDescriptor> {
        let removed = self.plugins.shift_remove(type_);
        if removed.is_some() {
            debug!(plugin = type_, "unregistered plugin");
        }
        removed
    }

    /// Get a plugin by type.
    pub fn lookup(&self, type_: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(type_)
    }

    pub fn contains(&self, type_: &str) -> bool {
        self.plugins.contains_key(type_)
    }

    /// Snapshot of every registered plugin, in insertion order.
    pub fn list(&self) -> Vec<PluginDescriptor> {
        self.plugins.values().cloned().collect()
    }

    /// Default component configuration for a plugin type.
    pub fn default_config(&self, type_: &str) -> Option<&FieldConfig> {
        self.lookup(type_).map(|p| &p.config)
    }

    /// Drop every entry and register `descriptors` in order.
    pub fn rebuild(&mut self, descriptors: impl IntoIterator<Item = PluginDescriptor>) {
        self.plugins.clear();
        for descriptor in descriptors {
            self.plugins.insert(descriptor.type_.clone(), descriptor);
        }
        debug!(count = self.plugins.len(), "plugin registry rebuilt");
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl FromIterator<PluginDescriptor> for PluginRegistry {
    fn from_iter<I: IntoIterator<Item = PluginDescriptor>>(iter: I) -> Self {
        let mut registry = PluginRegistry::new();
        registry.rebuild(iter);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plugin(type_: &str, name: &str) -> PluginDescriptor {
        PluginDescriptor::new(type_, name)
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("input", "Input"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("input").unwrap().name, "Input");
        assert!(registry.lookup("select").is_none());
    }

    #[test]
    fn register_same_type_overwrites() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("input", "Input"));
        registry.register(plugin("select", "Select"));
        registry.register(plugin("input", "Text input v2"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("input").unwrap().name, "Text input v2");
        let names: Vec<_> = registry.list().into_iter().map(|p| p.type_).collect();
        assert_eq!(names, vec!["input", "select"]);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("input", "Input"));

        assert!(registry.unregister("missing").is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister("input").is_some());
        assert!(registry.unregister("input").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn list_is_a_snapshot_in_insertion_order() {
        let mut registry = PluginRegistry::new();
        for t in ["date", "number", "input", "switch"] {
            registry.register(plugin(t, t));
        }
        registry.unregister("number");

        let snapshot = registry.list();
        registry.register(plugin("upload", "Upload"));

        let types: Vec<_> = snapshot.iter().map(|p| p.type_.as_str()).collect();
        assert_eq!(types, vec!["date", "input", "switch"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn rebuild_replaces_everything() {
        let mut registry: PluginRegistry =
            vec![plugin("input", "Input"), plugin("select", "Select")]
                .into_iter()
                .collect();
        registry.rebuild(vec![plugin("number", "Number")]);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("number"));
        assert!(!registry.contains("input"));
    }

    #[test]
    fn default_config_comes_from_descriptor() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("number", "Number").with_config(FieldConfig {
            default_value: Some(json!(0)),
            ..Default::default()
        }));

        let config = registry.default_config("number").unwrap();
        assert_eq!(config.default_value, Some(json!(0)));
        assert!(registry.default_config("missing").is_none());
    }
}
