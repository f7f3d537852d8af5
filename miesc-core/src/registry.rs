//! The adapter registry: holds every known adapter by name and answers
//! questions about which ones belong to a given layer.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::adapter::Adapter;

/// An immutable-after-construction collection of adapters, keyed by name.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: FxHashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        let name = adapter.metadata().name.clone();
        self.adapters.insert(name, adapter);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Every registered adapter whose default layer is `layer`, in a stable
    /// order (sorted by name) so that scheduling within a layer is
    /// deterministic regardless of registration order.
    #[must_use]
    pub fn adapters_in_layer(&self, layer: u8) -> Vec<Arc<dyn Adapter>> {
        let mut matching: Vec<Arc<dyn Adapter>> = self
            .adapters
            .values()
            .filter(|a| a.metadata().default_layer == layer)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.metadata().name.cmp(&b.metadata().name));
        matching
    }

    /// Every registered adapter whose `detection_types` includes
    /// `capability`, in stable name order. Lets callers (e.g. a profile
    /// that wants "anything able to flag reentrancy") discover adapters by
    /// capability rather than by name or layer.
    #[must_use]
    pub fn adapters_with_capability(&self, capability: &str) -> Vec<Arc<dyn Adapter>> {
        let mut matching: Vec<Arc<dyn Adapter>> = self
            .adapters
            .values()
            .filter(|a| a.metadata().detection_types.iter().any(|t| t == capability))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.metadata().name.cmp(&b.metadata().name));
        matching
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::pragma::PragmaAdapter;

    #[test]
    fn registry_groups_adapters_by_default_layer() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(PragmaAdapter::new()));
        assert_eq!(registry.adapters_in_layer(2).len(), 1);
        assert!(registry.adapters_in_layer(5).is_empty());
    }

    #[test]
    fn registry_finds_adapters_by_detection_capability() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(PragmaAdapter::new()));
        assert_eq!(registry.adapters_with_capability("floating_pragma").len(), 1);
        assert!(registry.adapters_with_capability("reentrancy_naive").is_empty());
    }

    #[test]
    fn unknown_adapter_name_returns_none() {
        let registry = AdapterRegistry::new();
        assert!(registry.get("nonexistent").is_none());
    }
}
