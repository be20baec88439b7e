/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Layers referenced by the module graph.
 */

//! Layer registry.
//!
//! Tracks which virtual layer modules the build actually uses. A layer is
//! registered when its module is resolved or loaded. Resolution can be
//! speculative: the bundler may resolve an import that later disappears
//! (tree-shaken, behind a dead branch). So the importer → layer edge recorded
//! at resolve time is provisional, and is rolled back in
//! [`LayerRegistry::on_graph_parsed`] if the parsed importer no longer
//! imports the layer module.

use std::collections::HashMap;

use hashlink::LinkedHashSet;
use uno_layers::{layer_placeholder, resolve_id, resolve_layer, strip_query};

#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    /// Referenced layers, in first-reference order
    layers: LinkedHashSet<String>,
    /// Importer id → resolved layer module id
    importers: HashMap<String, String>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every layer and edge. Called at the start of each build.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.importers.clear();
    }

    /// Resolve an import specifier.
    ///
    /// Returns the canonical id for virtual CSS entries and `None` for
    /// anything else. When the id denotes a layer, the layer is registered and
    /// the provisional `importer` edge recorded.
    pub fn resolve(&mut self, specifier: &str, importer: Option<&str>) -> Option<String> {
        let resolved = resolve_id(specifier, importer)?;

        if let Some(layer) = resolve_layer(&resolved) {
            tracing::trace!(layer = %layer, importer, "Layer resolved");
            self.record(layer);
            if let Some(importer) = importer {
                self.importers
                    .insert(importer.to_string(), resolved.clone());
            }
        }

        Some(resolved)
    }

    /// Load a resolved id.
    ///
    /// Returns the module content for layer modules: a single layer marker.
    pub fn load(&mut self, id: &str) -> Option<String> {
        let layer = resolve_layer(strip_query(id))?;
        let content = layer_placeholder(&layer);
        self.record(layer);
        Some(content)
    }

    /// Confirm or roll back the edge recorded for `module_id`.
    ///
    /// If the module's parsed imports no longer include its layer module, the
    /// edge is dropped and so is the layer, unless another importer still
    /// holds an edge to it. Returns whether anything was rolled back. Calling
    /// this again for the same module is a no-op.
    pub fn on_graph_parsed(&mut self, module_id: &str, imported_ids: &[String]) -> bool {
        let Some(layer_id) = self.importers.get(module_id) else {
            return false;
        };
        if imported_ids.iter().any(|id| id == layer_id) {
            return false;
        }

        let Some(layer_id) = self.importers.remove(module_id) else {
            return false;
        };
        // Resolved ids are importer-relative; compare by layer name.
        let layer = resolve_layer(&layer_id);
        let still_imported = self
            .importers
            .values()
            .any(|id| resolve_layer(id) == layer);
        if !still_imported && let Some(layer) = layer {
            tracing::debug!(layer = %layer, module = module_id, "Dropping unused layer");
            self.layers.remove(&layer);
        }
        true
    }

    // A repeated reference keeps the layer's first position.
    fn record(&mut self, layer: String) {
        if !self.layers.contains(&layer) {
            self.layers.insert(layer);
        }
    }

    /// Referenced layers, in first-reference order.
    pub fn layers(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.as_str())
    }

    pub fn contains(&self, layer: &str) -> bool {
        self.layers.contains(layer)
    }

    /// Layer module id recorded for an importer.
    pub fn importer_edge(&self, importer: &str) -> Option<&str> {
        self.importers.get(importer).map(|id| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uno_layers::LAYER_MARK_ALL;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_resolve_registers_layer_and_edge() {
        let mut registry = LayerRegistry::new();
        let resolved = registry.resolve("uno:icons.css", Some("/src/main.ts"));

        assert_eq!(resolved.as_deref(), Some("/src/__uno_icons.css"));
        assert!(registry.contains("icons"));
        assert_eq!(
            registry.importer_edge("/src/main.ts"),
            Some("/src/__uno_icons.css")
        );
    }

    #[test]
    fn test_resolve_ignores_other_specifiers() {
        let mut registry = LayerRegistry::new();
        assert_eq!(registry.resolve("./app.css", Some("/src/main.ts")), None);
        assert!(registry.is_empty());
        assert_eq!(registry.importer_edge("/src/main.ts"), None);
    }

    #[test]
    fn test_resolve_with_query_does_not_register() {
        let mut registry = LayerRegistry::new();
        let resolved = registry.resolve("uno.css?inline", None);
        assert_eq!(resolved.as_deref(), Some("/__uno.css?inline"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_returns_placeholder() {
        let mut registry = LayerRegistry::new();
        let content = registry.load("/__uno.css?direct").unwrap();

        assert_eq!(content, layer_placeholder(LAYER_MARK_ALL));
        assert!(registry.contains(LAYER_MARK_ALL));
        assert_eq!(registry.load("/src/main.ts"), None);
    }

    #[test]
    fn test_repeated_load_keeps_first_position() {
        let mut registry = LayerRegistry::new();
        registry.load("/__uno_a.css");
        registry.load("/__uno_b.css");
        registry.load("/__uno_a.css");

        let layers: Vec<_> = registry.layers().collect();
        assert_eq!(layers, vec!["a", "b"]);
    }

    #[test]
    fn test_graph_parsed_confirms_edge() {
        let mut registry = LayerRegistry::new();
        registry.resolve("uno.css", Some("/src/main.ts"));

        let rolled_back =
            registry.on_graph_parsed("/src/main.ts", &ids(&["/src/__uno.css", "/src/app.ts"]));
        assert!(!rolled_back);
        assert!(registry.contains(LAYER_MARK_ALL));
        assert!(registry.importer_edge("/src/main.ts").is_some());
    }

    #[test]
    fn test_graph_parsed_rolls_back_stale_edge() {
        let mut registry = LayerRegistry::new();
        registry.resolve("uno:icons.css", Some("/src/lazy.ts"));

        assert!(registry.on_graph_parsed("/src/lazy.ts", &ids(&["/src/other.ts"])));
        assert!(!registry.contains("icons"));
        assert_eq!(registry.importer_edge("/src/lazy.ts"), None);

        // Rollback is idempotent.
        assert!(!registry.on_graph_parsed("/src/lazy.ts", &[]));
    }

    #[test]
    fn test_rollback_keeps_layer_still_imported_elsewhere() {
        let mut registry = LayerRegistry::new();
        registry.resolve("uno:icons.css", Some("/src/a.ts"));
        registry.resolve("uno:icons.css", Some("/src/b.ts"));
        // Same directory, same resolved id.
        assert_eq!(registry.importer_edge("/src/a.ts"), registry.importer_edge("/src/b.ts"));

        registry.on_graph_parsed("/src/a.ts", &[]);
        assert!(registry.contains("icons"));
    }

    #[test]
    fn test_rollback_keeps_layer_imported_from_other_directory() {
        let mut registry = LayerRegistry::new();
        registry.resolve("uno:icons.css", Some("/src/a.ts"));
        registry.resolve("uno:icons.css", Some("/lib/b.ts"));

        assert!(registry.on_graph_parsed("/src/a.ts", &[]));
        assert!(registry.contains("icons"));
        assert_eq!(
            registry.importer_edge("/lib/b.ts"),
            Some("/lib/__uno_icons.css")
        );

        // The last importer going away drops the layer.
        assert!(registry.on_graph_parsed("/lib/b.ts", &[]));
        assert!(!registry.contains("icons"));
    }

    #[test]
    fn test_graph_parsed_for_unknown_module() {
        let mut registry = LayerRegistry::new();
        registry.load("/__uno.css");
        assert!(!registry.on_graph_parsed("/src/main.ts", &[]));
        assert!(registry.contains(LAYER_MARK_ALL));
    }

    #[test]
    fn test_clear() {
        let mut registry = LayerRegistry::new();
        registry.resolve("uno.css", Some("/src/main.ts"));
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.importer_edge("/src/main.ts"), None);
    }
}
