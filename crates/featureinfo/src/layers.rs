//! Client-facing layers and the backends behind them.

use std::sync::Arc;

use wms_common::{WmsError, WmsResult};

use crate::backend::BackendDescriptor;

/// A layer as clients see it, served by one or more backend sources.
#[derive(Debug, Clone)]
pub struct LogicalLayer {
    pub name: String,
    pub sources: Vec<Arc<BackendDescriptor>>,
}

impl LogicalLayer {
    pub fn new(name: impl Into<String>, sources: Vec<Arc<BackendDescriptor>>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }

    /// Whether any source answers GetFeatureInfo.
    pub fn is_queryable(&self) -> bool {
        self.sources.iter().any(|source| source.queryable)
    }
}

/// All configured layers, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: Vec<LogicalLayer>,
}

impl LayerRegistry {
    pub fn new(layers: Vec<LogicalLayer>) -> Self {
        Self { layers }
    }

    pub fn get(&self, name: &str) -> Option<&LogicalLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn layers(&self) -> &[LogicalLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Backends contributing to `query_layers`: layer order first, then source
    /// order within each layer. Non-queryable sources are skipped.
    pub fn resolve(&self, query_layers: &[String]) -> WmsResult<Vec<&BackendDescriptor>> {
        let mut backends = Vec::new();
        for name in query_layers {
            let layer = self
                .get(name)
                .ok_or_else(|| WmsError::LayerNotFound(name.clone()))?;
            if !layer.is_queryable() {
                return Err(WmsError::LayerNotQueryable(name.clone()));
            }
            backends.extend(
                layer
                    .sources
                    .iter()
                    .filter(|source| source.queryable)
                    .map(Arc::as_ref),
            );
        }
        Ok(backends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_protocol::WmsVersion;

    fn source(name: &str, queryable: bool) -> Arc<BackendDescriptor> {
        Arc::new(
            BackendDescriptor::new(name, format!("http://{}/wms", name), WmsVersion::V1_1_1, vec![name.into()])
                .with_queryable(queryable),
        )
    }

    fn registry() -> LayerRegistry {
        LayerRegistry::new(vec![
            LogicalLayer::new("fi_layer", vec![source("a", true)]),
            LogicalLayer::new("fi_multi_layer", vec![source("a", true), source("x", false), source("b", true), source("d", true)]),
            LogicalLayer::new("overview", vec![source("o", false)]),
        ])
    }

    fn names(backends: &[&BackendDescriptor]) -> Vec<String> {
        backends.iter().map(|b| b.name.clone()).collect()
    }

    #[test]
    fn test_resolve_keeps_layer_then_source_order() {
        let registry = registry();
        let backends = registry
            .resolve(&["fi_multi_layer".to_string(), "fi_layer".to_string()])
            .unwrap();
        assert_eq!(names(&backends), vec!["a", "b", "d", "a"]);
    }

    #[test]
    fn test_unknown_and_unqueryable_layers() {
        let registry = registry();
        assert!(matches!(
            registry.resolve(&["missing".to_string()]),
            Err(WmsError::LayerNotFound(ref name)) if name == "missing"
        ));
        assert!(matches!(
            registry.resolve(&["overview".to_string()]),
            Err(WmsError::LayerNotQueryable(_))
        ));
    }

    #[test]
    fn test_lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
        assert!(registry.get("fi_layer").unwrap().is_queryable());
        assert!(!registry.get("overview").unwrap().is_queryable());
        assert!(LayerRegistry::default().is_empty());
    }
}
