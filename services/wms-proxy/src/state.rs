//! Application state for the WMS proxy.

use anyhow::Result;
use featureinfo::{FeatureInfoAggregator, LayerRegistry, ReqwestFetcher};

use crate::config::ProxyConfig;

/// Shared application state.
pub struct AppState {
    /// Client-facing layers and their backend sources.
    pub registry: LayerRegistry,

    /// GetFeatureInfo pipeline over a pooled HTTP client.
    pub aggregator: FeatureInfoAggregator<ReqwestFetcher>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let fetcher = ReqwestFetcher::new(config.request_timeout)?;

        Ok(Self {
            registry: config.registry,
            aggregator: FeatureInfoAggregator::new(fetcher, config.aggregator),
        })
    }
}
