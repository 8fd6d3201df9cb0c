//! End-to-end GetFeatureInfo aggregation.

use std::time::Instant;

use metrics::{counter, histogram};
use serde::Deserialize;
use tracing::{info, instrument};
use wms_common::WmsResult;
use wms_protocol::GetFeatureInfoRequest;

use crate::backend::BackendDescriptor;
use crate::dispatch::{dispatch, HttpFetcher};
use crate::merge::{merge, CompatibilityRule, LayerDocument, MergedResult};
use crate::negotiate::resolve;
use crate::normalize::normalize;
use crate::translate::translate;

fn default_max_concurrency() -> usize {
    8
}

/// Tuning for the aggregation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AggregatorConfig {
    /// Upper bound on concurrent backend requests per client request
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// How fragments qualify for a shared output transform
    #[serde(default)]
    pub compatibility: CompatibilityRule,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            compatibility: CompatibilityRule::default(),
        }
    }
}

/// Runs negotiate, translate, dispatch, normalize and merge for one query.
#[derive(Debug)]
pub struct FeatureInfoAggregator<F> {
    fetcher: F,
    config: AggregatorConfig,
}

impl<F: HttpFetcher> FeatureInfoAggregator<F> {
    pub fn new(fetcher: F, config: AggregatorConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Aggregate feature info from `backends`, which must be in query-layer
    /// order.
    ///
    /// Any backend failure fails the whole request.
    #[instrument(skip(self, query, backends), fields(
        version = %query.version,
        layers = ?query.query_layers,
        backends = backends.len(),
    ))]
    pub async fn get_feature_info(
        &self,
        query: &GetFeatureInfoRequest,
        backends: &[&BackendDescriptor],
    ) -> WmsResult<MergedResult> {
        let start = Instant::now();
        counter!("featureinfo_requests_total").increment(1);

        let format = resolve(query, backends)?;

        let requests: Vec<_> = backends
            .iter()
            .map(|backend| translate(query, backend))
            .collect();
        let responses = dispatch(&self.fetcher, &requests, self.config.max_concurrency).await?;

        let family = format.family();
        let documents = responses
            .into_iter()
            .zip(backends)
            .map(|(raw, backend)| {
                Ok(LayerDocument {
                    backend: backend.name.clone(),
                    document: normalize(raw, backend)?,
                    output_transform: backend.output_transform(family).cloned(),
                })
            })
            .collect::<WmsResult<Vec<_>>>()?;

        let merged = merge(&documents, &format, self.config.compatibility)?;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        histogram!("featureinfo_request_duration_ms").record(elapsed_ms);
        info!(
            content_type = %merged.content_type,
            size = merged.body.len(),
            elapsed_ms,
            "GetFeatureInfo aggregated"
        );
        Ok(merged)
    }
}
