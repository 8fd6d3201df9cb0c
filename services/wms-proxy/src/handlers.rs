//! HTTP handlers for the WMS proxy.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::{instrument, warn};
use wms_common::{AxisOrder, BoundingBox, Crs, WmsError, WmsResult};
use wms_protocol::{GetFeatureInfoRequest, ServiceExceptionReport, WmsVersion};

use crate::state::AppState;

// ============================================================================
// Request Parameters
// ============================================================================

/// KVP parameters of a WMS request.
///
/// Keys are case-insensitive; `SRS` is read as `CRS` and `X`/`Y` as `I`/`J`
/// so both protocol dialects land in the same fields.
#[derive(Debug, Default, Clone)]
pub struct WmsParams {
    pub service: Option<String>,
    pub request: Option<String>,
    pub version: Option<String>,
    pub layers: Option<String>,
    pub styles: Option<String>,
    pub crs: Option<String>,
    pub bbox: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub format: Option<String>,
    // GetFeatureInfo parameters
    pub query_layers: Option<String>,
    pub info_format: Option<String>,
    pub i: Option<String>,
    pub j: Option<String>,
    pub feature_count: Option<String>,
}

impl WmsParams {
    /// Collect parameters from decoded query pairs. Unknown keys are ignored;
    /// a repeated key keeps its last value.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.to_ascii_lowercase().as_str() {
                "service" => &mut params.service,
                "request" => &mut params.request,
                "version" => &mut params.version,
                "layers" => &mut params.layers,
                "styles" => &mut params.styles,
                "crs" | "srs" => &mut params.crs,
                "bbox" => &mut params.bbox,
                "width" => &mut params.width,
                "height" => &mut params.height,
                "format" => &mut params.format,
                "query_layers" => &mut params.query_layers,
                "info_format" => &mut params.info_format,
                "i" | "x" => &mut params.i,
                "j" | "y" => &mut params.j,
                "feature_count" => &mut params.feature_count,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }

    /// Client protocol version; 1.3.0 when absent.
    pub fn wms_version(&self) -> WmsResult<WmsVersion> {
        match self.version.as_deref() {
            None | Some("") => Ok(WmsVersion::default()),
            Some(version) => version.parse().map_err(|e: wms_protocol::version::UnknownVersion| {
                WmsError::InvalidParameter {
                    param: "VERSION".to_string(),
                    message: e.to_string(),
                }
            }),
        }
    }

    /// Build the validated GetFeatureInfo query.
    ///
    /// The BBOX is stored in x/y order: a 1.3.0 client in a latitude-first
    /// CRS has its BBOX swapped here.
    pub fn to_feature_info_query(&self) -> WmsResult<GetFeatureInfoRequest> {
        let version = self.wms_version()?;
        let dialect = version.dialect();
        let layers = split_layers(required(&self.layers, "LAYERS")?);
        let query_layers = split_layers(required(&self.query_layers, "QUERY_LAYERS")?);
        if query_layers.is_empty() {
            return Err(WmsError::MissingParameter("QUERY_LAYERS".to_string()));
        }

        let crs = Crs::from_wms_string(required(&self.crs, dialect.crs_param)?)?;
        let mut bbox = BoundingBox::from_wms_string(required(&self.bbox, "BBOX")?)?;
        if dialect.authority_axis_order && crs.axis_order_wms_1_3() == AxisOrder::LatLon {
            bbox = bbox.swap_axes();
        }

        let width = number(&self.width, "WIDTH")?.ok_or_else(|| missing("WIDTH"))?;
        let height = number(&self.height, "HEIGHT")?.ok_or_else(|| missing("HEIGHT"))?;
        let i_param = dialect.i_param.to_uppercase();
        let j_param = dialect.j_param.to_uppercase();
        let i = number(&self.i, &i_param)?.ok_or_else(|| missing(&i_param))?;
        let j = number(&self.j, &j_param)?.ok_or_else(|| missing(&j_param))?;
        if i >= width || j >= height {
            return Err(WmsError::InvalidParameter {
                param: format!("{}/{}", i_param, j_param),
                message: format!("pixel ({}, {}) outside of {}x{} map", i, j, width, height),
            });
        }

        let mut query = GetFeatureInfoRequest::new(version, layers, crs, bbox, (width, height), (i, j))
            .with_query_layers(query_layers);
        query.styles = self.styles.clone().unwrap_or_default();
        if let Some(format) = self.format.as_deref().filter(|f| !f.is_empty()) {
            query.format = format.to_string();
        }
        query.info_format = self.info_format.clone().filter(|f| !f.trim().is_empty());
        query.feature_count = number(&self.feature_count, "FEATURE_COUNT")?;
        Ok(query)
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> WmsResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| missing(name))
}

/// Parse an optional non-negative integer; empty counts as absent.
fn number(value: &Option<String>, name: &str) -> WmsResult<Option<u32>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| WmsError::InvalidParameter {
            param: name.to_string(),
            message: format!("expected a non-negative integer, got '{}'", raw),
        }),
    }
}

fn missing(name: &str) -> WmsError {
    WmsError::MissingParameter(name.to_string())
}

fn split_layers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|layer| !layer.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Exception Helpers
// ============================================================================

/// Render an error as a ServiceExceptionReport of the client's version.
pub fn wms_exception(version: WmsVersion, err: &WmsError) -> Response {
    let report = ServiceExceptionReport::from_error(version, err);
    counter!("featureinfo_exceptions_total", "code" => report.code.clone()).increment(1);

    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, report.content_type())],
        report.to_xml(),
    )
        .into_response()
}

// ============================================================================
// WMS Handler Entry Point
// ============================================================================

#[instrument(skip(state, pairs))]
pub async fn service_handler(
    Extension(state): Extension<Arc<AppState>>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let params = match pairs {
        Ok(Query(pairs)) => WmsParams::from_pairs(pairs),
        Err(rejection) => {
            let err = WmsError::InvalidParameter {
                param: "query".to_string(),
                message: rejection.body_text(),
            };
            return wms_exception(WmsVersion::default(), &err);
        }
    };

    let version = params.wms_version().unwrap_or_default();
    match handle_request(&state, &params).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, code = err.wms_exception_code(), "WMS request failed");
            wms_exception(version, &err)
        }
    }
}

async fn handle_request(state: &AppState, params: &WmsParams) -> WmsResult<Response> {
    if let Some(service) = params.service.as_deref() {
        if !service.eq_ignore_ascii_case("WMS") {
            return Err(WmsError::InvalidParameter {
                param: "SERVICE".to_string(),
                message: format!("expected WMS, got {}", service),
            });
        }
    }

    let request = params
        .request
        .as_deref()
        .ok_or_else(|| missing("REQUEST"))?;
    if !request.eq_ignore_ascii_case("GetFeatureInfo") {
        return Err(WmsError::OperationNotSupported(request.to_string()));
    }

    feature_info(state, params).await
}

async fn feature_info(state: &AppState, params: &WmsParams) -> WmsResult<Response> {
    let query = params.to_feature_info_query()?;
    let backends = state.registry.resolve(&query.query_layers)?;
    let merged = state.aggregator.get_feature_info(&query, &backends).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, merged.content_type)],
        merged.body,
    )
        .into_response())
}

// ============================================================================
// Health and Metrics
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub layers: usize,
}

/// GET /health - Basic health check
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        layers: state.registry.len(),
    })
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}

/// Routes served with the application state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/service", get(service_handler))
        .route("/wms", get(service_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
}
