//! Client query to backend sub-request translation.

use std::fmt;

use wms_common::AxisOrder;
use wms_protocol::GetFeatureInfoRequest;

use crate::backend::BackendDescriptor;

/// A fully resolved GetFeatureInfo request for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRequest {
    pub backend: String,
    pub url: String,
    /// Query parameters in the order they are sent
    pub params: Vec<(String, String)>,
}

impl SubRequest {
    /// Value of a parameter, matched case-sensitively.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for SubRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)?;
        if self.params.is_empty() {
            return Ok(());
        }

        let separator = if self.url.ends_with('?') || self.url.ends_with('&') {
            ""
        } else if self.url.contains('?') {
            "&"
        } else {
            "?"
        };
        f.write_str(separator)?;

        for (index, (key, value)) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Build the backend-specific request for `query`.
///
/// Parameter names, the BBOX axis order and the default INFO_FORMAT follow the
/// backend's dialect, not the client's. `info_format` is sent only when the
/// backend declares a preferred format.
pub fn translate(query: &GetFeatureInfoRequest, backend: &BackendDescriptor) -> SubRequest {
    let dialect = backend.dialect();
    let layers = backend.layers.join(",");

    let bbox = if dialect.authority_axis_order && query.crs.axis_order_wms_1_3() == AxisOrder::LatLon
    {
        query.bbox.swap_axes()
    } else {
        query.bbox.clone()
    };

    let mut params: Vec<(String, String)> = vec![
        ("SERVICE".into(), "WMS".into()),
        ("VERSION".into(), dialect.version.into()),
        ("REQUEST".into(), "GetFeatureInfo".into()),
        ("LAYERS".into(), layers.clone()),
        ("QUERY_LAYERS".into(), layers),
        ("STYLES".into(), query.styles.clone()),
        ("FORMAT".into(), query.format.clone()),
        (dialect.crs_param.into(), query.crs.as_str().into()),
        ("BBOX".into(), bbox.to_wms_string()),
        ("WIDTH".into(), query.width.to_string()),
        ("HEIGHT".into(), query.height.to_string()),
        (dialect.i_param.into(), query.i.to_string()),
        (dialect.j_param.into(), query.j.to_string()),
    ];

    if let Some(info_format) = &backend.info_format {
        params.push(("info_format".into(), info_format.clone()));
    }
    if let Some(feature_count) = query.feature_count {
        params.push(("FEATURE_COUNT".into(), feature_count.to_string()));
    }

    SubRequest {
        backend: backend.name.clone(),
        url: backend.url.clone(),
        params,
    }
}
