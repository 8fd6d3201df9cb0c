//! Common test fixtures for feature info tests.
//!
//! This module provides pre-defined queries and backend responses that
//! represent common aggregation scenarios.

use wms_common::{BoundingBox, Crs};
use wms_protocol::{GetFeatureInfoRequest, WmsVersion};

/// Backend response bodies.
pub mod bodies {
    pub const XML_BAR: &str = "<a><b>Bar</b></a>";
    pub const XML_BAR1: &str = "<a><b>Bar1</b></a>";
    pub const XML_BAR2: &str = "<a><b>Bar2</b></a>";
    /// Unclosed heading and paragraph, no `<html>` element.
    pub const HTML_TAG_SOUP: &str = "<body><h1>Hello<p>Bar3";
    pub const PLAIN_HELLO: &str = "Hello";
}

/// Common request parameters.
pub mod params {
    /// Spherical mercator under its legacy code
    pub const CRS: &str = "EPSG:900913";
    pub const BBOX: (f64, f64, f64, f64) = (1000.0, 400.0, 2000.0, 1400.0);
    /// BBOX as forwarded to every backend in that CRS
    pub const BBOX_WIRE: &str = "1000,400,2000,1400";
    pub const SIZE: (u32, u32) = (200, 200);
    pub const PIXEL: (u32, u32) = (10, 20);
}

/// The standard client query for `layers` in the given protocol version.
pub fn feature_info_query(version: WmsVersion, layers: &[&str]) -> GetFeatureInfoRequest {
    let (min_x, min_y, max_x, max_y) = params::BBOX;
    GetFeatureInfoRequest::new(
        version,
        layers.iter().map(|layer| layer.to_string()).collect(),
        Crs::from_wms_string(params::CRS).expect("fixture CRS is valid"),
        BoundingBox::new(min_x, min_y, max_x, max_y),
        params::SIZE,
        params::PIXEL,
    )
}

/// Query string of the standard client request, as sent to the proxy.
pub fn feature_info_query_string(version: &str, layers: &str) -> String {
    let (i_key, j_key, crs_key) = if version == "1.3.0" {
        ("I", "J", "CRS")
    } else {
        ("X", "Y", "SRS")
    };
    format!(
        "SERVICE=WMS&REQUEST=GetFeatureInfo&VERSION={version}&LAYERS={layers}&QUERY_LAYERS={layers}\
         &STYLES=&FORMAT=image%2Fpng&{crs_key}=EPSG%3A900913&BBOX=1000,400,2000,1400\
         &WIDTH=200&HEIGHT=200&{i_key}=10&{j_key}=20",
    )
}
