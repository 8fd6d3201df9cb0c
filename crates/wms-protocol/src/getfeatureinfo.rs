//! WMS GetFeatureInfo request model and response formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use wms_common::{BoundingBox, Crs};

use crate::version::WmsVersion;

/// A validated client GetFeatureInfo query.
///
/// Built once per incoming request by the request parser and shared read-only
/// by every backend translation.
#[derive(Debug, Clone)]
pub struct GetFeatureInfoRequest {
    /// Protocol version the client spoke
    pub version: WmsVersion,
    /// Layers to display (same as GetMap)
    pub layers: Vec<String>,
    /// Layers to query for information
    pub query_layers: Vec<String>,
    /// STYLES value, forwarded verbatim
    pub styles: String,
    /// Coordinate reference system
    pub crs: Crs,
    /// Bounding box in x/y order
    pub bbox: BoundingBox,
    /// Map width in pixels
    pub width: u32,
    /// Map height in pixels
    pub height: u32,
    /// Pixel column (0-based from left)
    pub i: u32,
    /// Pixel row (0-based from top)
    pub j: u32,
    /// Image FORMAT of the underlying GetMap
    pub format: String,
    /// Explicit INFO_FORMAT, if the client sent one
    pub info_format: Option<String>,
    /// Maximum number of features to return
    pub feature_count: Option<u32>,
}

impl GetFeatureInfoRequest {
    /// Create a query for the given layers at a pixel position.
    ///
    /// LAYERS and QUERY_LAYERS start out identical; styles default to empty
    /// and the image format to PNG.
    pub fn new(
        version: WmsVersion,
        layers: Vec<String>,
        crs: Crs,
        bbox: BoundingBox,
        size: (u32, u32),
        pixel: (u32, u32),
    ) -> Self {
        Self {
            version,
            query_layers: layers.clone(),
            layers,
            styles: String::new(),
            crs,
            bbox,
            width: size.0,
            height: size.1,
            i: pixel.0,
            j: pixel.1,
            format: "image/png".to_string(),
            info_format: None,
            feature_count: None,
        }
    }

    pub fn with_info_format(mut self, info_format: impl Into<String>) -> Self {
        self.info_format = Some(info_format.into());
        self
    }

    pub fn with_query_layers(mut self, query_layers: Vec<String>) -> Self {
        self.query_layers = query_layers;
        self
    }
}

/// Broad classes of GetFeatureInfo response formats.
///
/// The family decides which output transform, if any, may render a merged
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatFamily {
    /// text/xml, application/vnd.ogc.gml, application/xml, ...
    Xml,
    /// text/html
    Html,
    /// text/plain and anything else; never output-transformed
    Text,
}

impl FormatFamily {
    /// Classify a MIME type. Parameters such as `; charset=utf-8` are ignored.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime_essence(mime);
        if essence.contains("html") {
            FormatFamily::Html
        } else if essence.contains("xml") || essence.contains("gml") {
            FormatFamily::Xml
        } else {
            FormatFamily::Text
        }
    }

    /// Whether a merged response of this family may be rendered through an
    /// output transform.
    pub fn permits_output_transform(&self) -> bool {
        !matches!(self, FormatFamily::Text)
    }
}

impl fmt::Display for FormatFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatFamily::Xml => "xml",
            FormatFamily::Html => "html",
            FormatFamily::Text => "text",
        };
        f.write_str(name)
    }
}

/// The single format of a merged GetFeatureInfo response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    mime: String,
    family: FormatFamily,
}

impl OutputFormat {
    /// Parse from MIME type string
    pub fn from_mime(mime: &str) -> Self {
        Self {
            mime: mime.trim().to_string(),
            family: FormatFamily::from_mime(mime),
        }
    }

    /// Get MIME type string
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn family(&self) -> FormatFamily {
        self.family
    }

    /// Whether this format names the same media type as `other`, ignoring case
    /// and parameters.
    pub fn matches_mime(&self, other: &str) -> bool {
        mime_essence(&self.mime) == mime_essence(other)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime)
    }
}

/// Lowercased media type without parameters.
pub fn mime_essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_lowercase()
}
