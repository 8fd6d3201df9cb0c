//! Coordinate Reference System identifiers and axis order rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG codes whose authority definition puts the northing/latitude axis first.
///
/// Only consulted for WMS 1.3.0, which honours the authority axis order.
const NORTHING_FIRST_EPSG_CODES: &[u32] = &[
    4326, // WGS 84
    4258, // ETRS89
    4269, // NAD83
    4267, // NAD27
    4283, // GDA94
    4230, // ED50
    4314, // DHDN
    4617, // NAD83(CSRS)
    4674, // SIRGAS 2000
    4988, // ETRS89 3D
    3035, // ETRS89 / LAEA Europe
    3034, // ETRS89 / LCC Europe
    31466, 31467, 31468, 31469, // DHDN / Gauss-Kruger zones 2-5
];

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude/northing), X (longitude/easting)
    LatLon,
}

/// A CRS identifier as passed in SRS/CRS parameters.
///
/// The identifier string is preserved verbatim so it can be forwarded to
/// backends unchanged; the EPSG code is extracted only to decide axis order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    identifier: String,
    epsg: Option<u32>,
}

impl Crs {
    /// Parse a CRS string from a WMS request (supports both SRS and CRS parameter formats).
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:4326"
    /// - "urn:ogc:def:crs:EPSG::4326"
    /// - "CRS:84" (WGS84 with lon/lat axis order)
    pub fn from_wms_string(s: &str) -> Result<Self, CrsParseError> {
        let identifier = s.trim();
        if identifier.is_empty() {
            return Err(CrsParseError::Empty);
        }

        let upper = identifier.to_uppercase();
        let epsg = if let Some(code) = upper.strip_prefix("EPSG:") {
            Some(parse_code(identifier, code)?)
        } else if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
            // urn:ogc:def:crs:EPSG:<version>:<code>, version is usually empty
            let code = rest.rsplit(':').next().unwrap_or(rest);
            Some(parse_code(identifier, code)?)
        } else if upper.starts_with("CRS:") || upper.starts_with("AUTO") {
            None
        } else {
            return Err(CrsParseError::UnsupportedCrs(identifier.to_string()));
        };

        Ok(Self {
            identifier: identifier.to_string(),
            epsg,
        })
    }

    /// The identifier exactly as it was received.
    pub fn as_str(&self) -> &str {
        &self.identifier
    }

    /// EPSG code, if the identifier is an EPSG reference.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get the axis order for this CRS in WMS 1.3.0.
    ///
    /// WMS 1.3.0 uses the "natural" axis order of the CRS:
    /// - Geographic CRS and some national grids: northing first
    /// - Everything else (including CRS:84): x, y
    pub fn axis_order_wms_1_3(&self) -> AxisOrder {
        match self.epsg {
            Some(code) if NORTHING_FIRST_EPSG_CODES.contains(&code) => AxisOrder::LatLon,
            _ => AxisOrder::XY,
        }
    }

    /// Get the axis order for WMS 1.1.x (always x, y regardless of CRS).
    pub fn axis_order_wms_1_1(&self) -> AxisOrder {
        AxisOrder::XY
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

fn parse_code(identifier: &str, code: &str) -> Result<u32, CrsParseError> {
    code.trim()
        .parse()
        .map_err(|_| CrsParseError::InvalidCode(identifier.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Empty CRS identifier")]
    Empty,

    #[error("Invalid EPSG code in CRS: {0}")]
    InvalidCode(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
