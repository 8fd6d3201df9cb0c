//! Bounding box types and operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A bounding box as sent on the wire.
///
/// Values are kept in the caller's x/y (easting/northing) order. The proxy never
/// reprojects; it only reorders components when a backend dialect expects
/// latitude first. A box parsed from a BBOX parameter keeps the client's
/// spelling of each number so it can be forwarded unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// Components as written by the client, in field order
    #[serde(skip)]
    text: Option<[String; 4]>,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            text: None,
        }
    }

    /// Parse a WMS BBOX parameter string: "minx,miny,maxx,maxy"
    pub fn from_wms_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |part: &str| -> Result<f64, BboxParseError> {
            part.parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
        };

        Ok(Self {
            min_x: parse(parts[0])?,
            min_y: parse(parts[1])?,
            max_x: parse(parts[2])?,
            max_y: parse(parts[3])?,
            text: Some([
                parts[0].to_string(),
                parts[1].to_string(),
                parts[2].to_string(),
                parts[3].to_string(),
            ]),
        })
    }

    /// The same four values with the first and second axis exchanged.
    ///
    /// `minx,miny,maxx,maxy` becomes `miny,minx,maxy,maxx`. Used for WMS 1.3.0
    /// backends queried in a CRS with latitude/longitude axis order.
    pub fn swap_axes(&self) -> Self {
        Self {
            min_x: self.min_y,
            min_y: self.min_x,
            max_x: self.max_y,
            max_y: self.max_x,
            text: self
                .text
                .as_ref()
                .map(|[a, b, c, d]| [b.clone(), a.clone(), d.clone(), c.clone()]),
        }
    }

    /// Format as a WMS BBOX parameter value.
    pub fn to_wms_string(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.min_x == other.min_x
            && self.min_y == other.min_y
            && self.max_x == other.max_x
            && self.max_y == other.max_y
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => f.write_str(&text.join(",")),
            None => write!(
                f,
                "{},{},{},{}",
                self.min_x, self.min_y, self.max_x, self.max_y
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wms_bbox() {
        let bbox = BoundingBox::from_wms_string("-125.0,24.0,-66.0,50.0").unwrap();
        assert_eq!(bbox.min_x, -125.0);
        assert_eq!(bbox.min_y, 24.0);
        assert_eq!(bbox.max_x, -66.0);
        assert_eq!(bbox.max_y, 50.0);
    }

    #[test]
    fn test_swap_axes() {
        let bbox = BoundingBox::new(5.0, 50.0, 10.0, 55.0).swap_axes();
        assert_eq!(bbox, BoundingBox::new(50.0, 5.0, 55.0, 10.0));
    }

    #[test]
    fn test_to_wms_string() {
        let bbox = BoundingBox::new(1000.0, 400.0, 2000.5, 1400.0);
        assert_eq!(bbox.to_wms_string(), "1000,400,2000.5,1400");
    }

    #[test]
    fn test_parsed_digits_are_kept() {
        let bbox = BoundingBox::from_wms_string("1000.0, 400.00,2000,1.4e3").unwrap();
        assert_eq!(bbox, BoundingBox::new(1000.0, 400.0, 2000.0, 1400.0));
        assert_eq!(bbox.to_wms_string(), "1000.0,400.00,2000,1.4e3");
        assert_eq!(bbox.swap_axes().to_wms_string(), "400.00,1000.0,1.4e3,2000");
    }
}
