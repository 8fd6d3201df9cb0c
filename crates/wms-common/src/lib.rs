//! Common types and utilities shared across the featureinfo proxy crates.

pub mod bbox;
pub mod crs;
pub mod error;

pub use bbox::BoundingBox;
pub use crs::{AxisOrder, Crs};
pub use error::{WmsError, WmsResult};
