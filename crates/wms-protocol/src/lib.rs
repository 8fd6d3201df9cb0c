//! OGC WMS protocol pieces used by the featureinfo proxy.
//!
//! Supports:
//! - WMS 1.1.0, 1.1.1 and 1.3.0 GetFeatureInfo dialects
//! - Service exception reports for both dialect families

pub mod exceptions;
pub mod getfeatureinfo;
pub mod version;

pub use exceptions::ServiceExceptionReport;
pub use getfeatureinfo::{FormatFamily, GetFeatureInfoRequest, OutputFormat};
pub use version::{DialectSpec, WmsVersion};
