//! WMS service exception reports.

use quick_xml::escape::escape;
use wms_common::WmsError;

use crate::version::WmsVersion;

/// A ServiceExceptionReport in the flavour of a given WMS version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceExceptionReport {
    pub version: WmsVersion,
    pub code: String,
    pub message: String,
}

impl ServiceExceptionReport {
    pub fn new(version: WmsVersion, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            version,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a report for an error, using its OGC exception code.
    pub fn from_error(version: WmsVersion, err: &WmsError) -> Self {
        Self::new(version, err.wms_exception_code(), err.to_string())
    }

    pub fn content_type(&self) -> &'static str {
        self.version.exception_content_type()
    }

    /// Serialize the report as XML.
    pub fn to_xml(&self) -> String {
        let root_attrs = match self.version {
            WmsVersion::V1_3_0 => {
                r#"version="1.3.0" xmlns="http://www.opengis.net/ogc""#.to_string()
            }
            other => format!(r#"version="{}""#, other),
        };
        format!(
            r#"<?xml version="1.0"?><ServiceExceptionReport {}><ServiceException code="{}">{}</ServiceException></ServiceExceptionReport>"#,
            root_attrs,
            escape(self.code.as_str()),
            escape(self.message.as_str())
        )
    }
}
