//! Output format negotiation.

use wms_common::{WmsError, WmsResult};
use wms_protocol::{GetFeatureInfoRequest, OutputFormat};

use crate::backend::BackendDescriptor;

/// Resolve the format of the merged response.
///
/// An explicit INFO_FORMAT wins, provided at least one contributing backend
/// can produce it. Otherwise the default of the client's protocol version is
/// used; individual backend dialects play no part.
pub fn resolve(
    query: &GetFeatureInfoRequest,
    backends: &[&BackendDescriptor],
) -> WmsResult<OutputFormat> {
    let Some(requested) = query.info_format.as_deref() else {
        return Ok(OutputFormat::from_mime(query.version.dialect().default_info_format));
    };

    let format = OutputFormat::from_mime(requested);
    if format.mime().is_empty() {
        return Err(WmsError::InvalidParameter {
            param: "INFO_FORMAT".to_string(),
            message: "empty value".to_string(),
        });
    }
    if !backends.is_empty() && !backends.iter().any(|backend| backend.can_produce(&format)) {
        return Err(WmsError::UnsupportedFormat(format.mime().to_string()));
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_common::{BoundingBox, Crs};
    use wms_protocol::{FormatFamily, WmsVersion};

    fn query(version: WmsVersion) -> GetFeatureInfoRequest {
        GetFeatureInfoRequest::new(
            version,
            vec!["fi_layer".into()],
            Crs::from_wms_string("EPSG:900913").unwrap(),
            BoundingBox::new(1000.0, 400.0, 2000.0, 1400.0),
            (200, 200),
            (10, 20),
        )
    }

    fn restricted(formats: &[&str]) -> BackendDescriptor {
        BackendDescriptor::new("a", "http://a/wms", WmsVersion::V1_3_0, vec![])
            .with_supported_formats(formats.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn test_client_dialect_default() {
        let backend = restricted(&[]);
        let v111 = resolve(&query(WmsVersion::V1_1_1), &[&backend]).unwrap();
        assert_eq!(v111.mime(), "application/vnd.ogc.gml");
        assert_eq!(v111.family(), FormatFamily::Xml);

        let v130 = resolve(&query(WmsVersion::V1_3_0), &[&backend]).unwrap();
        assert_eq!(v130.mime(), "text/xml");
    }

    #[test]
    fn test_explicit_format_wins() {
        let backend = restricted(&["text/html"]);
        let format = resolve(&query(WmsVersion::V1_1_1).with_info_format("text/html"), &[&backend]).unwrap();
        assert_eq!(format.mime(), "text/html");
        assert_eq!(format.family(), FormatFamily::Html);
    }

    #[test]
    fn test_format_nobody_can_produce() {
        let a = restricted(&["text/xml"]);
        let b = restricted(&["text/plain"]);
        let err = resolve(&query(WmsVersion::V1_3_0).with_info_format("application/json"), &[&a, &b])
            .unwrap_err();
        assert!(matches!(err, WmsError::UnsupportedFormat(ref f) if f == "application/json"));
        assert_eq!(err.wms_exception_code(), "InvalidFormat");
    }
}
