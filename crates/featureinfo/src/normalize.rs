//! Turning raw backend responses into normalized documents.

use tracing::debug;
use wms_common::{WmsError, WmsResult};
use wms_protocol::FormatFamily;

use crate::backend::BackendDescriptor;
use crate::dispatch::RawResponse;
use crate::document::NormalizedDocument;
use crate::html::parse_html;
use crate::xml::parse_xml;

/// Normalize one response from `backend`.
///
/// Without an input transform the body is passed through untouched. With
/// one, the body is parsed (strict XML, or tolerant HTML for HTML content
/// types) and transformed into a fragment.
pub fn normalize(raw: RawResponse, backend: &BackendDescriptor) -> WmsResult<NormalizedDocument> {
    let body = String::from_utf8_lossy(&raw.body).into_owned();

    let Some(transform) = &backend.input_transform else {
        return Ok(NormalizedDocument::Opaque {
            content_type: raw.content_type,
            body,
        });
    };

    let tree = match FormatFamily::from_mime(&raw.content_type) {
        FormatFamily::Html => parse_html(&body),
        _ => parse_xml(&body).map_err(|e| WmsError::ParseFailure {
            backend: raw.backend.clone(),
            message: e.to_string(),
        })?,
    };

    let fragment = transform
        .apply(&tree)
        .map_err(|e| WmsError::TransformFailure {
            transform: transform.id().to_string(),
            message: e.to_string(),
        })?;

    debug!(
        backend = %raw.backend,
        transform = transform.id(),
        items = fragment.child_elements().count(),
        "Normalized backend response"
    );
    Ok(NormalizedDocument::Fragment(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformHandle;
    use crate::xslt::XSLT_NAMESPACE;
    use bytes::Bytes;
    use wms_protocol::WmsVersion;

    fn input_transform(select: &str) -> TransformHandle {
        let source = format!(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="{}">
                 <xsl:template match="/"><baz><foo><xsl:value-of select="{}"/></foo></baz></xsl:template>
               </xsl:stylesheet>"#,
            XSLT_NAMESPACE, select
        );
        TransformHandle::from_stylesheet("fi_in.xsl", &source).unwrap()
    }

    fn raw(content_type: &str, body: &str) -> RawResponse {
        RawResponse {
            backend: "a".to_string(),
            position: 0,
            content_type: content_type.to_string(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn backend() -> BackendDescriptor {
        BackendDescriptor::new("a", "http://a/wms", WmsVersion::V1_3_0, vec!["a_one".into()])
    }

    #[test]
    fn test_without_transform_is_opaque() {
        let doc = normalize(raw("text/plain", "Hello"), &backend()).unwrap();
        assert_eq!(
            doc,
            NormalizedDocument::Opaque {
                content_type: "text/plain".to_string(),
                body: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_xml_is_transformed() {
        let backend = backend().with_input_transform(input_transform("/a/b/text()"));
        let doc = normalize(raw("text/xml", "<a><b>Bar</b></a>"), &backend).unwrap();
        assert_eq!(doc.serialize(), "<baz><foo>Bar</foo></baz>");
    }

    #[test]
    fn test_tag_soup_html_is_transformed() {
        let backend = backend().with_input_transform(input_transform("/html/body//p"));
        let doc = normalize(raw("text/html; charset=utf-8", "<body><h1>Hello<p>Bar3"), &backend).unwrap();
        assert_eq!(doc.serialize(), "<baz><foo>Bar3</foo></baz>");
    }

    #[test]
    fn test_identity_transform_round_trip() {
        let identity = format!(
            r#"<xsl:stylesheet xmlns:xsl="{}"><xsl:template match="/"><xsl:copy-of select="/"/></xsl:template></xsl:stylesheet>"#,
            XSLT_NAMESPACE
        );
        let handle = TransformHandle::from_stylesheet("identity.xsl", &identity).unwrap();
        let source = r#"<items><item id="1">Bar &amp; Baz</item><item>  spaced  </item></items>"#;

        let doc = normalize(raw("text/xml", source), &backend().with_input_transform(handle)).unwrap();
        assert_eq!(doc.serialize(), source);
        let texts: Vec<_> = doc.items().unwrap().map(|item| item.text_content()).collect();
        assert_eq!(texts, vec!["Bar & Baz".to_string(), "  spaced  ".to_string()]);
    }

    #[test]
    fn test_malformed_xml_is_a_parse_failure() {
        let backend = backend().with_input_transform(input_transform("/a/b/text()"));
        let err = normalize(raw("text/xml", "<a><b>Bar</a>"), &backend).unwrap_err();
        assert!(matches!(err, WmsError::ParseFailure { ref backend, .. } if backend == "a"));
    }

    #[test]
    fn test_transform_without_output_is_a_transform_failure() {
        let source = format!(
            r#"<xsl:stylesheet xmlns:xsl="{}"><xsl:template match="/"/></xsl:stylesheet>"#,
            XSLT_NAMESPACE
        );
        let handle = TransformHandle::from_stylesheet("empty.xsl", &source).unwrap();
        let err = normalize(raw("text/xml", "<a/>"), &backend().with_input_transform(handle)).unwrap_err();
        assert!(matches!(err, WmsError::TransformFailure { ref transform, .. } if transform == "empty.xsl"));
    }
}
