//! End-to-end aggregation against mock WMS backends.

use std::time::Duration;

use featureinfo::{
    AggregatorConfig, BackendDescriptor, CompatibilityRule, FeatureInfoAggregator, ReqwestFetcher,
    TransformHandle,
};
use test_utils::{
    assert_markup_eq, bodies, feature_info_query, params, XSL_INPUT, XSL_INPUT_HTML, XSL_OUTPUT,
    XSL_OUTPUT_HTML,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wms_common::WmsError;
use wms_protocol::{FormatFamily, WmsVersion};

// ============================================================================
// Setup
// ============================================================================

struct Transforms {
    input: TransformHandle,
    input_html: TransformHandle,
    output: TransformHandle,
    output_html: TransformHandle,
}

fn transforms() -> Transforms {
    Transforms {
        input: TransformHandle::from_stylesheet("fi_in.xsl", XSL_INPUT).unwrap(),
        input_html: TransformHandle::from_stylesheet("fi_in_html.xsl", XSL_INPUT_HTML).unwrap(),
        output: TransformHandle::from_stylesheet("fi_out.xsl", XSL_OUTPUT).unwrap(),
        output_html: TransformHandle::from_stylesheet("fi_out_html.xsl", XSL_OUTPUT_HTML).unwrap(),
    }
}

fn with_outputs(backend: BackendDescriptor, t: &Transforms) -> BackendDescriptor {
    backend
        .with_output_transform(FormatFamily::Xml, t.output.clone())
        .with_output_transform(FormatFamily::Html, t.output_html.clone())
}

/// WMS 1.3.0 backend answering XML.
fn source_a(server: &MockServer, t: &Transforms) -> BackendDescriptor {
    let backend = BackendDescriptor::new(
        "a",
        format!("{}/service_a", server.uri()),
        WmsVersion::V1_3_0,
        vec!["a_one".into()],
    )
    .with_info_format("text/xml")
    .with_input_transform(t.input.clone());
    with_outputs(backend, t)
}

/// WMS 1.1.1 backend answering XML.
fn source_b(server: &MockServer, t: &Transforms) -> BackendDescriptor {
    let backend = BackendDescriptor::new(
        "b",
        format!("{}/service_b", server.uri()),
        WmsVersion::V1_1_1,
        vec!["b_one".into()],
    )
    .with_info_format("text/xml")
    .with_input_transform(t.input.clone());
    with_outputs(backend, t)
}

/// WMS 1.1.1 backend without any transforms.
fn source_c(server: &MockServer) -> BackendDescriptor {
    BackendDescriptor::new(
        "c",
        format!("{}/service_c", server.uri()),
        WmsVersion::V1_1_1,
        vec!["c_one".into()],
    )
}

/// WMS 1.1.1 backend answering tag-soup HTML.
fn source_d(server: &MockServer, t: &Transforms) -> BackendDescriptor {
    let backend = BackendDescriptor::new(
        "d",
        format!("{}/service_d", server.uri()),
        WmsVersion::V1_1_1,
        vec!["d_one".into()],
    )
    .with_info_format("text/html")
    .with_input_transform(t.input_html.clone());
    with_outputs(backend, t)
}

fn respond(body: &str, content_type: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, content_type)
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

fn aggregator() -> FeatureInfoAggregator<ReqwestFetcher> {
    let fetcher = ReqwestFetcher::new(Duration::from_secs(5)).unwrap();
    FeatureInfoAggregator::new(fetcher, AggregatorConfig::default())
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_single_layer_wms111_client() {
    let server = MockServer::start().await;
    let t = transforms();
    Mock::given(method("GET"))
        .and(path("/service_a"))
        .and(query_param("SERVICE", "WMS"))
        .and(query_param("REQUEST", "GetFeatureInfo"))
        .and(query_param("VERSION", "1.3.0"))
        .and(query_param("LAYERS", "a_one"))
        .and(query_param("QUERY_LAYERS", "a_one"))
        .and(query_param("CRS", params::CRS))
        .and(query_param("BBOX", params::BBOX_WIRE))
        .and(query_param("WIDTH", "200"))
        .and(query_param("HEIGHT", "200"))
        .and(query_param("i", "10"))
        .and(query_param("J", "20"))
        .and(query_param("FORMAT", "image/png"))
        .and(query_param("info_format", "text/xml"))
        .respond_with(respond(bodies::XML_BAR, "text/xml"))
        .expect(1)
        .mount(&server)
        .await;

    let a = source_a(&server, &t);
    let query = feature_info_query(WmsVersion::V1_1_1, &["fi_layer"]);
    let merged = aggregator().get_feature_info(&query, &[&a]).await.unwrap();

    assert_eq!(merged.content_type, "application/vnd.ogc.gml");
    assert_markup_eq!(merged.body, "<bars><bar>Bar</bar></bars>");
}

#[tokio::test]
async fn test_single_layer_wms130_client() {
    let server = MockServer::start().await;
    let t = transforms();
    mount(&server, "/service_a", respond(bodies::XML_BAR, "text/xml")).await;

    let a = source_a(&server, &t);
    let query = feature_info_query(WmsVersion::V1_3_0, &["fi_layer"]);
    let merged = aggregator().get_feature_info(&query, &[&a]).await.unwrap();

    assert_eq!(merged.content_type, "text/xml");
    assert_markup_eq!(merged.body, "<bars><bar>Bar</bar></bars>");
}

#[tokio::test]
async fn test_multiple_layers_xml_output() {
    let server = MockServer::start().await;
    let t = transforms();
    mount(&server, "/service_a", respond(bodies::XML_BAR1, "text/xml")).await;
    Mock::given(method("GET"))
        .and(path("/service_b"))
        .and(query_param("VERSION", "1.1.1"))
        .and(query_param("SRS", params::CRS))
        .and(query_param("X", "10"))
        .and(query_param("Y", "20"))
        .and(query_param("info_format", "text/xml"))
        .respond_with(respond(bodies::XML_BAR2, "text/xml"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/service_d"))
        .and(query_param("info_format", "text/html"))
        .respond_with(respond(bodies::HTML_TAG_SOUP, "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let (a, b, d) = (source_a(&server, &t), source_b(&server, &t), source_d(&server, &t));
    let query = feature_info_query(WmsVersion::V1_1_1, &["fi_multi_layer"]);
    let merged = aggregator().get_feature_info(&query, &[&a, &b, &d]).await.unwrap();

    assert_eq!(merged.content_type, "application/vnd.ogc.gml");
    assert_markup_eq!(
        merged.body,
        "<bars><bar>Bar1</bar><bar>Bar2</bar><bar>Bar3</bar></bars>"
    );
}

#[tokio::test]
async fn test_multiple_layers_html_output() {
    let server = MockServer::start().await;
    let t = transforms();
    mount(&server, "/service_a", respond(bodies::XML_BAR1, "text/xml")).await;
    mount(&server, "/service_b", respond(bodies::XML_BAR2, "text/xml")).await;
    mount(&server, "/service_d", respond(bodies::HTML_TAG_SOUP, "text/html")).await;

    let (a, b, d) = (source_a(&server, &t), source_b(&server, &t), source_d(&server, &t));
    let query = feature_info_query(WmsVersion::V1_1_1, &["fi_multi_layer"]).with_info_format("text/html");
    let merged = aggregator().get_feature_info(&query, &[&a, &b, &d]).await.unwrap();

    assert_eq!(merged.content_type, "text/html");
    assert_markup_eq!(
        merged.body,
        "<html><body><h1>Bars</h1><p>Bar1</p><p>Bar2</p><p>Bar3</p></body></html>"
    );
}

#[tokio::test]
async fn test_mixed_layers_are_concatenated() {
    let server = MockServer::start().await;
    let t = transforms();
    mount(&server, "/service_c", respond(bodies::PLAIN_HELLO, "text/plain")).await;
    mount(&server, "/service_a", respond(bodies::XML_BAR2, "text/xml")).await;

    let (c, a) = (source_c(&server), source_a(&server, &t));
    let query = feature_info_query(WmsVersion::V1_1_1, &["fi_without_xsl_layer", "fi_layer"]);
    let merged = aggregator().get_feature_info(&query, &[&c, &a]).await.unwrap();

    assert_eq!(merged.content_type, "text/plain");
    assert_markup_eq!(merged.body, "Hello<baz><foo>Bar2</foo></baz>");

    let requests = server.received_requests().await.unwrap();
    let to_c = requests
        .iter()
        .find(|request| request.url.path() == "/service_c")
        .unwrap();
    assert!(to_c.url.query_pairs().all(|(key, _)| key != "info_format"));
}

// ============================================================================
// Ordering and failures
// ============================================================================

#[tokio::test]
async fn test_order_is_kept_when_first_backend_is_slowest() {
    let server = MockServer::start().await;
    let t = transforms();
    mount(
        &server,
        "/service_a",
        respond(bodies::XML_BAR1, "text/xml").set_delay(Duration::from_millis(300)),
    )
    .await;
    mount(&server, "/service_b", respond(bodies::XML_BAR2, "text/xml")).await;

    let (a, b) = (source_a(&server, &t), source_b(&server, &t));
    let query = feature_info_query(WmsVersion::V1_3_0, &["fi_layer", "fi_b"]);
    let merged = aggregator().get_feature_info(&query, &[&a, &b]).await.unwrap();

    assert_markup_eq!(merged.body, "<bars><bar>Bar1</bar><bar>Bar2</bar></bars>");
}

#[tokio::test]
async fn test_backend_error_status_fails_request() {
    let server = MockServer::start().await;
    let t = transforms();
    mount(&server, "/service_a", respond(bodies::XML_BAR1, "text/xml")).await;
    Mock::given(method("GET"))
        .and(path("/service_b"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (a, b) = (source_a(&server, &t), source_b(&server, &t));
    let query = feature_info_query(WmsVersion::V1_3_0, &["fi_layer", "fi_b"]);
    let err = aggregator().get_feature_info(&query, &[&a, &b]).await.unwrap_err();

    assert!(matches!(
        err,
        WmsError::BackendBadResponse { ref backend, status: 500 } if backend == "b"
    ));
    assert_eq!(err.http_status_code(), 502);
}

#[tokio::test]
async fn test_unreachable_backend_fails_request() {
    let t = transforms();
    let backend = BackendDescriptor::new(
        "gone",
        "http://127.0.0.1:9/service",
        WmsVersion::V1_3_0,
        vec!["x".into()],
    )
    .with_input_transform(t.input.clone());

    let query = feature_info_query(WmsVersion::V1_3_0, &["fi_layer"]);
    let err = aggregator().get_feature_info(&query, &[&backend]).await.unwrap_err();
    assert!(matches!(err, WmsError::BackendUnreachable { .. }));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    let t = transforms();
    Mock::given(method("GET"))
        .and(path("/service_a"))
        .respond_with(respond(bodies::XML_BAR, "text/xml").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(Duration::from_millis(200)).unwrap();
    let aggregator = FeatureInfoAggregator::new(fetcher, AggregatorConfig::default());
    let a = source_a(&server, &t);
    let query = feature_info_query(WmsVersion::V1_3_0, &["fi_layer"]);
    let err = aggregator.get_feature_info(&query, &[&a]).await.unwrap_err();

    assert!(matches!(err, WmsError::BackendTimeout { ref backend } if backend == "a"));
    assert_eq!(err.http_status_code(), 504);
}

#[tokio::test]
async fn test_unparseable_xml_fails_request() {
    let server = MockServer::start().await;
    let t = transforms();
    mount(&server, "/service_a", respond("<a><b>Bar</a>", "text/xml")).await;

    let a = source_a(&server, &t);
    let query = feature_info_query(WmsVersion::V1_3_0, &["fi_layer"]);
    let err = aggregator().get_feature_info(&query, &[&a]).await.unwrap_err();
    assert!(matches!(err, WmsError::ParseFailure { .. }));
}

#[tokio::test]
async fn test_different_output_transforms_under_family_rule() {
    let server = MockServer::start().await;
    let t = transforms();
    mount(&server, "/service_a", respond(bodies::XML_BAR1, "text/xml")).await;
    mount(&server, "/service_b", respond(bodies::XML_BAR2, "text/xml")).await;

    let other_output = TransformHandle::from_stylesheet("other_out.xsl", XSL_OUTPUT).unwrap();
    let a = source_a(&server, &t);
    let b = source_b(&server, &t).with_output_transform(FormatFamily::Xml, other_output);
    let query = feature_info_query(WmsVersion::V1_3_0, &["fi_layer", "fi_b"]);

    let fetcher = ReqwestFetcher::new(Duration::from_secs(5)).unwrap();
    let config = AggregatorConfig {
        compatibility: CompatibilityRule::FormatFamily,
        ..AggregatorConfig::default()
    };
    let merged = FeatureInfoAggregator::new(fetcher, config)
        .get_feature_info(&query, &[&a, &b])
        .await
        .unwrap();

    assert_markup_eq!(merged.body, "<bars><bar>Bar1</bar><bar>Bar2</bar></bars>");
}
