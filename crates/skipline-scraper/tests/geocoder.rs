//! Integration tests for `NominatimGeocoder` against a mock search endpoint.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skipline_scraper::{GeocodeError, Geocoder, NominatimGeocoder};

fn geocoder(server: &MockServer) -> NominatimGeocoder {
    NominatimGeocoder::new(&format!("{}/search", server.uri()), "skipline-test/0.1", 5)
        .expect("failed to build test geocoder")
}

#[tokio::test]
async fn geocode_returns_first_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "1 Main St, Raleigh NC"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "35.7796", "lon": "-78.6382", "display_name": "Raleigh"},
            {"lat": "0", "lon": "0", "display_name": "ignored"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let point = geocoder(&server).geocode("1 Main St, Raleigh NC").await.unwrap();
    assert!((point.lat - 35.7796).abs() < 1e-9);
    assert!((point.lon + 78.6382).abs() < 1e-9);
}

#[tokio::test]
async fn geocode_empty_result_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = geocoder(&server).geocode("nowhere").await;
    assert!(
        matches!(result, Err(GeocodeError::NotFound { ref address }) if address == "nowhere"),
        "expected NotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn geocode_rejects_unparseable_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"lat": "north", "lon": "-78.6"}])),
        )
        .mount(&server)
        .await;

    let result = geocoder(&server).geocode("somewhere").await;
    assert!(matches!(result, Err(GeocodeError::InvalidCoordinates { .. })));
}

#[tokio::test]
async fn geocode_http_error_status_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = geocoder(&server).geocode("somewhere").await;
    assert!(matches!(result, Err(GeocodeError::Http(_))));
}
