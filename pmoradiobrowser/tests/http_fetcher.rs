//! HTTP behavior of the reqwest-backed fetcher, against a local mock server

use pmoradiobrowser::{
    Error, FetchRequest, Fetcher, HttpFetcher, MirrorEndpoint, MirrorRegistry, RadioBrowserClient,
};
use serde_json::json;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(server: &MockServer, route: &str) -> FetchRequest {
    FetchRequest {
        url: Url::parse(&format!("{}{}", server.uri(), route)).unwrap(),
        virtual_host: None,
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn parses_json_body_and_sends_accept_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/countries"))
        .and(header("accept", "application/json"))
        .and(header("user-agent", "PMORadioTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "Turkey"}])))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new("PMORadioTest/1.0").unwrap();
    let value = fetcher
        .fetch_json(&request(&server, "/json/countries"))
        .await
        .unwrap();

    assert_eq!(value, json!([{"name": "Turkey"}]));
}

#[tokio::test]
async fn server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new("PMORadioTest/1.0").unwrap();
    let err = fetcher
        .fetch_json(&request(&server, "/json/countries"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ServerError { status: 503 }));
}

#[tokio::test]
async fn client_error_body_is_still_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new("PMORadioTest/1.0").unwrap();
    let value = fetcher
        .fetch_json(&request(&server, "/json/unknown"))
        .await
        .unwrap();

    assert_eq!(value["error"], "not found");
}

#[tokio::test]
async fn non_json_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captive portal</html>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new("PMORadioTest/1.0").unwrap();
    let err = fetcher
        .fetch_json(&request(&server, "/json/countries"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn virtual_host_is_sent_as_host_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("host", "de1.api.radio-browser.info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new("PMORadioTest/1.0").unwrap();
    let mut req = request(&server, "/json/countries");
    req.virtual_host = Some("de1.api.radio-browser.info".to_string());

    let value = fetcher.fetch_json(&req).await.unwrap();
    assert_eq!(value, json!([]));
}

#[tokio::test]
async fn slow_mirror_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new("PMORadioTest/1.0").unwrap();
    let mut req = request(&server, "/json/countries");
    req.timeout = Duration::from_millis(100);

    let err = fetcher.fetch_json(&req).await.unwrap_err();
    match err {
        Error::Http(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn client_fails_over_between_live_mirrors() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&broken)
        .await;

    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/bycountrycodeexact/TR"))
        .and(query_param("limit", "50"))
        .and(query_param("order", "votes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "stationuuid": "a",
                "name": "Good",
                "url_resolved": "http://stream/a.mp3",
                "bitrate": 192,
                "lastcheckok": 1
            },
            {
                "stationuuid": "b",
                "name": "Broken",
                "url_resolved": "http://stream/b.mp3",
                "bitrate": 192,
                "lastcheckok": 0
            }
        ])))
        .expect(1)
        .mount(&healthy)
        .await;

    let client = RadioBrowserClient::builder()
        .mirrors(MirrorRegistry::uniform(vec![
            MirrorEndpoint::new(format!("{}/json", broken.uri())),
            MirrorEndpoint::new(format!("{}/json", healthy.uri())),
        ]))
        .build()
        .unwrap();

    let stations = client.fetch_stations_by_country("tr", 10, 128).await.unwrap();
    assert_eq!(stations.len(), 1);
    assert_eq!(stations[0].name, "Good");

    // Served from cache: the `expect(1)` of both mocks still holds
    let again = client.fetch_stations_by_country("TR", 10, 128).await.unwrap();
    assert_eq!(again, stations);
}
