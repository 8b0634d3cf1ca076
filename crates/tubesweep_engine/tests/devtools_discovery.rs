use std::time::Duration;

use pretty_assertions::assert_eq;
use tubesweep_engine::{DevtoolsClient, DevtoolsSettings, DiscoveryError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer) -> DevtoolsSettings {
    let address = server.address();
    DevtoolsSettings {
        host: address.ip().to_string(),
        port: address.port(),
        ..DevtoolsSettings::default()
    }
}

#[tokio::test]
async fn version_exposes_the_websocket_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{
                "Browser": "Chrome/126.0.6478.126",
                "Protocol-Version": "1.3",
                "User-Agent": "Mozilla/5.0",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
            }"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = DevtoolsClient::new(settings_for(&server));
    let version = client.version().await.expect("version");

    assert_eq!(version.browser, "Chrome/126.0.6478.126");
    assert_eq!(version.protocol_version, "1.3");
    assert_eq!(version.ws_url, "ws://127.0.0.1:9222/devtools/browser/abc");
}

#[tokio::test]
async fn pages_keep_browser_order_and_skip_other_targets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[
                {"id": "W1", "type": "service_worker", "title": "sw", "url": "https://x/sw.js"},
                {"id": "P1", "type": "page", "title": "History", "url": "https://www.youtube.com/feed/history",
                 "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/P1"},
                {"id": "P2", "type": "page", "title": "New Tab", "url": "chrome://newtab/"}
            ]"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = DevtoolsClient::new(settings_for(&server));
    let pages = client.pages().await.expect("pages");

    let ids: Vec<_> = pages.iter().map(|page| page.id.as_str()).collect();
    assert_eq!(ids, vec!["P1", "P2"]);
    assert_eq!(
        pages[0].ws_url.as_deref(),
        Some("ws://127.0.0.1:9222/devtools/page/P1")
    );
    assert_eq!(pages[1].ws_url, None);
}

#[tokio::test]
async fn http_errors_are_reported_with_their_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = DevtoolsClient::new(settings_for(&server));
    let err = client.version().await.unwrap_err();

    assert_eq!(err, DiscoveryError::HttpStatus(500));
}

#[tokio::test]
async fn malformed_answers_are_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>not json</html>", "text/html"))
        .mount(&server)
        .await;

    let client = DevtoolsClient::new(settings_for(&server));
    let err = client.version().await.unwrap_err();

    assert!(matches!(err, DiscoveryError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn slow_endpoints_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{}", "application/json")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = DevtoolsClient::new(DevtoolsSettings {
        request_timeout: Duration::from_millis(100),
        ..settings_for(&server)
    });
    let err = client.version().await.unwrap_err();

    assert_eq!(err, DiscoveryError::Timeout);
}
