//! Health probe behavior against a mocked status service.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use livemea::config::{CaptureConfig, SourceId};
use livemea::error::MeaError;
use livemea::probe::HealthProbe;

async fn probe_against(server: &MockServer) -> HealthProbe {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig::new(dir.path().join("c.h5"), 1, SourceId::new(0).unwrap())
        .unwrap()
        .with_base_url(server.uri())
        .unwrap();
    HealthProbe::new(&config)
}

#[tokio::test]
async fn live_service_reports_full_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(200).set_body_string("LiveMEA service v2"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/islive"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/defaultmea"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!(["x", "MEA-7", 3])),
        )
        .mount(&server)
        .await;

    let status = probe_against(&server).await.check().await.unwrap();
    assert_eq!(status.banner, "LiveMEA service v2");
    assert!(status.live);
    assert_eq!(status.default_source.as_deref(), Some("MEA-7"));
}

#[tokio::test]
async fn offline_service_is_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(200).set_body_string("LiveMEA service v2"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/islive"))
        .respond_with(ResponseTemplate::new(200).set_body_string("false"))
        .mount(&server)
        .await;
    // /defaultmea must never be queried once the service reports offline.

    let err = probe_against(&server).await.check().await.unwrap_err();
    assert!(matches!(err, MeaError::ServiceUnavailable(_)));
    assert!(err.to_string().contains("Offline"));
}

#[tokio::test]
async fn http_failure_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = probe_against(&server).await.check().await.unwrap_err();
    assert!(matches!(err, MeaError::Transport(_)));
}

#[tokio::test]
async fn json_liveness_flag_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!("banner")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/islive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(true)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/defaultmea"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let status = probe_against(&server).await.check().await.unwrap();
    assert!(status.live);
    assert!(status.default_source.is_none());
}
