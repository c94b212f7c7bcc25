//! Integration tests for `WebhookNotifier` payloads against a mock target.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skipline_core::{AppConfig, FilterSettings, NotifyKind, APPOINTMENT_TYPES};
use skipline_notify::{
    deliver_report, Notifier, NotifyError, Transport, WebhookNotifier, HEARTBEAT_MESSAGE,
};

fn notifier(server: &MockServer, transport: Transport, heartbeat: bool) -> WebhookNotifier {
    WebhookNotifier::new(format!("{}/hook", server.uri()), transport, heartbeat, 1950, 5)
        .expect("failed to build test notifier")
}

fn app_config(notify_url: Option<&str>) -> AppConfig {
    AppConfig {
        appointment_type: APPOINTMENT_TYPES[0],
        locations_path: "locations.json".into(),
        base_url: "https://skiptheline.example".to_owned(),
        request_timeout_secs: 20,
        user_agent: "skipline-test/0.1".to_owned(),
        step_max_retries: 5,
        step_backoff_ms: 500,
        base_interval_secs: 60,
        offset_min_secs: -25,
        offset_max_secs: 25,
        early_alert: false,
        log_level: "info".to_owned(),
        filters: FilterSettings::default(),
        geocoder_url: "https://geocoder.example/search".to_owned(),
        notify_url: notify_url.map(str::to_owned),
        notify_kind: NotifyKind::Auto,
        signal_number: None,
        signal_group: None,
        heartbeat: false,
        intro_message: "Appointments found:".to_owned(),
        notify_max_len: 1950,
        notify_chunk_delay_ms: 0,
        notify_timeout_secs: 5,
    }
}

#[tokio::test]
async fn discord_posts_content_per_chunk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({ "content": "**Location: Cary**" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({ "content": "*  8/1/2025 9:00:00 AM," })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(
        format!("{}/hook", server.uri()),
        Transport::Discord,
        false,
        25,
        5,
    )
    .expect("failed to build test notifier");
    let sent = deliver_report(
        &notifier,
        Some("**Location: Cary**\n*  8/1/2025 9:00:00 AM,"),
        Duration::ZERO,
    )
    .await
    .unwrap();
    assert_eq!(sent, 2);
}

#[tokio::test]
async fn signal_posts_bridge_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({
            "number": "+15550001111",
            "message": "report",
            "recipients": ["group.abc"],
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::Signal {
        number: "+15550001111".to_owned(),
        recipients: vec!["group.abc".to_owned()],
    };
    notifier(&server, transport, false)
        .notify(Some("report"))
        .await
        .unwrap();
}

#[tokio::test]
async fn ntfy_posts_markdown_body_with_title() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("Markdown", "yes"))
        .and(header("Title", "NCDMV Appointments"))
        .and(body_string("**Location: Cary**"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let ntfy = notifier(&server, Transport::Ntfy, false);
    assert_eq!(ntfy.max_message_len(), None);
    ntfy.notify(Some("**Location: Cary**")).await.unwrap();
}

#[tokio::test]
async fn empty_run_sends_heartbeat_only_when_enabled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({ "content": HEARTBEAT_MESSAGE })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server, Transport::Discord, true)
        .notify(None)
        .await
        .unwrap();
    notifier(&server, Transport::Discord, false)
        .notify(None)
        .await
        .unwrap();
}

#[tokio::test]
async fn server_error_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = notifier(&server, Transport::Discord, false)
        .notify(Some("report"))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn from_config_without_url_is_none() {
    assert!(WebhookNotifier::from_config(&app_config(None)).unwrap().is_none());
}

#[tokio::test]
async fn from_config_picks_transport() {
    let ntfy = WebhookNotifier::from_config(&app_config(Some("https://ntfy.sh/dmv")))
        .unwrap()
        .unwrap();
    assert_eq!(ntfy.transport(), &Transport::Ntfy);

    let mut config = app_config(Some("http://bridge:8080/v2/send"));
    config.signal_number = Some("+15550001111".to_owned());
    let signal = WebhookNotifier::from_config(&config).unwrap().unwrap();
    assert_eq!(
        signal.transport(),
        &Transport::Signal {
            number: "+15550001111".to_owned(),
            recipients: vec!["+15550001111".to_owned()],
        }
    );

    let mut config = app_config(Some("http://bridge:8080/v2/send"));
    config.notify_kind = NotifyKind::Signal;
    let err = WebhookNotifier::from_config(&config).err().unwrap();
    assert!(matches!(err, NotifyError::InvalidConfig(_)));
}
