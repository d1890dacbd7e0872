//! Webhook delivery tests against a local mock endpoint
#![cfg(feature = "webhook")]

use sinklog::config::{DiscordConfig, SlackConfig};
use sinklog::sink::WebhookSink;
use sinklog::{Level, LogRecord, LoggerHandle, RecordSink, Sink, SourceLocation};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(level: Level, message: &str) -> LogRecord {
    LogRecord::new(level, message, SourceLocation::new("jobs/*sync*.rs", "sync_job", 77))
}

async fn close(sink: WebhookSink) -> bool {
    tokio::task::spawn_blocking(move || sink.close(Duration::from_secs(10)))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_discord_payload_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/discord"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookSink::discord(&DiscordConfig {
        alert_level: Level::Warning,
        webhook_url: format!("{}/discord", server.uri()),
        username: "alerts".to_string(),
        avatar_url: String::new(),
    })
    .unwrap();
    sink.emit(&record(Level::Error, "sync failed")).unwrap();
    assert!(close(sink).await);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["username"], "alerts");
    assert!(body.get("avatar_url").is_none());
    let embed = &body["embeds"][0];
    assert_eq!(embed["title"], "ERROR");
    assert_eq!(
        embed["description"],
        "@ jobs/\\*sync\\*.rs \\- sync\\_job : 77\n```\nsync failed```"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slack_payload_not_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let sink = WebhookSink::slack(&SlackConfig {
        alert_level: Level::Warning,
        webhook_url: format!("{}/services/T000/B000", server.uri()),
        service_name: "scheduler".to_string(),
    })
    .unwrap();
    sink.emit(&record(Level::Warning, "*bold*")).unwrap();
    assert!(close(sink).await);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    let blocks = &body["attachments"][0]["blocks"];
    assert_eq!(blocks[0]["text"]["text"], "🟠WARNING - scheduler");
    assert_eq!(
        blocks[1]["text"]["text"],
        "@ `jobs/*sync*.rs - sync_job : 77`\n```\n*bold*\n```"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_error_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let sink = WebhookSink::discord(&DiscordConfig {
        webhook_url: format!("{}/hook", server.uri()),
        ..DiscordConfig::default()
    })
    .unwrap();
    assert!(sink.emit(&record(Level::Critical, "first")).is_ok());
    assert!(sink.emit(&record(Level::Critical, "second")).is_ok());
    assert!(close(sink).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_emit_does_not_wait_for_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let sink = WebhookSink::discord(&DiscordConfig {
        webhook_url: format!("{}/slow", server.uri()),
        ..DiscordConfig::default()
    })
    .unwrap();
    let logger = LoggerHandle::from_sinks([(Level::Warning, Sink::Webhook(sink))]);

    let started = Instant::now();
    for i in 0..5 {
        logger.error(SourceLocation::new("a.rs", "f", 1), format!("alert {i}"));
    }
    assert!(started.elapsed() < Duration::from_millis(400));

    let finished = tokio::task::spawn_blocking(move || logger.shutdown(Duration::from_secs(10)))
        .await
        .unwrap();
    assert!(finished);
    assert_eq!(server.received_requests().await.unwrap().len(), 5);
}

#[test]
fn test_unreachable_endpoint_does_not_fail_emit() {
    let sink = WebhookSink::slack(&SlackConfig {
        webhook_url: "http://127.0.0.1:1/hook".to_string(),
        ..SlackConfig::default()
    })
    .unwrap();
    assert!(sink.emit(&record(Level::Error, "nobody listening")).is_ok());
    assert!(sink.close(Duration::from_secs(10)));
}
