use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use hermes_client::{
    CaptureOptions, Client, DropReason, RawException, SendOutcome, ViewError, obfuscate_username,
};
use hermes_config::{Options, TransportCapabilities};
use parking_lot::Mutex;
use serde_json::{Value, json};
use similar_asserts::assert_eq;

struct Received {
    headers: HeaderMap,
    body: Value,
}

/// A collector that records requests and replies with queued statuses, then 200.
#[derive(Clone, Default)]
struct Collector {
    reports: Arc<Mutex<Vec<Received>>>,
    views: Arc<Mutex<Vec<Received>>>,
    replies: Arc<Mutex<VecDeque<(u16, Option<&'static str>)>>>,
}

impl Collector {
    fn reply(&self, status: u16, retry_after: Option<&'static str>) {
        self.replies.lock().push_back((status, retry_after));
    }

    fn report_count(&self) -> usize {
        self.reports.lock().len()
    }
}

async fn handle_report(
    State(collector): State<Collector>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    collector.reports.lock().push(Received { headers, body });

    let (status, retry_after) = collector.replies.lock().pop_front().unwrap_or((200, None));
    let mut response = StatusCode::from_u16(status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response();
    if let Some(retry_after) = retry_after {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from_static(retry_after));
    }
    response
}

async fn handle_view(
    State(collector): State<Collector>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    let body = query
        .get("data")
        .and_then(|data| data_encoding::BASE64.decode(data.as_bytes()).ok())
        .and_then(|json| serde_json::from_slice(&json).ok())
        .unwrap_or(Value::Null);

    collector.views.lock().push(Received { headers, body });
    StatusCode::OK
}

async fn start_collector() -> (Collector, String) {
    hermes_log::init_test!();

    let collector = Collector::default();
    let app = Router::new()
        .route("/api/stat/error/report", post(handle_report))
        .route("/hermuz", get(handle_view))
        .with_state(collector.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    (collector, format!("http://{addr}"))
}

fn client(server: String, transport: TransportCapabilities) -> Client {
    let client = Client::new(Options {
        server,
        transport,
        ..Default::default()
    });
    client.set_username(Some("jane"));
    client
}

fn xhr_only() -> TransportCapabilities {
    TransportCapabilities {
        fetch: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetch_delivers_event() {
    let (collector, server) = start_collector().await;
    let client = client(server, TransportCapabilities::default());
    collector.reply(204, None);

    let outcome = client
        .capture_exception(
            RawException::new("TypeError", "x is undefined"),
            CaptureOptions::default().with_tag("route", "/checkout"),
        )
        .await;
    assert!(outcome.is_sent());

    let reports = collector.reports.lock();
    let report = &reports[0];
    assert_eq!(
        report.headers["content-type"],
        "application/json;charset=UTF-8"
    );
    assert_eq!(
        report.headers["x-requested-user"],
        obfuscate_username(Some("jane")).as_str()
    );

    let body = &report.body;
    assert_eq!(body["type"], "TypeError");
    assert_eq!(body["message"], "x is undefined");
    assert_eq!(body["username"], "jane");
    assert_eq!(body["logger"], "rust");
    assert_eq!(body["tags"], json!({"route": "/checkout"}));
    assert_eq!(body["exception"]["values"][0]["value"], "x is undefined");
    assert_eq!(
        body["event_id"].as_str().map(str::len),
        Some(32),
        "event id is a simple uuid"
    );
}

#[tokio::test]
async fn test_xhr_rejects_no_content() {
    let (collector, server) = start_collector().await;
    let client = client(server, xhr_only());
    collector.reply(204, None);

    let outcome = client
        .capture_message("boom", CaptureOptions::default())
        .await;
    assert!(matches!(outcome, SendOutcome::Failed(_)));

    let outcome = client
        .capture_message("boom", CaptureOptions::default())
        .await;
    assert!(outcome.is_sent());
    assert_eq!(collector.report_count(), 2);
}

#[tokio::test]
async fn test_throttled_by_collector() {
    let (collector, server) = start_collector().await;
    let client = client(server, TransportCapabilities::default());
    collector.reply(429, Some("60"));

    let throttled = client
        .capture_message("first", CaptureOptions::default())
        .await;
    let dropped = client
        .capture_message("second", CaptureOptions::default())
        .await;

    assert!(matches!(throttled, SendOutcome::Failed(_)));
    assert_eq!(dropped, SendOutcome::Dropped(DropReason::BackedOff));
    assert_eq!(collector.report_count(), 1);

    client.set_username(Some("john"));
    let resumed = client
        .capture_message("third", CaptureOptions::default())
        .await;
    assert!(resumed.is_sent());
}

#[tokio::test]
async fn test_server_error_does_not_back_off() {
    let (collector, server) = start_collector().await;
    let client = client(server, TransportCapabilities::default());
    collector.reply(500, None);

    let failed = client
        .capture_message("first", CaptureOptions::default())
        .await;
    let sent = client
        .capture_message("second", CaptureOptions::default())
        .await;

    assert!(matches!(failed, SendOutcome::Failed(_)));
    assert!(sent.is_sent());
}

#[tokio::test]
async fn test_legacy_transport_omits_headers() {
    let (collector, server) = start_collector().await;
    let client = client(
        server,
        TransportCapabilities {
            fetch: false,
            xhr: false,
            cors: false,
            cross_domain_request: true,
            page_scheme: "http".to_owned(),
        },
    );

    let outcome = client
        .capture_message("boom", CaptureOptions::default())
        .await;
    assert!(outcome.is_sent());

    let reports = collector.reports.lock();
    assert!(!reports[0].headers.contains_key("x-requested-user"));
    assert_eq!(reports[0].body["message"], "boom");
}

#[tokio::test]
async fn test_no_transport_available() {
    let (collector, server) = start_collector().await;
    let client = client(
        server,
        TransportCapabilities {
            fetch: false,
            xhr: false,
            cors: false,
            cross_domain_request: false,
            page_scheme: "https".to_owned(),
        },
    );

    let outcome = client
        .capture_message("boom", CaptureOptions::default())
        .await;
    assert_eq!(outcome, SendOutcome::Dropped(DropReason::NoTransport));
    assert_eq!(collector.report_count(), 0);
}

#[tokio::test]
async fn test_report_page_view() {
    let (collector, server) = start_collector().await;
    let client = client(server, TransportCapabilities::default());

    client
        .report_page_view("/home", Duration::from_millis(1500))
        .await
        .unwrap();
    client
        .report_url_view(&json!({"event": "_click", "target": "buy"}))
        .await
        .unwrap();

    let views = collector.views.lock();
    assert_eq!(views.len(), 2);
    assert_eq!(
        views[0].body,
        json!({"event": "_page", "duration": 1500, "tag": "/home"})
    );
    assert_eq!(
        views[0].headers["x-requested-user"],
        obfuscate_username(Some("jane")).as_str()
    );
    assert_eq!(views[1].body, json!({"event": "_click", "target": "buy"}));
}

#[tokio::test]
async fn test_page_view_disabled() {
    let (collector, server) = start_collector().await;
    let client = Client::new(Options {
        server,
        pv: false,
        ..Default::default()
    });

    let result = client
        .report_page_view("/home", Duration::from_secs(1))
        .await;
    assert!(matches!(result, Err(ViewError::Disabled)));
    assert!(collector.views.lock().is_empty());
}
