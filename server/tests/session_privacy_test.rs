//! Privacy tests for session tokens in logs.
//!
//! Session tokens are bearer credentials: whoever holds one holds that
//! visitor's lists. No token may appear in log output, even at TRACE level.
//!
//! # Test Approach
//!
//! 1. Use a custom tracing subscriber Layer to capture all log messages
//! 2. Exercise session store and HTTP code paths
//! 3. Verify that tokens do NOT appear in captured logs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use todos_server::config::Config;
use todos_server::routes::{create_router, AppState, SESSION_COOKIE};
use todos_server::session::{SessionStore, SessionStoreConfig};
use todos_server::store::Session;

// ============================================================================
// Log Capture Infrastructure
// ============================================================================

/// A buffer for capturing log output during tests.
#[derive(Clone, Default)]
struct LogCapture {
    logs: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    fn get_logs(&self) -> String {
        self.logs.lock().unwrap().join("\n")
    }
}

/// A tracing Layer that captures log events for inspection.
struct CaptureLayer {
    capture: LogCapture,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = StringVisitor::default();
        event.record(&mut visitor);

        let message = format!(
            "[{}] {}: {}",
            event.metadata().level(),
            event.metadata().target(),
            visitor.parts.join(" ")
        );

        self.capture.logs.lock().unwrap().push(message);
    }
}

/// A visitor that collects all event fields into strings.
#[derive(Default)]
struct StringVisitor {
    parts: Vec<String>,
}

impl tracing::field::Visit for StringVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.parts.push(format!("{}={:?}", field.name(), value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.parts.push(format!("{}={}", field.name(), value));
    }
}

fn capturing_subscriber() -> (LogCapture, impl Subscriber + Send + Sync) {
    let capture = LogCapture::default();
    let layer = CaptureLayer {
        capture: capture.clone(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(layer.with_filter(tracing_subscriber::filter::LevelFilter::TRACE));
    (capture, subscriber)
}

/// Runs a test closure with log capture at TRACE level.
fn with_log_capture<F>(test_fn: F) -> String
where
    F: FnOnce(),
{
    let (capture, subscriber) = capturing_subscriber();
    tracing::subscriber::with_default(subscriber, test_fn);
    capture.get_logs()
}

/// Async version of with_log_capture for async tests.
async fn with_log_capture_async<F, Fut>(test_fn: F) -> String
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let (capture, subscriber) = capturing_subscriber();
    let _guard = tracing::subscriber::set_default(subscriber);
    test_fn().await;
    capture.get_logs()
}

/// Asserts that the given token does not appear in the logs.
fn assert_token_not_in_logs(logs: &str, token: &str, context: &str) {
    assert!(
        !logs.contains(token),
        "Session token found in logs during {context}!\nToken: {token}\nLogs:\n{logs}"
    );
}

fn short_lived_store(max_capacity: usize) -> SessionStore {
    SessionStore::new(SessionStoreConfig::new(
        max_capacity,
        Duration::from_millis(20),
    ))
}

// ============================================================================
// Store Paths
// ============================================================================

#[test]
fn session_token_not_logged_on_store_and_load() {
    let store = SessionStore::default();
    let token = SessionStore::generate_token();
    assert_eq!(token.len(), 43);

    let logs = with_log_capture(|| {
        let mut session = Session::new();
        session.create_list("Groceries").unwrap();
        store.set(&token, session).unwrap();
        assert!(store.get(&token).is_some());
        assert!(store.get("not-a-real-token").is_none());
    });

    assert!(!logs.is_empty(), "expected some trace output");
    assert_token_not_in_logs(&logs, &token, "store and load");
}

#[test]
fn session_token_not_logged_on_expiry() {
    let store = short_lived_store(10);
    let token = SessionStore::generate_token();
    let other = SessionStore::generate_token();
    store.set(&token, Session::new()).unwrap();
    store.set(&other, Session::new()).unwrap();
    std::thread::sleep(Duration::from_millis(50));

    let logs = with_log_capture(|| {
        assert!(store.get(&token).is_none());
        assert_eq!(store.cleanup_expired(), 1);
    });

    assert_token_not_in_logs(&logs, &token, "lazy expiry");
    assert_token_not_in_logs(&logs, &other, "cleanup sweep");
}

#[test]
fn capacity_warnings_do_not_leak_tokens() {
    let store = SessionStore::new(SessionStoreConfig::new(1, Duration::from_secs(300)));
    let existing = SessionStore::generate_token();
    let rejected = SessionStore::generate_token();
    store.set(&existing, Session::new()).unwrap();

    let logs = with_log_capture(|| {
        assert!(store.set(&rejected, Session::new()).is_err());
    });

    assert!(logs.contains("capacity"), "expected a capacity warning");
    assert_token_not_in_logs(&logs, &existing, "capacity warning");
    assert_token_not_in_logs(&logs, &rejected, "capacity warning");
}

#[test]
fn session_store_debug_does_not_leak_tokens() {
    let store = SessionStore::default();
    let token = SessionStore::generate_token();
    store.set(&token, Session::new()).unwrap();

    let debug_output = format!("{store:?}");
    assert!(
        !debug_output.contains(&token),
        "Session token found in Debug output!\nToken: {token}\nDebug: {debug_output}"
    );
}

// ============================================================================
// HTTP Paths
// ============================================================================

#[tokio::test]
async fn http_flow_does_not_leak_tokens() {
    let state = AppState::new(Config::default());
    let issued = Arc::new(Mutex::new(String::new()));

    let logs = with_log_capture_async(|| {
        let state = state.clone();
        let issued = Arc::clone(&issued);
        async move {
            let app = create_router(state);

            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/lists")
                        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(Body::from("list_name=Groceries"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            let set_cookie = response
                .headers()
                .get(header::SET_COOKIE)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string();
            let cookie = set_cookie.split(';').next().unwrap().to_string();
            *issued.lock().unwrap() = cookie
                .strip_prefix(&format!("{SESSION_COOKIE}="))
                .unwrap()
                .to_string();

            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/lists")
                        .header(header::COOKIE, &cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/lists/7")
                        .header(header::COOKIE, &cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }
    })
    .await;

    let token = issued.lock().unwrap().clone();
    assert_eq!(token.len(), 43);
    assert_token_not_in_logs(&logs, &token, "HTTP flow");
}

#[tokio::test]
async fn unknown_cookie_is_not_logged() {
    let state = AppState::new(Config::default());
    let stale = SessionStore::generate_token();

    let logs = with_log_capture_async(|| {
        let state = state.clone();
        let cookie = format!("{SESSION_COOKIE}={stale}");
        async move {
            let response = create_router(state)
                .oneshot(
                    Request::builder()
                        .uri("/lists")
                        .header(header::COOKIE, cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(header::SET_COOKIE).is_none());
        }
    })
    .await;

    assert_token_not_in_logs(&logs, &stale, "unknown cookie");
}
