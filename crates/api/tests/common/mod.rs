#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use curfew_core::clock::ManualClock;
use curfew_core::memory::{MemorySessionStore, MemoryTtlStore};
use curfew_core::session::{DeviceIdentity, Session};
use curfew_core::types::EpochMillis;
use http_body_util::BodyExt;
use tower::ServiceExt;

use curfew_api::auth::password::hash_password;
use curfew_api::config::ServerConfig;
use curfew_api::router::build_app_router;
use curfew_api::state::AppState;
use curfew_api::ws::registry::WsReceiver;
use curfew_api::ws::ConnectionHandle;

/// Administrator password accepted by [`test_config`].
pub const ADMIN_PASSWORD: &str = "curfew-admin-password";

/// Start time of every [`ManualClock`] handed out here.
pub const T0: EpochMillis = 1_750_000_000_000;

/// Hashing is slow; do it once per test binary.
fn admin_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(ADMIN_PASSWORD).expect("hashing should succeed"))
        .clone()
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        keepalive_interval_secs: 60,
        admin_password_hash: Some(admin_password_hash()),
        database_url: None,
        reset_stores_on_start: false,
    }
}

/// Build application state over in-memory stores and a manual clock.
pub fn build_test_state(config: ServerConfig) -> (AppState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let state = AppState::new(
        config,
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryTtlStore::new(clock.clone())),
        clock.clone(),
    );
    (state, clock)
}

/// Build the full application router over `state`.
///
/// Uses the same builder as `main.rs` so tests exercise the production
/// middleware stack.
pub fn build_test_app(state: AppState) -> Router {
    let config = state.config.as_ref().clone();
    build_app_router(state, &config)
}

pub fn identity(device_id: &str) -> DeviceIdentity {
    DeviceIdentity {
        device_id: device_id.to_string(),
        device_name: "Phone".to_string(),
        ip_address: "1.2.3.4".to_string(),
    }
}

/// Open a session for `device_id` without a real socket.
///
/// The returned receiver sees every frame the server would write.
pub async fn connect_device(state: &AppState, device_id: &str) -> (Session, WsReceiver) {
    let (handle, rx) = ConnectionHandle::channel();
    let session = state
        .lifecycle
        .open_session(identity(device_id), handle)
        .await
        .expect("open_session should succeed");
    (session, rx)
}

pub fn bearer(password: &str) -> String {
    format!("Bearer {password}")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, auth: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(auth), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    auth: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(auth), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, auth: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(auth), None).await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
