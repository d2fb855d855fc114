//! HTTP-level integration tests for the administrative API.
//!
//! Devices are attached through the lifecycle manager with an in-memory
//! channel in place of a socket, so pushed frames can be read back.

mod common;

use axum::extract::ws::Message;
use axum::http::StatusCode;
use common::{
    bearer, body_json, build_test_app, build_test_state, connect_device, delete_auth, get,
    get_auth, post_json, post_json_auth, test_config, ADMIN_PASSWORD,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_authorization_is_401() {
    let (state, _) = build_test_state(test_config());
    let response = get(build_test_app(state), "/api/v1/sessions").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn wrong_password_is_401() {
    let (state, _) = build_test_state(test_config());
    let response = get_auth(build_test_app(state), "/api/v1/sessions", "Bearer nope").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_without_authorization_is_401() {
    let (state, _) = build_test_state(test_config());
    let body = json!({ "deviceId": "D1", "seconds": 60 });
    let response = post_json(build_test_app(state), "/api/v1/access/generate-code", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bare_and_bearer_passwords_are_accepted() {
    let (state, _) = build_test_state(test_config());

    let response = get_auth(
        build_test_app(state.clone()),
        "/api/v1/sessions",
        &bearer(ADMIN_PASSWORD),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(build_test_app(state), "/api/v1/sessions", ADMIN_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unconfigured_admin_password_rejects_everything() {
    let mut config = test_config();
    config.admin_password_hash = None;
    let (state, _) = build_test_state(config);

    let response = get_auth(
        build_test_app(state),
        "/api/v1/sessions",
        &bearer(ADMIN_PASSWORD),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Grant codes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_code_for_live_device() {
    let (state, _) = build_test_state(test_config());
    let (session, _rx) = connect_device(&state, "D1").await;

    let body = json!({ "deviceId": "D1", "seconds": 60 });
    let response = post_json_auth(
        build_test_app(state.clone()),
        "/api/v1/access/generate-code",
        &bearer(ADMIN_PASSWORD),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let code = json["data"]["code"].as_str().expect("code should be a string");
    assert_eq!(code.len(), 6);

    let remaining = state
        .ledger
        .verify_grant_code(&session.id, code)
        .await
        .unwrap();
    assert_eq!(remaining, Some(60));
}

#[tokio::test]
async fn generate_code_for_unknown_device_is_404() {
    let (state, _) = build_test_state(test_config());

    let body = json!({ "deviceId": "ghost", "seconds": 60 });
    let response = post_json_auth(
        build_test_app(state),
        "/api/v1/access/generate-code",
        &bearer(ADMIN_PASSWORD),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn non_positive_seconds_is_400() {
    let (state, _) = build_test_state(test_config());
    let (_session, _rx) = connect_device(&state, "D1").await;

    for seconds in [0, -30] {
        let body = json!({ "deviceId": "D1", "seconds": seconds });
        let response = post_json_auth(
            build_test_app(state.clone()),
            "/api/v1/access/generate-code",
            &bearer(ADMIN_PASSWORD),
            body,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn empty_device_id_is_400() {
    let (state, _) = build_test_state(test_config());

    let body = json!({ "deviceId": "  ", "seconds": 60 });
    let response = post_json_auth(
        build_test_app(state),
        "/api/v1/access/block",
        &bearer(ADMIN_PASSWORD),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Direct grants and blocks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn grant_pushes_granted_frame() {
    let (state, _) = build_test_state(test_config());
    let (_session, mut rx) = connect_device(&state, "D1").await;

    let body = json!({ "deviceId": "D1", "seconds": 120 });
    let response = post_json_auth(
        build_test_app(state),
        "/api/v1/access/grant",
        &bearer(ADMIN_PASSWORD),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["seconds"], 120);

    let msg = rx.try_recv().expect("device should receive a frame");
    assert!(matches!(&msg, Message::Text(t) if *t == "GRANTED:120"));
}

#[tokio::test]
async fn block_records_window_and_pushes_frame() {
    let (state, clock) = build_test_state(test_config());
    let (_session, mut rx) = connect_device(&state, "D1").await;

    let body = json!({ "deviceId": "D1", "seconds": 30 });
    let response = post_json_auth(
        build_test_app(state.clone()),
        "/api/v1/access/block",
        &bearer(ADMIN_PASSWORD),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["seconds"], 30);

    let msg = rx.try_recv().expect("device should receive a frame");
    assert!(matches!(&msg, Message::Text(t) if *t == "BLOCK:30"));

    let response = get_auth(
        build_test_app(state.clone()),
        "/api/v1/access/block-time/D1",
        &bearer(ADMIN_PASSWORD),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["remainingSeconds"], 30);

    clock.advance(10_000);
    let response = get_auth(
        build_test_app(state.clone()),
        "/api/v1/access/block-time/D1",
        &bearer(ADMIN_PASSWORD),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["remainingSeconds"], 20);

    clock.advance(20_000);
    let response = get_auth(
        build_test_app(state),
        "/api/v1/access/block-time/D1",
        &bearer(ADMIN_PASSWORD),
    )
    .await;
    assert!(body_json(response).await["data"]["remainingSeconds"].is_null());
}

#[tokio::test]
async fn block_unknown_device_is_404_and_writes_nothing() {
    let (state, _) = build_test_state(test_config());

    let body = json!({ "deviceId": "ghost", "seconds": 30 });
    let response = post_json_auth(
        build_test_app(state.clone()),
        "/api/v1/access/block",
        &bearer(ADMIN_PASSWORD),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let remaining = state.ledger.remaining_block_time("ghost").await.unwrap();
    assert_eq!(remaining, None);
}

#[tokio::test]
async fn oversized_block_is_400_and_writes_nothing() {
    let (state, _) = build_test_state(test_config());
    let (_session, mut rx) = connect_device(&state, "D1").await;

    let body = json!({ "deviceId": "D1", "seconds": 10_000_000_000_000_000_i64 });
    let response = post_json_auth(
        build_test_app(state.clone()),
        "/api/v1/access/block",
        &bearer(ADMIN_PASSWORD),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(state.ledger.remaining_block_time("D1").await.unwrap(), None);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn block_time_for_unblocked_device_is_null() {
    let (state, _) = build_test_state(test_config());

    let response = get_auth(
        build_test_app(state),
        "/api/v1/access/block-time/D9",
        &bearer(ADMIN_PASSWORD),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["remainingSeconds"].is_null());
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_sessions_newest_first() {
    let (state, clock) = build_test_state(test_config());
    let (first, _rx1) = connect_device(&state, "D1").await;
    clock.advance(1_000);
    let (second, _rx2) = connect_device(&state, "D2").await;

    let response = get_auth(
        build_test_app(state),
        "/api/v1/sessions",
        &bearer(ADMIN_PASSWORD),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = json["data"].as_array().expect("data should be an array");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], second.id.as_str());
    assert_eq!(data[0]["deviceId"], "D2");
    assert_eq!(data[1]["id"], first.id.as_str());
    assert!(data[1]["lastActive"].is_null());
}

#[tokio::test]
async fn delete_session_closes_connection() {
    let (state, _) = build_test_state(test_config());
    let (session, mut rx) = connect_device(&state, "D1").await;

    let response = delete_auth(
        build_test_app(state.clone()),
        &format!("/api/v1/sessions/{}", session.id),
        &bearer(ADMIN_PASSWORD),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let msg = rx.recv().await.expect("device should receive Close");
    assert!(matches!(msg, Message::Close(None)));
    assert!(!state.registry.is_open(&session.id));
    assert!(state.control.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_unknown_session_is_404() {
    let (state, _) = build_test_state(test_config());

    let response = delete_auth(
        build_test_app(state),
        "/api/v1/sessions/does-not-exist",
        &bearer(ADMIN_PASSWORD),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_all_sessions_clears_everything() {
    let (state, _) = build_test_state(test_config());
    let (_s1, _rx1) = connect_device(&state, "D1").await;
    let (_s2, _rx2) = connect_device(&state, "D2").await;

    let response = delete_auth(
        build_test_app(state.clone()),
        "/api/v1/sessions",
        &bearer(ADMIN_PASSWORD),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.registry.is_empty());
    assert!(state.control.list_sessions().await.unwrap().is_empty());
}
