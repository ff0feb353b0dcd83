use crate::common::{TestApp, routes};
use serde_json::json;

#[tokio::test]
async fn snapshot_requires_authentication() {
    let app = TestApp::spawn().await;
    let res = app.get_without_token(routes::ACCESS).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn all_rounds_start_disabled() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice", "pass1234").await;

    let res = app.get_with_token(routes::ACCESS, &token).await;
    assert_eq!(res.status, 200);
    for round in ["round1", "round2", "round3"] {
        assert_eq!(res.body[round]["enabled"], false, "{round} should be off");
        assert!(res.body[round]["enabled_at"].is_null());
    }
}

#[tokio::test]
async fn contestants_cannot_toggle_rounds() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("alice", "pass1234").await;

    let res = app
        .put_with_token(&routes::set_access(1), &json!({"enabled": true}), &token)
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn enabling_stamps_enabled_at_once() {
    let app = TestApp::spawn().await;
    let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;

    let first = app
        .put_with_token(&routes::set_access(1), &json!({"enabled": true}), &admin)
        .await;
    assert_eq!(first.status, 200);
    assert_eq!(first.body["enabled"], true);
    let stamped = first.body["enabled_at"].as_str().unwrap().to_string();

    // Idempotent repeat: still succeeds, timestamp untouched.
    let second = app
        .put_with_token(&routes::set_access(1), &json!({"enabled": true}), &admin)
        .await;
    assert_eq!(second.status, 200);
    assert_eq!(second.body["enabled_at"].as_str().unwrap(), stamped);
}

#[tokio::test]
async fn toggles_are_observable_in_the_snapshot() {
    let app = TestApp::spawn().await;
    let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
    let token = app.create_authenticated_user("alice", "pass1234").await;

    app.set_round_access(&admin, 2, true).await;
    let res = app.get_with_token(routes::ACCESS, &token).await;
    assert_eq!(res.body["round2"]["enabled"], true);
    assert_eq!(res.body["round1"]["enabled"], false);

    app.set_round_access(&admin, 2, false).await;
    let res = app.get_with_token(routes::ACCESS, &token).await;
    assert_eq!(res.body["round2"]["enabled"], false);
    // The enable timestamp survives a disable.
    assert!(res.body["round2"]["enabled_at"].is_string());
}

#[tokio::test]
async fn invalid_round_numbers_are_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;

    let res = app
        .put_with_token(&routes::set_access(4), &json!({"enabled": true}), &admin)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}
