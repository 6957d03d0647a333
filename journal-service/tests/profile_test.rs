mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

const IP: &str = "198.51.100.1";

async fn create_profile(app: &TestApp, token: &str, name: &str, mode: &str) -> common::TestResponse {
    app.post(
        "/api/v1/profiles",
        token,
        json!({ "name": name, "mode": mode, "description": "Replays of 2023 setups" }),
    )
    .await
}

#[tokio::test]
async fn test_profile_names_are_unique_per_user() {
    let app = TestApp::spawn().await;
    let alice = app.signed_up("alice@example.com").await;
    let bob = app.signed_up("bob@example.com").await;

    let res = create_profile(&app, &alice, "Backtests", "backtest").await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["mode"], "backtest");
    // The registration profile stays active
    assert_eq!(res.body["is_active"], false);

    let res = create_profile(&app, &alice, "Backtests", "journal").await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = create_profile(&app, &bob, "Backtests", "backtest").await;
    assert_eq!(res.status, StatusCode::CREATED);

    let list = app.get("/api/v1/profiles", &alice).await;
    assert_eq!(list.body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_rejects_unknown_mode() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("modes@example.com").await;

    let res = create_profile(&app, &token, "Paper", "paper_trading").await;
    assert!(res.status.is_client_error());
}

#[tokio::test]
async fn test_activate_switches_the_single_active_profile() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("switch@example.com").await;

    let created = create_profile(&app, &token, "Live", "journal_live").await;
    let live_id = created.body["profile_id"].as_str().unwrap().to_string();

    let res = app
        .post(
            &format!("/api/v1/profiles/{}/activate", live_id),
            &token,
            json!({}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["is_active"], true);

    let list = app.get("/api/v1/profiles", &token).await;
    let active: Vec<_> = list
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| p["is_active"] == true)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["profile_id"], live_id.as_str());
}

#[tokio::test]
async fn test_deleting_active_profile_promotes_another() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("promote@example.com").await;

    let default = app.get("/api/v1/profiles/active", &token).await;
    let default_id = default.body["profile_id"].as_str().unwrap().to_string();
    let created = create_profile(&app, &token, "Second", "journal").await;
    let second_id = created.body["profile_id"].as_str().unwrap().to_string();

    let res = app
        .request(
            Method::DELETE,
            &format!("/api/v1/profiles/{}", default_id),
            IP,
            Some(&token),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["activated_profile_id"], second_id.as_str());

    let active = app.get("/api/v1/profiles/active", &token).await;
    assert_eq!(active.body["profile_id"], second_id.as_str());
}

#[tokio::test]
async fn test_cannot_delete_last_profile() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("last@example.com").await;

    let default = app.get("/api/v1/profiles/active", &token).await;
    let default_id = default.body["profile_id"].as_str().unwrap().to_string();

    let res = app
        .request(
            Method::DELETE,
            &format!("/api/v1/profiles/{}", default_id),
            IP,
            Some(&token),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Cannot delete the last remaining profile");

    let res = app.get("/api/v1/profiles/active", &token).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_profiles_are_scoped_to_owner() {
    let app = TestApp::spawn().await;
    let alice = app.signed_up("owner@example.com").await;
    let mallory = app.signed_up("mallory@example.com").await;

    let created = create_profile(&app, &alice, "Private", "journal").await;
    let id = created.body["profile_id"].as_str().unwrap().to_string();

    let res = app.get(&format!("/api/v1/profiles/{}", id), &mallory).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .request(
            Method::PATCH,
            &format!("/api/v1/profiles/{}", id),
            IP,
            Some(&mallory),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .request(
            Method::PATCH,
            &format!("/api/v1/profiles/{}", id),
            IP,
            Some(&alice),
            Some(json!({ "name": "Renamed", "mode": "backtest" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "Renamed");
    assert_eq!(res.body["mode"], "backtest");
}
