mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

const IP: &str = "198.51.100.1";

#[tokio::test]
async fn test_strategy_crud() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("strategist@example.com").await;

    let res = app
        .post(
            "/api/v1/strategies",
            &token,
            json!({
                "name": "Opening range breakout",
                "description": "First 15 minute range",
                "rules": { "timeframe": "15m", "max_risk": 0.01 },
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["is_active"], true);
    assert_eq!(res.body["rules"]["timeframe"], "15m");
    let id = res.body["strategy_id"].as_str().unwrap().to_string();

    let res = app
        .request(
            Method::PATCH,
            &format!("/api/v1/strategies/{}", id),
            IP,
            Some(&token),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["is_active"], false);
    assert_eq!(res.body["name"], "Opening range breakout");

    let list = app.get("/api/v1/strategies", &token).await;
    assert_eq!(list.body.as_array().map(Vec::len), Some(1));

    let other = app.signed_up("someone-else@example.com").await;
    let res = app.get(&format!("/api/v1/strategies/{}", id), &other).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .request(
            Method::DELETE,
            &format!("/api/v1/strategies/{}", id),
            IP,
            Some(&token),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get(&format!("/api/v1/strategies/{}", id), &token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_journal_entries_compute_pnl_and_stats() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("journal@example.com").await;

    let res = app
        .post(
            "/api/v1/journal",
            &token,
            json!({
                "symbol": " aapl ",
                "direction": "long",
                "entry_price": 100.0,
                "exit_price": 110.0,
                "quantity": 2.0,
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["symbol"], "AAPL");
    assert_eq!(res.body["pnl"], 20.0);

    let res = app
        .post(
            "/api/v1/journal",
            &token,
            json!({
                "symbol": "TSLA",
                "direction": "short",
                "entry_price": 200.0,
                "exit_price": 210.0,
                "quantity": 1.0,
            }),
        )
        .await;
    assert_eq!(res.body["pnl"], -10.0);

    let res = app
        .post(
            "/api/v1/journal",
            &token,
            json!({
                "symbol": "MSFT",
                "direction": "long",
                "entry_price": 300.0,
                "quantity": 1.0,
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.body["pnl"].is_null());
    let open_id = res.body["entry_id"].as_str().unwrap().to_string();

    let stats = app.get("/api/v1/journal/stats", &token).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["total_entries"], 3);
    assert_eq!(stats.body["closed_entries"], 2);
    assert_eq!(stats.body["winning_entries"], 1);
    assert_eq!(stats.body["total_pnl"], 10.0);
    assert_eq!(stats.body["win_rate"], 0.5);

    // Closing the open trade fills in its pnl
    let res = app
        .request(
            Method::PATCH,
            &format!("/api/v1/journal/{}", open_id),
            IP,
            Some(&token),
            Some(json!({ "exit_price": 305.0 })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["pnl"], 5.0);
    assert!(res.body["exit_utc"].is_string());
}

#[tokio::test]
async fn test_journal_rejects_bad_input() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("strict@example.com").await;

    let res = app
        .post(
            "/api/v1/journal",
            &token,
            json!({
                "symbol": "AAPL",
                "direction": "sideways",
                "entry_price": 100.0,
                "quantity": 1.0,
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(
            "/api/v1/journal",
            &token,
            json!({
                "symbol": "AAPL",
                "direction": "long",
                "entry_price": -5.0,
                "quantity": 1.0,
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .post(
            "/api/v1/journal",
            &token,
            json!({
                "symbol": "AAPL",
                "direction": "long",
                "entry_price": 100.0,
                "quantity": 1.0,
                "strategy_id": uuid::Uuid::new_v4(),
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_entries_follow_the_selected_profile() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("profiles-journal@example.com").await;

    let backtest = app
        .post(
            "/api/v1/profiles",
            &token,
            json!({ "name": "Backtest", "mode": "backtest" }),
        )
        .await;
    let backtest_id = backtest.body["profile_id"].as_str().unwrap().to_string();

    app.post(
        "/api/v1/journal",
        &token,
        json!({
            "profile_id": backtest_id,
            "symbol": "ES",
            "direction": "long",
            "entry_price": 4500.0,
            "quantity": 1.0,
        }),
    )
    .await;

    // The active profile is still the default one and has nothing in it
    let res = app.get("/api/v1/journal", &token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["entries"].as_array().map(Vec::len), Some(0));

    let res = app
        .get(&format!("/api/v1/journal?profile_id={}", backtest_id), &token)
        .await;
    assert_eq!(res.body["profile_id"], backtest_id.as_str());
    assert_eq!(res.body["entries"].as_array().map(Vec::len), Some(1));

    // Another user's profile id is not usable
    let other = app.signed_up("intruder@example.com").await;
    let res = app
        .get(&format!("/api/v1/journal?profile_id={}", backtest_id), &other)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feature_flags_visible_to_users_writable_by_admins() {
    let app = TestApp::spawn().await;
    let user = app.signed_up("flags-user@example.com").await;
    let admin = app.signed_up_admin("flags-admin@example.com").await;

    let res = app
        .request(
            Method::PUT,
            "/api/v1/admin/feature-flags/Replay_Mode",
            IP,
            Some(&user),
            Some(json!({ "enabled": true })),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .request(
            Method::PUT,
            "/api/v1/admin/feature-flags/Replay_Mode",
            IP,
            Some(&admin),
            Some(json!({ "enabled": true, "description": "Bar replay on charts" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "replay_mode");

    // Omitting the description keeps the stored one
    app.request(
        Method::PUT,
        "/api/v1/admin/feature-flags/replay_mode",
        IP,
        Some(&admin),
        Some(json!({ "enabled": false })),
    )
    .await;

    let res = app.get("/api/v1/feature-flags", &user).await;
    assert_eq!(res.status, StatusCode::OK);
    let flags = res.body.as_array().unwrap();
    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0]["enabled"], false);
    assert_eq!(flags[0]["description"], "Bar replay on charts");
}
