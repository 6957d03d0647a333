mod common;

use axum::http::{Method, StatusCode};
use common::{test_config, TestApp, PASSWORD};
use journal_service::{
    models::{Profile, User},
    services::SentEmail,
    utils::{password::Pbkdf2Sha256Scheme, Password},
};
use serde_json::json;

const IP: &str = "198.51.100.1";

#[tokio::test]
async fn test_register_returns_tokens_and_default_profile() {
    let app = TestApp::spawn().await;

    let res = app.register("New.Trader@Example.com").await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["email"], "new.trader@example.com");
    assert_eq!(res.body["user"]["is_admin"], false);
    assert_eq!(res.body["token_type"], "Bearer");
    assert!(res.body["refresh_token"].is_string());
    assert!(res.body["user"].get("password_hash").is_none());

    let token = res.body["access_token"].as_str().unwrap();
    let active = app.get("/api/v1/profiles/active", token).await;
    assert_eq!(active.status, StatusCode::OK);
    assert_eq!(active.body["name"], "Default");
    assert_eq!(active.body["mode"], "journal");
    assert_eq!(active.body["is_active"], true);

    assert!(app.mailbox.sent().contains(&SentEmail::Welcome {
        to: "new.trader@example.com".to_string()
    }));
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::spawn().await;
    app.signed_up("dup@example.com").await;

    let res = app.register("DUP@example.com").await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], "Email already registered");
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let app = TestApp::spawn().await;

    let res = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            IP,
            None,
            Some(json!({ "email": "not-an-email", "password": PASSWORD })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            IP,
            None,
            Some(json!({ "email": "short@example.com", "password": "abc" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::spawn().await;
    app.signed_up("me@example.com").await;

    let res = app.login_from(IP, "ME@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["user"]["last_login_utc"].is_string());
    let token = res.body["access_token"].as_str().unwrap().to_string();

    let me = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "me@example.com");

    let res = app.login_from(IP, "me@example.com", "not-the-password").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_access_token() {
    let app = TestApp::spawn().await;
    let res = app.register("tokens@example.com").await;
    let refresh = res.body["refresh_token"].as_str().unwrap().to_string();

    let res = app
        .request(Method::GET, "/api/v1/auth/me", IP, None, None)
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/api/v1/auth/me", "garbage").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token
    let res = app.get("/api/v1/auth/me", &refresh).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let app = TestApp::spawn().await;
    let res = app.register("refresh@example.com").await;
    let access = res.body["access_token"].as_str().unwrap().to_string();
    let refresh = res.body["refresh_token"].as_str().unwrap().to_string();

    let res = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            IP,
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let new_access = res.body["access_token"].as_str().unwrap();
    assert_eq!(app.get("/api/v1/auth/me", new_access).await.status, StatusCode::OK);

    let res = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            IP,
            None,
            Some(json!({ "refresh_token": access })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_legacy_pbkdf2_hash_is_upgraded_on_login() {
    let app = TestApp::spawn().await;

    let legacy = Pbkdf2Sha256Scheme::encode(&Password::new(PASSWORD.to_string()), "s4ltyS4lt", 1000);
    let user = User::new("legacy@example.com", None, legacy.clone(), true);
    app.state
        .repos
        .users
        .create_with_profile(&user, &Profile::default_for(user.user_id))
        .await
        .unwrap();

    let res = app.login_from(IP, "legacy@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);

    let stored = app
        .state
        .repos
        .users
        .find_by_id(user.user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.password_hash.starts_with("$argon2"));
    assert_ne!(stored.password_hash, legacy);

    // Still works against the upgraded hash
    let res = app.login_from(IP, "legacy@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("change@example.com").await;

    let res = app
        .post(
            "/api/v1/auth/change-password",
            &token,
            json!({ "current_password": "wrong-current", "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .post(
            "/api/v1/auth/change-password",
            &token,
            json!({ "current_password": PASSWORD, "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    assert_eq!(
        app.login_from(IP, "change@example.com", "brand-new-pass").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let app = TestApp::spawn().await;
    app.signed_up("reset@example.com").await;

    // Unknown addresses get the same answer and no mail
    let res = app
        .request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            IP,
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(app.last_code("ghost@example.com", true).is_none());

    let res = app
        .request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            IP,
            None,
            Some(json!({ "email": "reset@example.com" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let code = app.last_code("reset@example.com", true).expect("reset code mailed");
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let reset = |code: String| {
        app.request(
            Method::POST,
            "/api/v1/auth/reset-password",
            IP,
            None,
            Some(json!({
                "email": "reset@example.com",
                "code": code,
                "new_password": "after-reset-pass",
            })),
        )
    };

    assert_eq!(reset(wrong.to_string()).await.status, StatusCode::BAD_REQUEST);
    assert_eq!(reset(code.clone()).await.status, StatusCode::OK);
    assert_eq!(app.store.logs_of_type("password_reset").len(), 1);

    // Codes are single use
    assert_eq!(reset(code).await.status, StatusCode::BAD_REQUEST);

    assert_eq!(
        app.login_from(IP, "reset@example.com", PASSWORD).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login_from(IP, "reset@example.com", "after-reset-pass").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_reset_code_expires() {
    let app = TestApp::spawn().await;
    app.signed_up("slow@example.com").await;

    app.request(
        Method::POST,
        "/api/v1/auth/forgot-password",
        IP,
        None,
        Some(json!({ "email": "slow@example.com" })),
    )
    .await;
    let code = app.last_code("slow@example.com", true).unwrap();

    app.clock.advance(chrono::Duration::minutes(61));
    let res = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            IP,
            None,
            Some(json!({
                "email": "slow@example.com",
                "code": code,
                "new_password": "after-reset-pass",
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_email_verification_gate() {
    let mut config = test_config();
    config.auth.require_email_verification = true;
    let app = TestApp::with_config(config).await;

    let res = app.register("verify@example.com").await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["email_verified"], false);

    let res = app.login_from(IP, "verify@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let code = app
        .last_code("verify@example.com", false)
        .expect("verification code mailed");
    let res = app
        .request(
            Method::POST,
            "/api/v1/auth/verify-email",
            IP,
            None,
            Some(json!({ "email": "verify@example.com", "code": code })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.login_from(IP, "verify@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["email_verified"], true);
}

#[tokio::test]
async fn test_health_check_reports_in_memory_store() {
    let app = TestApp::spawn().await;
    let res = app.request(Method::GET, "/health", IP, None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["checks"]["database"], "in-memory");
}
