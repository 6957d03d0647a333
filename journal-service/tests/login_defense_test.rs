mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{TestApp, ALERT_EMAIL, PASSWORD};
use journal_service::services::SentEmail;

const ATTACKER: &str = "203.0.113.50";

fn critical_alerts(app: &TestApp) -> usize {
    app.security_alerts()
        .iter()
        .filter(|m| matches!(m, SentEmail::SecurityAlert { critical: true, .. }))
        .count()
}

#[tokio::test]
async fn test_failures_warn_then_block() {
    let app = TestApp::spawn().await;
    app.signed_up("victim@example.com").await;

    let res = app.login_from(ATTACKER, "victim@example.com", "wrong-1").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(app.security_alerts().is_empty());

    // Second failure reaches the alert threshold
    let res = app.login_from(ATTACKER, "victim@example.com", "wrong-2").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.security_alerts(),
        vec![SentEmail::SecurityAlert {
            to: ALERT_EMAIL.to_string(),
            ip_address: ATTACKER.to_string(),
            critical: false,
        }]
    );
    assert_eq!(app.store.logs_of_type("suspicious_activity").len(), 1);

    // Third failure blocks and is itself answered with 403
    let res = app.login_from(ATTACKER, "victim@example.com", "wrong-3").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(critical_alerts(&app), 1);
    assert_eq!(app.store.block_rows_for(ATTACKER), 1);
    assert_eq!(app.store.logs_of_type("ip_blocked").len(), 1);
    assert_eq!(app.store.logs_of_type("login_failed").len(), 3);
}

#[tokio::test]
async fn test_blocked_ip_rejected_even_with_correct_password() {
    let app = TestApp::spawn().await;
    app.signed_up("victim@example.com").await;

    for attempt in 0..3 {
        app.login_from(ATTACKER, "victim@example.com", &format!("guess-{}", attempt))
            .await;
    }

    let res = app.login_from(ATTACKER, "victim@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.logs_of_type("blocked_request").len(), 1);

    // Blocked requests are not counted as failures
    assert_eq!(app.store.logs_of_type("login_failed").len(), 3);

    // Another address is unaffected
    let res = app
        .login_from("198.51.100.77", "victim@example.com", PASSWORD)
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_block_lapses_after_duration() {
    let app = TestApp::spawn().await;
    app.signed_up("victim@example.com").await;

    for attempt in 0..3 {
        app.login_from(ATTACKER, "victim@example.com", &format!("guess-{}", attempt))
            .await;
    }

    app.clock.advance(Duration::hours(23));
    let res = app.login_from(ATTACKER, "victim@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    app.clock.advance(Duration::hours(1) + Duration::seconds(1));
    let res = app.login_from(ATTACKER, "victim@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_success_clears_failure_history() {
    let app = TestApp::spawn().await;
    app.signed_up("trader@example.com").await;

    let res = app.login_from(ATTACKER, "trader@example.com", "typo").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.login_from(ATTACKER, "trader@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);

    // Without the reset the second of these would be the third failure
    for _ in 0..2 {
        let res = app.login_from(ATTACKER, "trader@example.com", "typo").await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(app.store.block_rows_for(ATTACKER), 0);
}

#[tokio::test]
async fn test_unknown_email_counts_as_failure() {
    let app = TestApp::spawn().await;

    for _ in 0..2 {
        let res = app.login_from(ATTACKER, "nobody@example.com", "whatever").await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["error"], "Invalid credentials");
    }
    let res = app.login_from(ATTACKER, "nobody@example.com", "whatever").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_failures_outside_window_are_not_counted() {
    let app = TestApp::spawn().await;
    app.signed_up("trader@example.com").await;

    for _ in 0..2 {
        app.login_from(ATTACKER, "trader@example.com", "typo").await;
    }
    app.clock.advance(Duration::minutes(61));

    let res = app.login_from(ATTACKER, "trader@example.com", "typo").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.block_rows_for(ATTACKER), 0);
}

#[tokio::test]
async fn test_concurrent_failures_create_one_block() {
    let app = TestApp::spawn().await;
    app.signed_up("victim@example.com").await;

    for _ in 0..2 {
        app.login_from(ATTACKER, "victim@example.com", "wrong").await;
    }

    let (a, b, c, d) = tokio::join!(
        app.login_from(ATTACKER, "victim@example.com", "wrong-a"),
        app.login_from(ATTACKER, "victim@example.com", "wrong-b"),
        app.login_from(ATTACKER, "victim@example.com", "wrong-c"),
        app.login_from(ATTACKER, "victim@example.com", "wrong-d"),
    );
    for res in [a, b, c, d] {
        assert_eq!(res.status, StatusCode::FORBIDDEN);
    }

    assert_eq!(app.store.block_rows_for(ATTACKER), 1);
    assert_eq!(app.store.logs_of_type("ip_blocked").len(), 1);
    assert_eq!(critical_alerts(&app), 1);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_evade_block() {
    let app = TestApp::spawn().await;
    app.signed_up("victim@example.com").await;

    for n in 1..=5 {
        let res = app
            .login_forwarded(ATTACKER, &format!("10.9.0.{}", n), "victim@example.com", "nope")
            .await;
        if n >= 3 {
            assert_eq!(res.status, StatusCode::FORBIDDEN, "attempt {}", n);
        }
    }

    let res = app
        .login_forwarded(ATTACKER, "10.9.0.99", "victim@example.com", PASSWORD)
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.block_rows_for(ATTACKER), 1);
    assert_eq!(app.store.block_rows_for("10.9.0.1"), 0);
}

#[tokio::test]
async fn test_spoofed_header_cannot_block_a_bystander() {
    let app = TestApp::spawn().await;
    app.signed_up("victim@example.com").await;
    let bystander = "198.51.100.77";

    for _ in 0..3 {
        app.login_forwarded(ATTACKER, bystander, "victim@example.com", "nope")
            .await;
    }

    assert_eq!(app.store.block_rows_for(bystander), 0);
    let res = app
        .login_from(bystander, "victim@example.com", PASSWORD)
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_trusted_proxy_counts_the_forwarded_client() {
    let proxy = "10.0.0.1";
    let mut config = common::test_config();
    config.security.trusted_proxies = vec![proxy.parse().unwrap()];
    let app = TestApp::with_config(config).await;
    app.signed_up("victim@example.com").await;

    // The proxy appends the real peer; anything to its left is client-typed
    for n in 1..=3 {
        app.login_forwarded(
            proxy,
            &format!("172.16.0.{}, {}", n, ATTACKER),
            "victim@example.com",
            "nope",
        )
        .await;
    }
    assert_eq!(app.store.block_rows_for(ATTACKER), 1);
    assert_eq!(app.store.block_rows_for(proxy), 0);

    let res = app
        .login_forwarded(proxy, "198.51.100.77", "victim@example.com", PASSWORD)
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .login_forwarded(proxy, ATTACKER, "victim@example.com", PASSWORD)
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}
