//! Shared harness for the journal-service integration tests.
//!
//! Every test gets its own in-memory store, mailbox and manual clock, so
//! tests never need a running PostgreSQL.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use journal_service::{
    build_router,
    config::{
        AuthSettings, DatabaseConfig, Environment, JournalConfig, JwtConfig, LoginDefenseConfig,
        RateLimitConfig, SecurityConfig, SmtpConfig,
    },
    repositories::{InMemoryStore, Repositories},
    services::{ManualClock, MockEmailService, SentEmail},
    AppState,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceExt;

pub const ALERT_EMAIL: &str = "security@journal.test";
pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> JournalConfig {
    JournalConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "journal-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret-0123456789abcdef".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from_email: "noreply@journal.test".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["*".to_string()],
            trusted_proxies: Vec::new(),
            login_defense: LoginDefenseConfig {
                alert_threshold: 2,
                block_threshold: 3,
                window_seconds: 3600,
                block_duration_hours: 24,
                alert_email: Some(ALERT_EMAIL.to_string()),
            },
        },
        auth: AuthSettings {
            require_email_verification: false,
            frontend_url: "http://localhost:3000".to_string(),
        },
        rate_limit: RateLimitConfig {
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub mailbox: Arc<MockEmailService>,
    pub clock: Arc<ManualClock>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: JournalConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mailbox = Arc::new(MockEmailService::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        ));

        let state = AppState::new(
            config,
            Repositories::from_memory(store.clone()),
            None,
            mailbox.clone(),
            clock.clone(),
        )
        .expect("Failed to build app state");

        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        Self {
            router,
            state,
            store,
            mailbox,
            clock,
        }
    }

    /// Build a request arriving on a socket from `ip`, optionally authenticated.
    pub fn build_request(
        method: Method,
        uri: &str,
        ip: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::USER_AGENT, "journal-tests/1.0");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let mut request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let peer: SocketAddr = (ip.parse::<std::net::IpAddr>().unwrap(), 40_000).into();
        request.extensions_mut().insert(ConnectInfo(peer));
        request
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        ip: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.send(Self::build_request(method, uri, ip, token, body))
            .await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, "198.51.100.1", Some(token), None)
            .await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, "198.51.100.1", Some(token), Some(body))
            .await
    }

    pub async fn register(&self, email: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/v1/auth/register",
            "198.51.100.1",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": PASSWORD,
                "display_name": "Test Trader",
            })),
        )
        .await
    }

    pub async fn login_from(&self, ip: &str, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/v1/auth/login",
            ip,
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Log in over a socket from `peer` that claims to forward for `forwarded_for`.
    pub async fn login_forwarded(
        &self,
        peer: &str,
        forwarded_for: &str,
        email: &str,
        password: &str,
    ) -> TestResponse {
        let mut request = Self::build_request(
            Method::POST,
            "/api/v1/auth/login",
            peer,
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", forwarded_for.parse().unwrap());
        self.send(request).await
    }

    /// Register a user and return their access token.
    pub async fn signed_up(&self, email: &str) -> String {
        let res = self.register(email).await;
        assert_eq!(res.status, StatusCode::CREATED, "register failed: {}", res.body);
        res.body["access_token"]
            .as_str()
            .expect("access token in register response")
            .to_string()
    }

    /// Register a user, grant admin, and log in again for a fresh token.
    pub async fn signed_up_admin(&self, email: &str) -> String {
        let res = self.register(email).await;
        assert_eq!(res.status, StatusCode::CREATED);
        let user_id = res.body["user"]["user_id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("user id in register response");
        assert!(self.state.repos.users.set_admin(user_id, true).await.unwrap());

        let res = self.login_from("198.51.100.1", email, PASSWORD).await;
        assert_eq!(res.status, StatusCode::OK);
        res.body["access_token"].as_str().unwrap().to_string()
    }

    pub fn security_alerts(&self) -> Vec<SentEmail> {
        self.mailbox
            .sent()
            .into_iter()
            .filter(|m| matches!(m, SentEmail::SecurityAlert { .. }))
            .collect()
    }

    /// Latest code mailed to `to` by the given kind of message.
    pub fn last_code(&self, to: &str, reset: bool) -> Option<String> {
        self.mailbox
            .sent()
            .into_iter()
            .rev()
            .find_map(|m| match m {
                SentEmail::PasswordReset { to: t, code } if reset && t == to => Some(code),
                SentEmail::Verification { to: t, code } if !reset && t == to => Some(code),
                _ => None,
            })
    }
}
