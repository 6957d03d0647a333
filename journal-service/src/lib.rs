pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Extension, Router,
};
use service_core::middleware::{
    client_ip::TrustedProxies,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::JournalConfig;
use crate::repositories::Repositories;
use crate::services::{
    AuthService, Clock, EmailProvider, JournalService, JwtService, LoginDefense, ProfileService,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: JournalConfig,
    pub repos: Repositories,
    /// `None` when running over the in-memory store.
    pub pool: Option<PgPool>,
    pub email: Arc<dyn EmailProvider>,
    pub jwt: JwtService,
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
    pub journal_service: JournalService,
    pub login_defense: Arc<LoginDefense>,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the services over a set of repositories.
    pub fn new(
        config: JournalConfig,
        repos: Repositories,
        pool: Option<PgPool>,
        email: Arc<dyn EmailProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;

        let login_defense = Arc::new(LoginDefense::new(
            repos.security.clone(),
            email.clone(),
            config.security.login_defense.clone(),
            clock.clone(),
        ));

        let auth_service = AuthService::new(
            repos.users.clone(),
            email.clone(),
            jwt.clone(),
            login_defense.clone(),
            config.auth.clone(),
            clock,
        );
        let profile_service = ProfileService::new(repos.profiles.clone());
        let journal_service = JournalService::new(
            repos.journal.clone(),
            repos.strategies.clone(),
            profile_service.clone(),
        );

        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        Ok(Self {
            config,
            repos,
            pool,
            email,
            jwt,
            auth_service,
            profile_service,
            journal_service,
            login_defense,
            ip_rate_limiter,
        })
    }
}

fn cors_layer(config: &JournalConfig) -> CorsLayer {
    let origins = &config.security.allowed_origins;
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let public_auth = Router::new()
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/api/v1/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/api/v1/auth/reset-password",
            post(handlers::auth::reset_password),
        )
        .route("/api/v1/auth/verify-email", post(handlers::auth::verify_email))
        .route(
            "/api/v1/auth/resend-verification",
            post(handlers::auth::resend_verification),
        );

    let protected = Router::new()
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/auth/me", get(handlers::auth::me))
        .route(
            "/api/v1/auth/change-password",
            post(handlers::auth::change_password),
        )
        // Profiles
        .route(
            "/api/v1/profiles",
            get(handlers::profile::list_profiles).post(handlers::profile::create_profile),
        )
        .route(
            "/api/v1/profiles/active",
            get(handlers::profile::get_active_profile),
        )
        .route(
            "/api/v1/profiles/:profile_id",
            get(handlers::profile::get_profile)
                .patch(handlers::profile::update_profile)
                .delete(handlers::profile::delete_profile),
        )
        .route(
            "/api/v1/profiles/:profile_id/activate",
            post(handlers::profile::activate_profile),
        )
        // Strategies
        .route(
            "/api/v1/strategies",
            get(handlers::strategy::list_strategies).post(handlers::strategy::create_strategy),
        )
        .route(
            "/api/v1/strategies/:strategy_id",
            get(handlers::strategy::get_strategy)
                .patch(handlers::strategy::update_strategy)
                .delete(handlers::strategy::delete_strategy),
        )
        // Journal
        .route(
            "/api/v1/journal",
            get(handlers::journal::list_entries).post(handlers::journal::create_entry),
        )
        .route("/api/v1/journal/stats", get(handlers::journal::stats))
        .route(
            "/api/v1/journal/:entry_id",
            get(handlers::journal::get_entry)
                .patch(handlers::journal::update_entry)
                .delete(handlers::journal::delete_entry),
        )
        // Chart drawings
        .route(
            "/api/v1/chart/:symbol",
            get(handlers::chart::get_drawings)
                .put(handlers::chart::save_drawings)
                .delete(handlers::chart::delete_drawings),
        )
        .route(
            "/api/v1/feature-flags",
            get(handlers::feature_flags::list_flags),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    // Layers run bottom-up: the token is checked before the admin flag.
    let admin = Router::new()
        .route("/api/v1/admin/users", get(handlers::admin::list_users))
        .route(
            "/api/v1/admin/users/:user_id/admin",
            put(handlers::admin::set_admin),
        )
        .route(
            "/api/v1/admin/security/blocked-ips",
            get(handlers::admin::list_blocked_ips).post(handlers::admin::block_ip),
        )
        .route(
            "/api/v1/admin/security/blocked-ips/:ip",
            service_core::axum::routing::delete(handlers::admin::unblock_ip),
        )
        .route(
            "/api/v1/admin/security/ips/:ip",
            get(handlers::admin::defense_state),
        )
        .route(
            "/api/v1/admin/security/failed-attempts",
            get(handlers::admin::list_failed_attempts),
        )
        .route(
            "/api/v1/admin/security/logs",
            get(handlers::admin::list_security_logs),
        )
        .route(
            "/api/v1/admin/feature-flags/:name",
            put(handlers::feature_flags::upsert_flag),
        )
        .layer(from_fn_with_state(state.clone(), middleware::require_admin))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let ip_limiter = state.ip_rate_limiter.clone();

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(public_auth)
        .merge(protected)
        .merge(admin)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config))
        // Outermost so the rate limiter and handlers resolve the same client IP
        .layer(Extension(TrustedProxies::new(
            state.config.security.trusted_proxies.clone(),
        )));

    Ok(app)
}

/// Service health check
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<service_core::axum::Json<serde_json::Value>, AppError> {
    let database = match &state.pool {
        Some(pool) => {
            db::health_check(pool).await.map_err(|e| {
                tracing::error!(error = %e, "PostgreSQL health check failed");
                AppError::ServiceUnavailable
            })?;
            "up"
        }
        None => "in-memory",
    };

    Ok(service_core::axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "database": database,
        }
    })))
}
