//! Admin views over the login defense.

use service_core::{
    axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};
use std::net::IpAddr;

use crate::{
    dtos::{
        admin::{BlockIpRequest, PageQuery},
        MessageResponse,
    },
    middleware::AuthUser,
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

fn parse_ip(raw: &str) -> Result<IpAddr, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid IP address: {}", raw)))
}

pub async fn list_blocked_ips(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.login_defense.list_blocks().await?))
}

pub async fn list_failed_attempts(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state
            .login_defense
            .recent_failed_attempts(page.limit())
            .await?,
    ))
}

pub async fn list_security_logs(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.login_defense.recent_logs(page.limit()).await?))
}

pub async fn defense_state(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ip = parse_ip(&ip)?;
    Ok(Json(state.login_defense.state(&ip.to_string()).await?))
}

pub async fn block_ip(
    State(state): State<AppState>,
    admin: AuthUser,
    ValidatedJson(req): ValidatedJson<BlockIpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip = parse_ip(&req.ip_address)?;
    let block = state
        .login_defense
        .block_ip(&ip.to_string(), req.reason, req.duration_hours, &admin.0.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(block)))
}

pub async fn unblock_ip(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(ip): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ip = parse_ip(&ip)?;
    if !state
        .login_defense
        .unblock_ip(&ip.to_string(), &admin.0.sub)
        .await?
    {
        return Err(ServiceError::NotFound(format!("{} is not blocked", ip)).into());
    }
    Ok(Json(MessageResponse::new(format!("{} unblocked", ip))))
}
