use service_core::{
    axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
    middleware::client_ip::ClientIp,
};

use super::client_context;
use crate::{
    dtos::{
        auth::{LoginRequest, RefreshRequest},
        MessageResponse,
    },
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = client_context(ip, &headers);
    let res = state.auth_service.login(req, &client).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Tokens are stateless; the client discards them.
pub async fn logout(user: AuthUser) -> Result<impl IntoResponse, AppError> {
    tracing::info!(user_id = %user.0.sub, "User logged out");
    Ok((StatusCode::OK, Json(MessageResponse::new("Logged out successfully"))))
}

/// Refresh access token using refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.refresh(&req.refresh_token).await?;
    Ok((StatusCode::OK, Json(res)))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.me(user.user_id()?).await?;
    Ok(Json(res))
}
