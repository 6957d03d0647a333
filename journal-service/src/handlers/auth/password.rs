use service_core::{
    axum::{extract::State, http::HeaderMap, response::IntoResponse, Json},
    error::AppError,
    middleware::client_ip::ClientIp,
};

use super::client_context;
use crate::{
    dtos::{
        auth::{ChangePasswordRequest, ForgotPasswordRequest, ResetPasswordRequest},
        MessageResponse,
    },
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth_service
        .change_password(user.user_id()?, req)
        .await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Always answers the same way so callers cannot tell which accounts exist.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.forgot_password(&req.email).await?;
    Ok(Json(MessageResponse::new(
        "If your email is registered, you will receive a reset code shortly.",
    )))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = client_context(ip, &headers);
    state.auth_service.reset_password(req, &client).await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}
