use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{
        auth::{RegisterRequest, ResendVerificationRequest, VerifyEmailRequest},
        MessageResponse,
    },
    utils::ValidatedJson,
    AppState,
};

/// Create an account together with its default profile
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn verify_email(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.verify_email(req).await?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendVerificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.resend_verification(&req.email).await?;
    Ok(Json(MessageResponse::new(
        "If the account exists and is unverified, a new code has been sent.",
    )))
}
