use service_core::{
    axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};
use uuid::Uuid;

use crate::{
    dtos::resources::{CreateProfileRequest, UpdateProfileRequest},
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_profiles(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profiles = state.profile_service.list(user.user_id()?).await?;
    Ok(Json(profiles))
}

pub async fn get_active_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.profile_service.active(user.user_id()?).await?;
    Ok(Json(profile))
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(profile_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .profile_service
        .get(user.user_id()?, profile_id)
        .await?;
    Ok(Json(profile))
}

pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.profile_service.create(user.user_id()?, req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(profile_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .profile_service
        .update(user.user_id()?, profile_id, req)
        .await?;
    Ok(Json(profile))
}

pub async fn activate_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(profile_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .profile_service
        .activate(user.user_id()?, profile_id)
        .await?;
    Ok(Json(profile))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(profile_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let activated = state
        .profile_service
        .delete(user.user_id()?, profile_id)
        .await?;
    Ok(Json(serde_json::json!({
        "message": "Profile deleted",
        "activated_profile_id": activated,
    })))
}
