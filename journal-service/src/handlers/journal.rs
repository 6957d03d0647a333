use service_core::{
    axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};
use uuid::Uuid;

use crate::{
    dtos::{
        resources::{
            CreateJournalEntryRequest, JournalListResponse, JournalQuery, JournalStatsResponse,
            UpdateJournalEntryRequest,
        },
        MessageResponse,
    },
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_entries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<JournalQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (profile_id, entries) = state
        .journal_service
        .list(user.user_id()?, query.profile_id)
        .await?;
    Ok(Json(JournalListResponse {
        profile_id,
        entries,
    }))
}

pub async fn get_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state
        .journal_service
        .get(user.user_id()?, entry_id)
        .await?;
    Ok(Json(entry))
}

pub async fn create_entry(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateJournalEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state
        .journal_service
        .create(user.user_id()?, req)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(entry_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateJournalEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state
        .journal_service
        .update(user.user_id()?, entry_id, req)
        .await?;
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .journal_service
        .delete(user.user_id()?, entry_id)
        .await?;
    Ok(Json(MessageResponse::new("Journal entry deleted")))
}

pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<JournalQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (profile_id, stats) = state
        .journal_service
        .stats(user.user_id()?, query.profile_id)
        .await?;
    Ok(Json(JournalStatsResponse { profile_id, stats }))
}
