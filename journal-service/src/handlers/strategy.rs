use chrono::Utc;
use service_core::{
    axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};
use sqlx::types::Json as JsonColumn;
use uuid::Uuid;

use crate::{
    dtos::{
        resources::{CreateStrategyRequest, UpdateStrategyRequest},
        MessageResponse,
    },
    middleware::AuthUser,
    models::Strategy,
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

fn not_found() -> AppError {
    ServiceError::NotFound("Strategy not found".to_string()).into()
}

pub async fn list_strategies(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let strategies = state.repos.strategies.list_for_user(user.user_id()?).await?;
    Ok(Json(strategies))
}

pub async fn get_strategy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(strategy_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let strategy = state
        .repos
        .strategies
        .find(user.user_id()?, strategy_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(strategy))
}

pub async fn create_strategy(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateStrategyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let strategy = Strategy::new(
        user.user_id()?,
        req.name.trim().to_string(),
        req.description,
        req.rules.unwrap_or_else(|| serde_json::json!({})),
    );
    state.repos.strategies.insert(&strategy).await?;

    tracing::info!(strategy_id = %strategy.strategy_id, "Strategy created");
    Ok((StatusCode::CREATED, Json(strategy)))
}

pub async fn update_strategy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(strategy_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateStrategyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut strategy = state
        .repos
        .strategies
        .find(user.user_id()?, strategy_id)
        .await?
        .ok_or_else(not_found)?;

    if let Some(name) = req.name {
        strategy.name = name.trim().to_string();
    }
    if req.description.is_some() {
        strategy.description = req.description;
    }
    if let Some(rules) = req.rules {
        strategy.rules = JsonColumn(rules);
    }
    if let Some(is_active) = req.is_active {
        strategy.is_active = is_active;
    }
    strategy.updated_utc = Utc::now();

    state.repos.strategies.update(&strategy).await?;
    Ok(Json(strategy))
}

pub async fn delete_strategy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(strategy_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state
        .repos
        .strategies
        .delete(user.user_id()?, strategy_id)
        .await?
    {
        return Err(not_found());
    }
    Ok(Json(MessageResponse::new("Strategy deleted")))
}
