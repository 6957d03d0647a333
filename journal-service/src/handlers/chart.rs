//! Chart drawings, keyed by (user, symbol, optional session).

use service_core::{
    axum::{
        extract::{Path, Query, State},
        response::IntoResponse,
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::{
        resources::{ChartQuery, SaveChartRequest},
        MessageResponse,
    },
    middleware::AuthUser,
    models::{chart_drawing::normalize_symbol, ChartDrawing},
    services::ServiceError,
    AppState,
};

/// Without `session_id` only the session-less record is returned.
pub async fn get_drawings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(symbol): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let drawing = state
        .repos
        .charts
        .find(user.user_id()?, &normalize_symbol(&symbol), query.session())
        .await?
        .ok_or_else(|| ServiceError::NotFound("No drawings saved for this chart".to_string()))?;
    Ok(Json(drawing))
}

pub async fn save_drawings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(symbol): Path<String>,
    Query(query): Query<ChartQuery>,
    Json(req): Json<SaveChartRequest>,
) -> Result<impl IntoResponse, AppError> {
    let symbol = normalize_symbol(&symbol);
    if symbol.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Symbol is required")));
    }

    let drawing = ChartDrawing::new(
        user.user_id()?,
        symbol,
        query.session().map(str::to_string),
        req.drawings,
    );
    let saved = state.repos.charts.upsert(&drawing).await?;
    Ok(Json(saved))
}

pub async fn delete_drawings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(symbol): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state
        .repos
        .charts
        .delete(user.user_id()?, &normalize_symbol(&symbol), query.session())
        .await?;
    if !deleted {
        return Err(ServiceError::NotFound("No drawings saved for this chart".to_string()).into());
    }
    Ok(Json(MessageResponse::new("Drawings deleted")))
}
