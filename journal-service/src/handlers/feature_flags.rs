use chrono::Utc;
use service_core::{
    axum::{
        extract::{Path, State},
        response::IntoResponse,
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::resources::UpsertFeatureFlagRequest, middleware::AuthUser, models::FeatureFlag,
    utils::ValidatedJson, AppState,
};

pub async fn list_flags(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let flags = state.repos.flags.list().await?;
    Ok(Json(flags))
}

/// Admin only; mounted under the admin router.
pub async fn upsert_flag(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(name): Path<String>,
    ValidatedJson(req): ValidatedJson<UpsertFeatureFlagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Flag name is required")));
    }

    let flag = state
        .repos
        .flags
        .upsert(&FeatureFlag {
            name,
            description: req.description,
            enabled: req.enabled,
            updated_utc: Utc::now(),
        })
        .await?;

    tracing::info!(flag = %flag.name, enabled = flag.enabled, by = %admin.0.sub, "Feature flag updated");
    Ok(Json(flag))
}
