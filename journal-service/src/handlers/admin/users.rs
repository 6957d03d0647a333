use service_core::{
    axum::{
        extract::{Path, Query, State},
        response::IntoResponse,
        Json,
    },
    error::AppError,
};
use uuid::Uuid;

use crate::{
    dtos::admin::{PageQuery, SetAdminRequest},
    middleware::AuthUser,
    models::UserResponse,
    services::ServiceError,
    AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<UserResponse> = state
        .repos
        .users
        .list(page.limit(), page.offset())
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(users))
}

pub async fn set_admin(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    if admin.user_id()? == user_id && !req.is_admin {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Admins cannot revoke their own admin rights"
        )));
    }

    if !state.repos.users.set_admin(user_id, req.is_admin).await? {
        return Err(ServiceError::NotFound("User not found".to_string()).into());
    }

    tracing::info!(user_id = %user_id, is_admin = req.is_admin, by = %admin.0.sub, "Admin flag changed");

    let user = state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
    Ok(Json(user.sanitized()))
}
