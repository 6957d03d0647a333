use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use service_core::error::AppError;
use uuid::Uuid;

use crate::{services::TokenClaims, AppState};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn reject(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Middleware to require a valid access token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            reject(
                StatusCode::UNAUTHORIZED,
                "Missing or invalid Authorization header",
            )
        })?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        reject(StatusCode::UNAUTHORIZED, "Invalid or expired token")
    })?;

    // Store claims in request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Middleware for admin routes; runs after [`auth_middleware`].
///
/// The admin flag is read from the store rather than the token so that a
/// revoked admin loses access before their token expires.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let user_id = req
        .extensions()
        .get::<TokenClaims>()
        .and_then(|claims| claims.user_id().ok())
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

    let user = state.repos.users.find_by_id(user_id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load user for admin check");
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })?;

    match user {
        Some(user) if user.is_admin => Ok(next.run(req).await),
        _ => {
            tracing::warn!(user_id = %user_id, "Non-admin attempted admin route");
            Err(reject(StatusCode::FORBIDDEN, "Admin access required"))
        }
    }
}

/// Extractor to easily get claims in handlers
pub struct AuthUser(pub TokenClaims);

impl AuthUser {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.0.user_id().map_err(AppError::Unauthorized)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<TokenClaims>().ok_or_else(|| {
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Auth claims missing from request extensions",
            )
        })?;

        Ok(AuthUser(claims.clone()))
    }
}
