//! Strategy model - named trading setups referenced by journal entries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Strategy {
    pub strategy_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Free-form rule set edited by the frontend.
    pub rules: Json<serde_json::Value>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Strategy {
    pub fn new(
        user_id: Uuid,
        name: String,
        description: Option<String>,
        rules: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            strategy_id: Uuid::new_v4(),
            user_id,
            name,
            description,
            rules: Json(rules),
            is_active: true,
            created_utc: now,
            updated_utc: now,
        }
    }
}
