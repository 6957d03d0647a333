use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

/// Saved chart annotations for one (user, symbol, session) key.
///
/// A missing `session_id` is a key value of its own: the session-less
/// record for a symbol is distinct from every session-scoped record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChartDrawing {
    pub drawing_id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub session_id: Option<String>,
    pub drawings: Json<Vec<serde_json::Value>>,
    pub updated_utc: DateTime<Utc>,
}

impl ChartDrawing {
    pub fn new(
        user_id: Uuid,
        symbol: String,
        session_id: Option<String>,
        drawings: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            drawing_id: Uuid::new_v4(),
            user_id,
            symbol,
            session_id,
            drawings: Json(drawings),
            updated_utc: Utc::now(),
        }
    }

    pub fn matches_key(&self, user_id: Uuid, symbol: &str, session_id: Option<&str>) -> bool {
        self.user_id == user_id && self.symbol == symbol && self.session_id.as_deref() == session_id
    }
}

/// Symbols are case-insensitive tickers; store them uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
