//! Request bodies and query strings for the journal resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{JournalEntry, JournalStats, ProfileMode};

// ==================== Profiles ====================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default = "default_mode")]
    pub mode: ProfileMode,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

fn default_mode() -> ProfileMode {
    ProfileMode::Journal
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    pub mode: Option<ProfileMode>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

// ==================== Strategies ====================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStrategyRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStrategyRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub rules: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

// ==================== Chart Drawings ====================

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub session_id: Option<String>,
}

impl ChartQuery {
    /// Blank session ids address the session-less record.
    pub fn session(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveChartRequest {
    pub drawings: Vec<serde_json::Value>,
}

// ==================== Journal ====================

#[derive(Debug, Deserialize)]
pub struct JournalQuery {
    pub profile_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJournalEntryRequest {
    pub profile_id: Option<Uuid>,
    pub strategy_id: Option<Uuid>,
    #[validate(length(min = 1, max = 32, message = "Symbol must be 1-32 characters"))]
    pub symbol: String,
    pub direction: String,
    #[validate(range(exclusive_min = 0.0, message = "Entry price must be positive"))]
    pub entry_price: f64,
    #[validate(range(exclusive_min = 0.0, message = "Exit price must be positive"))]
    pub exit_price: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Quantity must be positive"))]
    pub quantity: f64,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub entry_utc: Option<DateTime<Utc>>,
    pub exit_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateJournalEntryRequest {
    pub strategy_id: Option<Uuid>,
    #[validate(range(exclusive_min = 0.0, message = "Exit price must be positive"))]
    pub exit_price: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Quantity must be positive"))]
    pub quantity: Option<f64>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub exit_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct JournalListResponse {
    pub profile_id: Uuid,
    pub entries: Vec<JournalEntry>,
}

#[derive(Debug, Serialize)]
pub struct JournalStatsResponse {
    pub profile_id: Uuid,
    #[serde(flatten)]
    pub stats: JournalStats,
}

// ==================== Feature Flags ====================

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertFeatureFlagRequest {
    pub enabled: bool,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}
