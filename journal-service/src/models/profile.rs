//! Profile model - named per-user journal configurations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Journal entry mode selected by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileMode {
    Backtest,
    Journal,
    JournalLive,
}

impl ProfileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileMode::Backtest => "backtest",
            ProfileMode::Journal => "journal",
            ProfileMode::JournalLive => "journal_live",
        }
    }
}

impl std::str::FromStr for ProfileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backtest" => Ok(ProfileMode::Backtest),
            "journal" => Ok(ProfileMode::Journal),
            "journal_live" => Ok(ProfileMode::JournalLive),
            _ => Err(format!(
                "Invalid profile mode '{}': expected backtest, journal or journal_live",
                s
            )),
        }
    }
}

/// Profile entity.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub mode: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Profile {
    pub fn new(
        user_id: Uuid,
        name: String,
        mode: ProfileMode,
        description: Option<String>,
        is_active: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            profile_id: Uuid::new_v4(),
            user_id,
            name,
            mode: mode.as_str().to_string(),
            description,
            is_active,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// The profile every new account starts with.
    pub fn default_for(user_id: Uuid) -> Self {
        Self::new(
            user_id,
            "Default".to_string(),
            ProfileMode::Journal,
            None,
            true,
        )
    }
}
