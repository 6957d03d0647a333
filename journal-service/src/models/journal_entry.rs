//! Journal entry model - individual trades recorded under a profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }
}

impl std::str::FromStr for TradeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "long" | "buy" => Ok(TradeDirection::Long),
            "short" | "sell" => Ok(TradeDirection::Short),
            _ => Err(format!("Invalid trade direction: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub strategy_id: Option<Uuid>,
    pub symbol: String,
    pub direction: String,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub pnl: Option<f64>,
    pub notes: Option<String>,
    pub entry_utc: DateTime<Utc>,
    pub exit_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl JournalEntry {
    /// Realized profit for a closed trade, `None` while still open.
    pub fn realized_pnl(
        direction: TradeDirection,
        entry_price: f64,
        exit_price: Option<f64>,
        quantity: f64,
    ) -> Option<f64> {
        exit_price.map(|exit| match direction {
            TradeDirection::Long => (exit - entry_price) * quantity,
            TradeDirection::Short => (entry_price - exit) * quantity,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some()
    }
}

/// Aggregate figures over a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JournalStats {
    pub total_entries: usize,
    pub closed_entries: usize,
    pub winning_entries: usize,
    pub total_pnl: f64,
    pub win_rate: Option<f64>,
}

impl JournalStats {
    pub fn from_entries(entries: &[JournalEntry]) -> Self {
        let closed: Vec<f64> = entries.iter().filter_map(|e| e.pnl).collect();
        let winning_entries = closed.iter().filter(|p| **p > 0.0).count();
        let win_rate = if closed.is_empty() {
            None
        } else {
            Some(winning_entries as f64 / closed.len() as f64)
        };

        Self {
            total_entries: entries.len(),
            closed_entries: closed.len(),
            winning_entries,
            total_pnl: closed.iter().sum(),
            win_rate,
        }
    }
}
