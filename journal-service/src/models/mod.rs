pub mod chart_drawing;
pub mod feature_flag;
pub mod journal_entry;
pub mod profile;
pub mod security;
pub mod strategy;
pub mod user;

pub use chart_drawing::ChartDrawing;
pub use feature_flag::FeatureFlag;
pub use journal_entry::{JournalEntry, JournalStats, TradeDirection};
pub use profile::{Profile, ProfileMode};
pub use security::{BlockedIp, FailedLoginAttempt, SecurityEventType, SecurityLog};
pub use strategy::Strategy;
pub use user::{User, UserResponse};
