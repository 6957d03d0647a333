//! Security models: failed login attempts, IP blocks and the audit trail.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One failed credential check. Never mutated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FailedLoginAttempt {
    pub attempt_id: Uuid,
    pub ip_address: String,
    pub email_attempted: String,
    pub attempted_utc: DateTime<Utc>,
    pub user_agent: Option<String>,
}

impl FailedLoginAttempt {
    pub fn new(
        ip_address: &str,
        email_attempted: &str,
        user_agent: Option<String>,
        attempted_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            ip_address: ip_address.to_string(),
            email_attempted: email_attempted.to_string(),
            attempted_utc,
            user_agent,
        }
    }
}

/// A block on an IP address. `blocked_until_utc == None` means permanent.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BlockedIp {
    pub block_id: Uuid,
    pub ip_address: String,
    pub reason: String,
    pub blocked_utc: DateTime<Utc>,
    pub blocked_until_utc: Option<DateTime<Utc>>,
    pub failed_attempts: i32,
    pub is_permanent: bool,
    pub blocked_by: String,
}

impl BlockedIp {
    /// Temporary block raised by the login defense.
    pub fn temporary(
        ip_address: &str,
        reason: String,
        failed_attempts: i32,
        now: DateTime<Utc>,
        duration: Duration,
        blocked_by: &str,
    ) -> Self {
        Self {
            block_id: Uuid::new_v4(),
            ip_address: ip_address.to_string(),
            reason,
            blocked_utc: now,
            blocked_until_utc: Some(now + duration),
            failed_attempts,
            is_permanent: false,
            blocked_by: blocked_by.to_string(),
        }
    }

    pub fn permanent(ip_address: &str, reason: String, now: DateTime<Utc>, blocked_by: &str) -> Self {
        Self {
            block_id: Uuid::new_v4(),
            ip_address: ip_address.to_string(),
            reason,
            blocked_utc: now,
            blocked_until_utc: None,
            failed_attempts: 0,
            is_permanent: true,
            blocked_by: blocked_by.to_string(),
        }
    }

    /// Computed at read time; expired blocks are never swept.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_permanent || self.blocked_until_utc.is_some_and(|until| now < until)
    }
}

/// Security audit event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    LoginFailed,
    LoginSuccess,
    SuspiciousActivity,
    IpBlocked,
    IpUnblocked,
    BlockedRequest,
    PasswordReset,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::LoginFailed => "login_failed",
            SecurityEventType::LoginSuccess => "login_success",
            SecurityEventType::SuspiciousActivity => "suspicious_activity",
            SecurityEventType::IpBlocked => "ip_blocked",
            SecurityEventType::IpUnblocked => "ip_unblocked",
            SecurityEventType::BlockedRequest => "blocked_request",
            SecurityEventType::PasswordReset => "password_reset",
        }
    }
}

/// Append-only security audit row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SecurityLog {
    pub log_id: Uuid,
    pub ip_address: String,
    pub event_type: String,
    pub details: String,
    pub endpoint: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl SecurityLog {
    pub fn new(
        ip_address: &str,
        event_type: SecurityEventType,
        details: impl Into<String>,
        endpoint: Option<&str>,
        created_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            log_id: Uuid::new_v4(),
            ip_address: ip_address.to_string(),
            event_type: event_type.as_str().to_string(),
            details: details.into(),
            endpoint: endpoint.map(|s| s.to_string()),
            created_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_block_expires() {
        let now = Utc::now();
        let block = BlockedIp::temporary(
            "10.0.0.1",
            "too many failures".to_string(),
            10,
            now,
            Duration::hours(24),
            "system",
        );
        assert!(block.is_active_at(now));
        assert!(block.is_active_at(now + Duration::hours(23)));
        assert!(!block.is_active_at(now + Duration::hours(24)));
    }

    #[test]
    fn test_permanent_block_never_expires() {
        let now = Utc::now();
        let block = BlockedIp::permanent("10.0.0.1", "abuse".to_string(), now, "admin");
        assert!(block.is_active_at(now + Duration::days(3650)));
    }
}
