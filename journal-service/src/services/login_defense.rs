//! Per-IP brute-force defense around login.
//!
//! State is derived on every call from the failed attempts inside the
//! trailing window and from the IP's block row, if any:
//!
//! - `Clear`: fewer failures than the alert threshold.
//! - `Warned`: the alert threshold was reached; one warning has gone out.
//! - `Blocked`: an active block exists. Temporary blocks lapse on their
//!   own once `blocked_until_utc` passes; permanent ones only by an admin.
//!
//! Counting and block uniqueness live in the store. Concurrent failures from
//! one IP may each see the threshold, but only the request whose insert
//! created the block logs it and sends the critical alert.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::config::LoginDefenseConfig;
use crate::models::{BlockedIp, FailedLoginAttempt, SecurityEventType, SecurityLog};
use crate::repositories::SecurityRepository;
use crate::services::clock::Clock;
use crate::services::email::{AlertSeverity, EmailProvider, SecurityAlert};
use crate::services::ServiceError;

const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DefenseState {
    Clear { failed_attempts: i64 },
    Warned { failed_attempts: i64 },
    Blocked {
        until: Option<DateTime<Utc>>,
        permanent: bool,
    },
}

/// What a single recorded failure led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Failures inside the window, this one included.
    pub attempts: i64,
    /// This failure sent the warning alert.
    pub alerted: bool,
    /// This failure created the block.
    pub created_block: bool,
    /// The IP is blocked after this failure.
    pub blocked: bool,
}

pub struct LoginDefense {
    security: Arc<dyn SecurityRepository>,
    email: Arc<dyn EmailProvider>,
    config: LoginDefenseConfig,
    clock: Arc<dyn Clock>,
}

impl LoginDefense {
    pub fn new(
        security: Arc<dyn SecurityRepository>,
        email: Arc<dyn EmailProvider>,
        config: LoginDefenseConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            security,
            email,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &LoginDefenseConfig {
        &self.config
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::seconds(self.config.window_seconds)
    }

    /// The IP's active block, if any.
    pub async fn is_blocked(&self, ip: &str) -> Result<Option<BlockedIp>, ServiceError> {
        self.security.find_active_block(ip, self.clock.now()).await
    }

    /// Fail with `IpBlocked` when the IP is blocked, leaving a
    /// `blocked_request` entry in the security log.
    pub async fn ensure_not_blocked(&self, ip: &str, endpoint: &str) -> Result<(), ServiceError> {
        let Some(block) = self.is_blocked(ip).await? else {
            return Ok(());
        };

        tracing::warn!(
            ip = %ip,
            endpoint = %endpoint,
            blocked_until = ?block.blocked_until_utc,
            "Rejected request from blocked IP"
        );
        self.log(
            ip,
            SecurityEventType::BlockedRequest,
            format!("Request rejected: {}", block.reason),
            Some(endpoint),
        )
        .await;

        Err(ServiceError::IpBlocked)
    }

    /// Record one failed credential check and apply the alert and block rules.
    pub async fn record_failure(
        &self,
        ip: &str,
        email_attempted: &str,
        user_agent: Option<String>,
        endpoint: &str,
    ) -> Result<FailureOutcome, ServiceError> {
        let now = self.clock.now();

        let attempt = FailedLoginAttempt::new(ip, email_attempted, user_agent, now);
        self.security.record_failed_attempt(&attempt).await?;

        let attempts = self
            .security
            .count_failed_attempts_since(ip, self.window_start(now))
            .await?;

        tracing::info!(ip = %ip, attempts, "Failed login attempt recorded");
        self.log(
            ip,
            SecurityEventType::LoginFailed,
            format!("Failed login for {} ({} in window)", email_attempted, attempts),
            Some(endpoint),
        )
        .await;

        let mut outcome = FailureOutcome {
            attempts,
            alerted: false,
            created_block: false,
            blocked: false,
        };

        if attempts == i64::from(self.config.alert_threshold) {
            outcome.alerted = true;
            tracing::warn!(ip = %ip, attempts, "Suspicious login activity");
            self.log(
                ip,
                SecurityEventType::SuspiciousActivity,
                format!("{} failed login attempts within the window", attempts),
                Some(endpoint),
            )
            .await;
            self.alert(SecurityAlert {
                severity: AlertSeverity::Warning,
                ip_address: ip.to_string(),
                failed_attempts: attempts,
                email_attempted: email_attempted.to_string(),
                details: format!(
                    "The IP will be blocked after {} failed attempts.",
                    self.config.block_threshold
                ),
            })
            .await;
        }

        if attempts >= i64::from(self.config.block_threshold) {
            outcome.blocked = true;

            let block = BlockedIp::temporary(
                ip,
                format!("{} failed login attempts", attempts),
                i32::try_from(attempts).unwrap_or(i32::MAX),
                now,
                Duration::hours(self.config.block_duration_hours),
                SYSTEM_ACTOR,
            );

            if self.security.insert_block(&block, now).await? {
                outcome.created_block = true;
                tracing::warn!(
                    ip = %ip,
                    attempts,
                    blocked_until = ?block.blocked_until_utc,
                    "IP blocked after repeated failed logins"
                );
                self.log(
                    ip,
                    SecurityEventType::IpBlocked,
                    format!(
                        "Blocked for {} hours after {} failed attempts",
                        self.config.block_duration_hours, attempts
                    ),
                    Some(endpoint),
                )
                .await;
                self.alert(SecurityAlert {
                    severity: AlertSeverity::Critical,
                    ip_address: ip.to_string(),
                    failed_attempts: attempts,
                    email_attempted: email_attempted.to_string(),
                    details: format!(
                        "The IP has been blocked for {} hours.",
                        self.config.block_duration_hours
                    ),
                })
                .await;
            }
        }

        Ok(outcome)
    }

    /// Forget the IP's failed attempts. Any block stays in place.
    pub async fn record_success(&self, ip: &str) -> Result<u64, ServiceError> {
        let cleared = self.security.clear_failed_attempts(ip).await?;
        if cleared > 0 {
            tracing::debug!(ip = %ip, cleared, "Cleared failed login attempts");
        }
        Ok(cleared)
    }

    pub async fn state(&self, ip: &str) -> Result<DefenseState, ServiceError> {
        let now = self.clock.now();
        if let Some(block) = self.security.find_active_block(ip, now).await? {
            return Ok(DefenseState::Blocked {
                until: block.blocked_until_utc,
                permanent: block.is_permanent,
            });
        }

        let failed_attempts = self
            .security
            .count_failed_attempts_since(ip, self.window_start(now))
            .await?;
        if failed_attempts >= i64::from(self.config.alert_threshold) {
            Ok(DefenseState::Warned { failed_attempts })
        } else {
            Ok(DefenseState::Clear { failed_attempts })
        }
    }

    // ==================== Admin Operations ====================

    /// Block an IP by hand. `duration_hours == None` blocks permanently.
    /// Replaces whatever block the IP had.
    pub async fn block_ip(
        &self,
        ip: &str,
        reason: String,
        duration_hours: Option<i64>,
        blocked_by: &str,
    ) -> Result<BlockedIp, ServiceError> {
        let now = self.clock.now();
        let block = match duration_hours {
            Some(hours) if hours > 0 => {
                BlockedIp::temporary(ip, reason, 0, now, Duration::hours(hours), blocked_by)
            }
            Some(_) => {
                return Err(ServiceError::ValidationError(
                    "Block duration must be positive".to_string(),
                ))
            }
            None => BlockedIp::permanent(ip, reason, now, blocked_by),
        };

        self.security.replace_block(&block).await?;

        tracing::warn!(ip = %ip, blocked_by = %blocked_by, permanent = block.is_permanent, "IP blocked manually");
        self.log(
            ip,
            SecurityEventType::IpBlocked,
            format!("Blocked by {}: {}", blocked_by, block.reason),
            None,
        )
        .await;

        Ok(block)
    }

    /// Lift the IP's block and forget its failed attempts.
    pub async fn unblock_ip(&self, ip: &str, unblocked_by: &str) -> Result<bool, ServiceError> {
        let removed = self.security.remove_block(ip).await?;
        self.security.clear_failed_attempts(ip).await?;

        if removed {
            tracing::info!(ip = %ip, unblocked_by = %unblocked_by, "IP unblocked");
            self.log(
                ip,
                SecurityEventType::IpUnblocked,
                format!("Unblocked by {}", unblocked_by),
                None,
            )
            .await;
        }

        Ok(removed)
    }

    pub async fn list_blocks(&self) -> Result<Vec<BlockedIp>, ServiceError> {
        self.security.list_blocks().await
    }

    pub async fn recent_failed_attempts(
        &self,
        limit: i64,
    ) -> Result<Vec<FailedLoginAttempt>, ServiceError> {
        self.security.recent_failed_attempts(limit).await
    }

    pub async fn recent_logs(&self, limit: i64) -> Result<Vec<SecurityLog>, ServiceError> {
        self.security.recent_logs(limit).await
    }

    /// Append to the security log. A failed write is logged, never surfaced.
    pub async fn log(
        &self,
        ip: &str,
        event_type: SecurityEventType,
        details: String,
        endpoint: Option<&str>,
    ) {
        let entry = SecurityLog::new(ip, event_type, details, endpoint, self.clock.now());
        if let Err(e) = self.security.append_log(&entry).await {
            tracing::error!(error = %e, event = event_type.as_str(), "Failed to write security log");
        }
    }

    async fn alert(&self, alert: SecurityAlert) {
        let Some(recipient) = self.config.alert_email.as_deref() else {
            tracing::warn!(
                ip = %alert.ip_address,
                severity = alert.severity.as_str(),
                attempts = alert.failed_attempts,
                "Security alert raised with no recipient configured"
            );
            return;
        };

        if let Err(e) = self.email.send_security_alert(recipient, &alert).await {
            tracing::error!(error = %e, ip = %alert.ip_address, "Failed to send security alert");
        }
    }
}
