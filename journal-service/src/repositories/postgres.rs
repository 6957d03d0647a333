//! PostgreSQL implementation of the repositories.
//!
//! Multi-statement writes run inside a transaction; returning early with an
//! error drops the transaction, which rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{
    ChartDrawingRepository, FeatureFlagRepository, JournalRepository, ProfileRepository,
    RepoResult, SecurityRepository, StrategyRepository, UserRepository, LAST_PROFILE,
};
use crate::models::{
    BlockedIp, ChartDrawing, FailedLoginAttempt, FeatureFlag, JournalEntry, Profile,
    SecurityLog, Strategy, User,
};
use crate::services::ServiceError;

const PROFILE_NAME_TAKEN: &str = "A profile with this name already exists";
const STRATEGY_NAME_TAKEN: &str = "A strategy with this name already exists";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ==================== User Operations ====================

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, user_id: Uuid) -> RepoResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_with_profile(&self, user: &User, profile: &Profile) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, display_name, password_hash, is_admin,
                               email_verified, verification_code_hash, verification_expires_utc,
                               created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.email_verified)
        .bind(&user.verification_code_hash)
        .bind(user.verification_expires_utc)
        .bind(user.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| ServiceError::from_db(e, "Email already registered"))?;

        insert_profile(&mut tx, profile).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> RepoResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("UPDATE users SET last_login_utc = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_verification_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query(
            "UPDATE users SET verification_code_hash = $2, verification_expires_utc = $3 WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_email_verified(&self, user_id: Uuid) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE, verification_code_hash = NULL, verification_expires_utc = NULL
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_reset_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query(
            "UPDATE users SET reset_code_hash = $2, reset_expires_utc = $3 WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete_password_reset(&self, user_id: Uuid, password_hash: &str) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_code_hash = NULL, reset_expires_utc = NULL
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE users SET is_admin = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(is_admin)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> RepoResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_utc ASC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }
}

// ==================== Profile Operations ====================

async fn insert_profile(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    profile: &Profile,
) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO profiles (profile_id, user_id, name, mode, description, is_active,
                              created_utc, updated_utc)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(profile.profile_id)
    .bind(profile.user_id)
    .bind(&profile.name)
    .bind(&profile.mode)
    .bind(&profile.description)
    .bind(profile.is_active)
    .bind(profile.created_utc)
    .bind(profile.updated_utc)
    .execute(&mut **tx)
    .await
    .map_err(|e| ServiceError::from_db(e, PROFILE_NAME_TAKEN))?;
    Ok(())
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Profile>> {
        Ok(sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles WHERE user_id = $1 ORDER BY created_utc ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<Option<Profile>> {
        Ok(sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles WHERE user_id = $1 AND profile_id = $2",
        )
        .bind(user_id)
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_active(&self, user_id: Uuid) -> RepoResult<Option<Profile>> {
        Ok(sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert(&self, profile: &Profile) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_profile(&mut tx, profile).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, profile: &Profile) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE profiles
            SET name = $3, mode = $4, description = $5, updated_utc = $6
            WHERE user_id = $1 AND profile_id = $2
            "#,
        )
        .bind(profile.user_id)
        .bind(profile.profile_id)
        .bind(&profile.name)
        .bind(&profile.mode)
        .bind(&profile.description)
        .bind(profile.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| ServiceError::from_db(e, PROFILE_NAME_TAKEN))?;
        Ok(())
    }

    async fn activate(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE profiles SET is_active = FALSE, updated_utc = NOW() WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE profiles SET is_active = TRUE, updated_utc = NOW() WHERE user_id = $1 AND profile_id = $2",
        )
        .bind(user_id)
        .bind(profile_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction restores the previously active profile.
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<Option<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let was_active: Option<bool> = sqlx::query_scalar(
            "DELETE FROM profiles WHERE user_id = $1 AND profile_id = $2 RETURNING is_active",
        )
        .bind(user_id)
        .bind(profile_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(was_active) = was_active else {
            return Err(ServiceError::NotFound("Profile not found".to_string()));
        };

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if remaining == 0 {
            return Err(ServiceError::ValidationError(LAST_PROFILE.to_string()));
        }

        let activated = if was_active {
            sqlx::query_scalar::<_, Uuid>(
                r#"
                UPDATE profiles SET is_active = TRUE, updated_utc = NOW()
                WHERE profile_id = (
                    SELECT profile_id FROM profiles
                    WHERE user_id = $1
                    ORDER BY created_utc ASC
                    LIMIT 1
                )
                RETURNING profile_id
                "#,
            )
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        } else {
            None
        };

        tx.commit().await?;
        Ok(activated)
    }
}

// ==================== Strategy Operations ====================

#[async_trait]
impl StrategyRepository for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Strategy>> {
        Ok(sqlx::query_as::<_, Strategy>(
            "SELECT * FROM strategies WHERE user_id = $1 ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find(&self, user_id: Uuid, strategy_id: Uuid) -> RepoResult<Option<Strategy>> {
        Ok(sqlx::query_as::<_, Strategy>(
            "SELECT * FROM strategies WHERE user_id = $1 AND strategy_id = $2",
        )
        .bind(user_id)
        .bind(strategy_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert(&self, strategy: &Strategy) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO strategies (strategy_id, user_id, name, description, rules, is_active,
                                    created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(strategy.strategy_id)
        .bind(strategy.user_id)
        .bind(&strategy.name)
        .bind(&strategy.description)
        .bind(&strategy.rules)
        .bind(strategy.is_active)
        .bind(strategy.created_utc)
        .bind(strategy.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| ServiceError::from_db(e, STRATEGY_NAME_TAKEN))?;
        Ok(())
    }

    async fn update(&self, strategy: &Strategy) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE strategies
            SET name = $3, description = $4, rules = $5, is_active = $6, updated_utc = $7
            WHERE user_id = $1 AND strategy_id = $2
            "#,
        )
        .bind(strategy.user_id)
        .bind(strategy.strategy_id)
        .bind(&strategy.name)
        .bind(&strategy.description)
        .bind(&strategy.rules)
        .bind(strategy.is_active)
        .bind(strategy.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| ServiceError::from_db(e, STRATEGY_NAME_TAKEN))?;
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, strategy_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM strategies WHERE user_id = $1 AND strategy_id = $2")
            .bind(user_id)
            .bind(strategy_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Chart Drawing Operations ====================

#[async_trait]
impl ChartDrawingRepository for PgStore {
    async fn find(
        &self,
        user_id: Uuid,
        symbol: &str,
        session_id: Option<&str>,
    ) -> RepoResult<Option<ChartDrawing>> {
        Ok(sqlx::query_as::<_, ChartDrawing>(
            r#"
            SELECT * FROM chart_drawings
            WHERE user_id = $1 AND symbol = $2 AND session_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert(&self, drawing: &ChartDrawing) -> RepoResult<ChartDrawing> {
        Ok(sqlx::query_as::<_, ChartDrawing>(
            r#"
            INSERT INTO chart_drawings (drawing_id, user_id, symbol, session_id, drawings, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, symbol, (COALESCE(session_id, '')))
            DO UPDATE SET drawings = EXCLUDED.drawings, updated_utc = EXCLUDED.updated_utc
            RETURNING *
            "#,
        )
        .bind(drawing.drawing_id)
        .bind(drawing.user_id)
        .bind(&drawing.symbol)
        .bind(&drawing.session_id)
        .bind(&drawing.drawings)
        .bind(drawing.updated_utc)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete(
        &self,
        user_id: Uuid,
        symbol: &str,
        session_id: Option<&str>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM chart_drawings
            WHERE user_id = $1 AND symbol = $2 AND session_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Journal Operations ====================

#[async_trait]
impl JournalRepository for PgStore {
    async fn list_for_profile(
        &self,
        user_id: Uuid,
        profile_id: Uuid,
    ) -> RepoResult<Vec<JournalEntry>> {
        Ok(sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT * FROM journal_entries
            WHERE user_id = $1 AND profile_id = $2
            ORDER BY entry_utc DESC
            "#,
        )
        .bind(user_id)
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<Option<JournalEntry>> {
        Ok(sqlx::query_as::<_, JournalEntry>(
            "SELECT * FROM journal_entries WHERE user_id = $1 AND entry_id = $2",
        )
        .bind(user_id)
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert(&self, entry: &JournalEntry) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO journal_entries (entry_id, user_id, profile_id, strategy_id, symbol,
                                         direction, entry_price, exit_price, quantity, pnl, notes,
                                         entry_utc, exit_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.user_id)
        .bind(entry.profile_id)
        .bind(entry.strategy_id)
        .bind(&entry.symbol)
        .bind(&entry.direction)
        .bind(entry.entry_price)
        .bind(entry.exit_price)
        .bind(entry.quantity)
        .bind(entry.pnl)
        .bind(&entry.notes)
        .bind(entry.entry_utc)
        .bind(entry.exit_utc)
        .bind(entry.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, entry: &JournalEntry) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE journal_entries
            SET strategy_id = $3, symbol = $4, direction = $5, entry_price = $6, exit_price = $7,
                quantity = $8, pnl = $9, notes = $10, entry_utc = $11, exit_utc = $12
            WHERE user_id = $1 AND entry_id = $2
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.entry_id)
        .bind(entry.strategy_id)
        .bind(&entry.symbol)
        .bind(&entry.direction)
        .bind(entry.entry_price)
        .bind(entry.exit_price)
        .bind(entry.quantity)
        .bind(entry.pnl)
        .bind(&entry.notes)
        .bind(entry.entry_utc)
        .bind(entry.exit_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM journal_entries WHERE user_id = $1 AND entry_id = $2")
            .bind(user_id)
            .bind(entry_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Feature Flag Operations ====================

#[async_trait]
impl FeatureFlagRepository for PgStore {
    async fn list(&self) -> RepoResult<Vec<FeatureFlag>> {
        Ok(
            sqlx::query_as::<_, FeatureFlag>("SELECT * FROM feature_flags ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn upsert(&self, flag: &FeatureFlag) -> RepoResult<FeatureFlag> {
        Ok(sqlx::query_as::<_, FeatureFlag>(
            r#"
            INSERT INTO feature_flags (name, description, enabled, updated_utc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET description = COALESCE(EXCLUDED.description, feature_flags.description),
                enabled = EXCLUDED.enabled,
                updated_utc = EXCLUDED.updated_utc
            RETURNING *
            "#,
        )
        .bind(&flag.name)
        .bind(&flag.description)
        .bind(flag.enabled)
        .bind(flag.updated_utc)
        .fetch_one(&self.pool)
        .await?)
    }
}

// ==================== Security Operations ====================

#[async_trait]
impl SecurityRepository for PgStore {
    async fn record_failed_attempt(&self, attempt: &FailedLoginAttempt) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO failed_login_attempts (attempt_id, ip_address, email_attempted,
                                               attempted_utc, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(attempt.attempt_id)
        .bind(&attempt.ip_address)
        .bind(&attempt.email_attempted)
        .bind(attempt.attempted_utc)
        .bind(&attempt.user_agent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_failed_attempts_since(&self, ip: &str, since: DateTime<Utc>) -> RepoResult<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM failed_login_attempts WHERE ip_address = $1 AND attempted_utc >= $2",
        )
        .bind(ip)
        .bind(since)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn clear_failed_attempts(&self, ip: &str) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM failed_login_attempts WHERE ip_address = $1")
            .bind(ip)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn recent_failed_attempts(&self, limit: i64) -> RepoResult<Vec<FailedLoginAttempt>> {
        Ok(sqlx::query_as::<_, FailedLoginAttempt>(
            "SELECT * FROM failed_login_attempts ORDER BY attempted_utc DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_active_block(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<BlockedIp>> {
        Ok(sqlx::query_as::<_, BlockedIp>(
            r#"
            SELECT * FROM blocked_ips
            WHERE ip_address = $1
              AND (is_permanent = TRUE OR blocked_until_utc > $2)
            "#,
        )
        .bind(ip)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_block(&self, block: &BlockedIp, now: DateTime<Utc>) -> RepoResult<bool> {
        // The unique index on ip_address serializes concurrent inserts; the
        // conditional update only replaces a row whose block has lapsed.
        let result = sqlx::query(
            r#"
            INSERT INTO blocked_ips (block_id, ip_address, reason, blocked_utc, blocked_until_utc,
                                     failed_attempts, is_permanent, blocked_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (ip_address) DO UPDATE
            SET block_id = EXCLUDED.block_id,
                reason = EXCLUDED.reason,
                blocked_utc = EXCLUDED.blocked_utc,
                blocked_until_utc = EXCLUDED.blocked_until_utc,
                failed_attempts = EXCLUDED.failed_attempts,
                is_permanent = EXCLUDED.is_permanent,
                blocked_by = EXCLUDED.blocked_by
            WHERE blocked_ips.is_permanent = FALSE
              AND blocked_ips.blocked_until_utc IS NOT NULL
              AND blocked_ips.blocked_until_utc <= $9
            "#,
        )
        .bind(block.block_id)
        .bind(&block.ip_address)
        .bind(&block.reason)
        .bind(block.blocked_utc)
        .bind(block.blocked_until_utc)
        .bind(block.failed_attempts)
        .bind(block.is_permanent)
        .bind(&block.blocked_by)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn replace_block(&self, block: &BlockedIp) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO blocked_ips (block_id, ip_address, reason, blocked_utc, blocked_until_utc,
                                     failed_attempts, is_permanent, blocked_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (ip_address) DO UPDATE
            SET block_id = EXCLUDED.block_id,
                reason = EXCLUDED.reason,
                blocked_utc = EXCLUDED.blocked_utc,
                blocked_until_utc = EXCLUDED.blocked_until_utc,
                failed_attempts = EXCLUDED.failed_attempts,
                is_permanent = EXCLUDED.is_permanent,
                blocked_by = EXCLUDED.blocked_by
            "#,
        )
        .bind(block.block_id)
        .bind(&block.ip_address)
        .bind(&block.reason)
        .bind(block.blocked_utc)
        .bind(block.blocked_until_utc)
        .bind(block.failed_attempts)
        .bind(block.is_permanent)
        .bind(&block.blocked_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_block(&self, ip: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM blocked_ips WHERE ip_address = $1")
            .bind(ip)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_blocks(&self) -> RepoResult<Vec<BlockedIp>> {
        Ok(
            sqlx::query_as::<_, BlockedIp>("SELECT * FROM blocked_ips ORDER BY blocked_utc DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn append_log(&self, log: &SecurityLog) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_logs (log_id, ip_address, event_type, details, endpoint, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(log.log_id)
        .bind(&log.ip_address)
        .bind(&log.event_type)
        .bind(&log.details)
        .bind(&log.endpoint)
        .bind(log.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_logs(&self, limit: i64) -> RepoResult<Vec<SecurityLog>> {
        Ok(sqlx::query_as::<_, SecurityLog>(
            "SELECT * FROM security_logs ORDER BY created_utc DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}
