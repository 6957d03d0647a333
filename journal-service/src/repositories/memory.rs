//! In-process store backing the test suite.
//!
//! Every operation takes the single state lock, so compound writes such as
//! `insert_block` and profile deletion are atomic just like their
//! transactional PostgreSQL counterparts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
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

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    profiles: Vec<Profile>,
    strategies: Vec<Strategy>,
    charts: Vec<ChartDrawing>,
    journal: Vec<JournalEntry>,
    flags: HashMap<String, FeatureFlag>,
    failed_attempts: Vec<FailedLoginAttempt>,
    blocks: HashMap<String, BlockedIp>,
    logs: Vec<SecurityLog>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Store lock poisoned: {}", e)))
    }

    /// Number of block rows held for an IP, active or not.
    pub fn block_rows_for(&self, ip: &str) -> usize {
        self.state
            .lock()
            .map(|s| usize::from(s.blocks.contains_key(ip)))
            .unwrap_or_default()
    }

    /// Security log rows of the given type, oldest first.
    pub fn logs_of_type(&self, event_type: &str) -> Vec<SecurityLog> {
        self.state
            .lock()
            .map(|s| {
                s.logs
                    .iter()
                    .filter(|l| l.event_type == event_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shift every stored failed attempt for an IP back in time.
    pub fn age_failed_attempts(&self, ip: &str, by: chrono::Duration) {
        if let Ok(mut state) = self.state.lock() {
            for attempt in state.failed_attempts.iter_mut().filter(|a| a.ip_address == ip) {
                attempt.attempted_utc -= by;
            }
        }
    }
}

fn profile_name_taken(state: &State, profile: &Profile) -> bool {
    state.profiles.iter().any(|p| {
        p.user_id == profile.user_id && p.name == profile.name && p.profile_id != profile.profile_id
    })
}

// ==================== Users ====================

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, user_id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let state = self.lock()?;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_with_profile(&self, user: &User, profile: &Profile) -> RepoResult<()> {
        let mut state = self.lock()?;
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }
        state.users.insert(user.user_id, user.clone());
        state.profiles.push(profile.clone());
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> RepoResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&user_id) {
            user.last_login_utc = Some(at);
        }
        Ok(())
    }

    async fn set_verification_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires: DateTime<Utc>,
    ) -> RepoResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&user_id) {
            user.verification_code_hash = Some(code_hash.to_string());
            user.verification_expires_utc = Some(expires);
        }
        Ok(())
    }

    async fn mark_email_verified(&self, user_id: Uuid) -> RepoResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&user_id) {
            user.email_verified = true;
            user.verification_code_hash = None;
            user.verification_expires_utc = None;
        }
        Ok(())
    }

    async fn set_reset_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires: DateTime<Utc>,
    ) -> RepoResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&user_id) {
            user.reset_code_hash = Some(code_hash.to_string());
            user.reset_expires_utc = Some(expires);
        }
        Ok(())
    }

    async fn complete_password_reset(&self, user_id: Uuid, password_hash: &str) -> RepoResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
            user.reset_code_hash = None;
            user.reset_expires_utc = None;
        }
        Ok(())
    }

    async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> RepoResult<bool> {
        Ok(match self.lock()?.users.get_mut(&user_id) {
            Some(user) => {
                user.is_admin = is_admin;
                true
            }
            None => false,
        })
    }

    async fn list(&self, limit: i64, offset: i64) -> RepoResult<Vec<User>> {
        let state = self.lock()?;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_utc);
        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

// ==================== Profiles ====================

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Profile>> {
        let state = self.lock()?;
        let mut profiles: Vec<Profile> = state
            .profiles
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        profiles.sort_by_key(|p| p.created_utc);
        Ok(profiles)
    }

    async fn find(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<Option<Profile>> {
        let state = self.lock()?;
        Ok(state
            .profiles
            .iter()
            .find(|p| p.user_id == user_id && p.profile_id == profile_id)
            .cloned())
    }

    async fn find_active(&self, user_id: Uuid) -> RepoResult<Option<Profile>> {
        let state = self.lock()?;
        Ok(state
            .profiles
            .iter()
            .find(|p| p.user_id == user_id && p.is_active)
            .cloned())
    }

    async fn insert(&self, profile: &Profile) -> RepoResult<()> {
        let mut state = self.lock()?;
        if profile_name_taken(&state, profile) {
            return Err(ServiceError::Conflict(
                "A profile with this name already exists".to_string(),
            ));
        }
        state.profiles.push(profile.clone());
        Ok(())
    }

    async fn update(&self, profile: &Profile) -> RepoResult<()> {
        let mut state = self.lock()?;
        if profile_name_taken(&state, profile) {
            return Err(ServiceError::Conflict(
                "A profile with this name already exists".to_string(),
            ));
        }
        if let Some(existing) = state
            .profiles
            .iter_mut()
            .find(|p| p.user_id == profile.user_id && p.profile_id == profile.profile_id)
        {
            existing.name = profile.name.clone();
            existing.mode = profile.mode.clone();
            existing.description = profile.description.clone();
            existing.updated_utc = profile.updated_utc;
        }
        Ok(())
    }

    async fn activate(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<bool> {
        let mut state = self.lock()?;
        if !state
            .profiles
            .iter()
            .any(|p| p.user_id == user_id && p.profile_id == profile_id)
        {
            return Ok(false);
        }
        let now = Utc::now();
        for profile in state.profiles.iter_mut().filter(|p| p.user_id == user_id) {
            let active = profile.profile_id == profile_id;
            if profile.is_active != active {
                profile.is_active = active;
                profile.updated_utc = now;
            }
        }
        Ok(true)
    }

    async fn delete(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<Option<Uuid>> {
        let mut state = self.lock()?;
        let position = state
            .profiles
            .iter()
            .position(|p| p.user_id == user_id && p.profile_id == profile_id)
            .ok_or_else(|| ServiceError::NotFound("Profile not found".to_string()))?;

        let owned = state.profiles.iter().filter(|p| p.user_id == user_id).count();
        if owned <= 1 {
            return Err(ServiceError::ValidationError(LAST_PROFILE.to_string()));
        }

        let removed = state.profiles.remove(position);
        state
            .journal
            .retain(|e| !(e.user_id == user_id && e.profile_id == profile_id));

        if !removed.is_active {
            return Ok(None);
        }

        let next = state
            .profiles
            .iter_mut()
            .filter(|p| p.user_id == user_id)
            .min_by_key(|p| p.created_utc);
        Ok(next.map(|p| {
            p.is_active = true;
            p.updated_utc = Utc::now();
            p.profile_id
        }))
    }
}

// ==================== Strategies ====================

#[async_trait]
impl StrategyRepository for InMemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Strategy>> {
        let state = self.lock()?;
        let mut strategies: Vec<Strategy> = state
            .strategies
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        strategies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(strategies)
    }

    async fn find(&self, user_id: Uuid, strategy_id: Uuid) -> RepoResult<Option<Strategy>> {
        let state = self.lock()?;
        Ok(state
            .strategies
            .iter()
            .find(|s| s.user_id == user_id && s.strategy_id == strategy_id)
            .cloned())
    }

    async fn insert(&self, strategy: &Strategy) -> RepoResult<()> {
        let mut state = self.lock()?;
        if state
            .strategies
            .iter()
            .any(|s| s.user_id == strategy.user_id && s.name == strategy.name)
        {
            return Err(ServiceError::Conflict(
                "A strategy with this name already exists".to_string(),
            ));
        }
        state.strategies.push(strategy.clone());
        Ok(())
    }

    async fn update(&self, strategy: &Strategy) -> RepoResult<()> {
        let mut state = self.lock()?;
        if state.strategies.iter().any(|s| {
            s.user_id == strategy.user_id
                && s.name == strategy.name
                && s.strategy_id != strategy.strategy_id
        }) {
            return Err(ServiceError::Conflict(
                "A strategy with this name already exists".to_string(),
            ));
        }
        if let Some(existing) = state
            .strategies
            .iter_mut()
            .find(|s| s.user_id == strategy.user_id && s.strategy_id == strategy.strategy_id)
        {
            *existing = strategy.clone();
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, strategy_id: Uuid) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.strategies.len();
        state
            .strategies
            .retain(|s| !(s.user_id == user_id && s.strategy_id == strategy_id));
        let deleted = state.strategies.len() < before;
        if deleted {
            for entry in state
                .journal
                .iter_mut()
                .filter(|e| e.strategy_id == Some(strategy_id))
            {
                entry.strategy_id = None;
            }
        }
        Ok(deleted)
    }
}

// ==================== Chart Drawings ====================

#[async_trait]
impl ChartDrawingRepository for InMemoryStore {
    async fn find(
        &self,
        user_id: Uuid,
        symbol: &str,
        session_id: Option<&str>,
    ) -> RepoResult<Option<ChartDrawing>> {
        let state = self.lock()?;
        Ok(state
            .charts
            .iter()
            .find(|c| c.matches_key(user_id, symbol, session_id))
            .cloned())
    }

    async fn upsert(&self, drawing: &ChartDrawing) -> RepoResult<ChartDrawing> {
        let mut state = self.lock()?;
        let key = drawing.session_id.as_deref();
        if let Some(existing) = state
            .charts
            .iter_mut()
            .find(|c| c.matches_key(drawing.user_id, &drawing.symbol, key))
        {
            existing.drawings = drawing.drawings.clone();
            existing.updated_utc = drawing.updated_utc;
            return Ok(existing.clone());
        }
        state.charts.push(drawing.clone());
        Ok(drawing.clone())
    }

    async fn delete(
        &self,
        user_id: Uuid,
        symbol: &str,
        session_id: Option<&str>,
    ) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.charts.len();
        state
            .charts
            .retain(|c| !c.matches_key(user_id, symbol, session_id));
        Ok(state.charts.len() < before)
    }
}

// ==================== Journal ====================

#[async_trait]
impl JournalRepository for InMemoryStore {
    async fn list_for_profile(
        &self,
        user_id: Uuid,
        profile_id: Uuid,
    ) -> RepoResult<Vec<JournalEntry>> {
        let state = self.lock()?;
        let mut entries: Vec<JournalEntry> = state
            .journal
            .iter()
            .filter(|e| e.user_id == user_id && e.profile_id == profile_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.entry_utc.cmp(&a.entry_utc));
        Ok(entries)
    }

    async fn find(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<Option<JournalEntry>> {
        let state = self.lock()?;
        Ok(state
            .journal
            .iter()
            .find(|e| e.user_id == user_id && e.entry_id == entry_id)
            .cloned())
    }

    async fn insert(&self, entry: &JournalEntry) -> RepoResult<()> {
        self.lock()?.journal.push(entry.clone());
        Ok(())
    }

    async fn update(&self, entry: &JournalEntry) -> RepoResult<()> {
        let mut state = self.lock()?;
        if let Some(existing) = state
            .journal
            .iter_mut()
            .find(|e| e.user_id == entry.user_id && e.entry_id == entry.entry_id)
        {
            *existing = entry.clone();
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.journal.len();
        state
            .journal
            .retain(|e| !(e.user_id == user_id && e.entry_id == entry_id));
        Ok(state.journal.len() < before)
    }
}

// ==================== Feature Flags ====================

#[async_trait]
impl FeatureFlagRepository for InMemoryStore {
    async fn list(&self) -> RepoResult<Vec<FeatureFlag>> {
        let state = self.lock()?;
        let mut flags: Vec<FeatureFlag> = state.flags.values().cloned().collect();
        flags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(flags)
    }

    async fn upsert(&self, flag: &FeatureFlag) -> RepoResult<FeatureFlag> {
        let mut state = self.lock()?;
        let stored = state
            .flags
            .entry(flag.name.clone())
            .and_modify(|existing| {
                if flag.description.is_some() {
                    existing.description = flag.description.clone();
                }
                existing.enabled = flag.enabled;
                existing.updated_utc = flag.updated_utc;
            })
            .or_insert_with(|| flag.clone());
        Ok(stored.clone())
    }
}

// ==================== Security ====================

#[async_trait]
impl SecurityRepository for InMemoryStore {
    async fn record_failed_attempt(&self, attempt: &FailedLoginAttempt) -> RepoResult<()> {
        self.lock()?.failed_attempts.push(attempt.clone());
        Ok(())
    }

    async fn count_failed_attempts_since(&self, ip: &str, since: DateTime<Utc>) -> RepoResult<i64> {
        let state = self.lock()?;
        Ok(state
            .failed_attempts
            .iter()
            .filter(|a| a.ip_address == ip && a.attempted_utc >= since)
            .count() as i64)
    }

    async fn clear_failed_attempts(&self, ip: &str) -> RepoResult<u64> {
        let mut state = self.lock()?;
        let before = state.failed_attempts.len();
        state.failed_attempts.retain(|a| a.ip_address != ip);
        Ok((before - state.failed_attempts.len()) as u64)
    }

    async fn recent_failed_attempts(&self, limit: i64) -> RepoResult<Vec<FailedLoginAttempt>> {
        let state = self.lock()?;
        let mut attempts = state.failed_attempts.clone();
        attempts.sort_by(|a, b| b.attempted_utc.cmp(&a.attempted_utc));
        attempts.truncate(limit.max(0) as usize);
        Ok(attempts)
    }

    async fn find_active_block(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<BlockedIp>> {
        let state = self.lock()?;
        Ok(state
            .blocks
            .get(ip)
            .filter(|b| b.is_active_at(now))
            .cloned())
    }

    async fn insert_block(&self, block: &BlockedIp, now: DateTime<Utc>) -> RepoResult<bool> {
        let mut state = self.lock()?;
        if state
            .blocks
            .get(&block.ip_address)
            .is_some_and(|existing| existing.is_active_at(now))
        {
            return Ok(false);
        }
        state.blocks.insert(block.ip_address.clone(), block.clone());
        Ok(true)
    }

    async fn replace_block(&self, block: &BlockedIp) -> RepoResult<()> {
        self.lock()?
            .blocks
            .insert(block.ip_address.clone(), block.clone());
        Ok(())
    }

    async fn remove_block(&self, ip: &str) -> RepoResult<bool> {
        Ok(self.lock()?.blocks.remove(ip).is_some())
    }

    async fn list_blocks(&self) -> RepoResult<Vec<BlockedIp>> {
        let state = self.lock()?;
        let mut blocks: Vec<BlockedIp> = state.blocks.values().cloned().collect();
        blocks.sort_by(|a, b| b.blocked_utc.cmp(&a.blocked_utc));
        Ok(blocks)
    }

    async fn append_log(&self, log: &SecurityLog) -> RepoResult<()> {
        self.lock()?.logs.push(log.clone());
        Ok(())
    }

    async fn recent_logs(&self, limit: i64) -> RepoResult<Vec<SecurityLog>> {
        let state = self.lock()?;
        Ok(state
            .logs
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
