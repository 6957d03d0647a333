//! Repository interfaces, one per aggregate.
//!
//! Each trait returns plain model structs. `PgStore` backs them with
//! PostgreSQL; `InMemoryStore` keeps everything behind a mutex for tests
//! and local runs.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    BlockedIp, ChartDrawing, FailedLoginAttempt, FeatureFlag, JournalEntry, Profile,
    SecurityLog, Strategy, User,
};
use crate::services::ServiceError;

pub type RepoResult<T> = Result<T, ServiceError>;

const LAST_PROFILE: &str = "Cannot delete the last remaining profile";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> RepoResult<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// Insert a user together with its first profile in one transaction.
    /// Fails with `Conflict` when the email is taken.
    async fn create_with_profile(&self, user: &User, profile: &Profile) -> RepoResult<()>;

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> RepoResult<()>;

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> RepoResult<()>;

    async fn set_verification_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Marks the email verified and clears the pending code.
    async fn mark_email_verified(&self, user_id: Uuid) -> RepoResult<()>;

    async fn set_reset_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Sets the new hash and clears the reset code.
    async fn complete_password_reset(&self, user_id: Uuid, password_hash: &str) -> RepoResult<()>;

    async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> RepoResult<bool>;

    async fn list(&self, limit: i64, offset: i64) -> RepoResult<Vec<User>>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Oldest first.
    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Profile>>;

    async fn find(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<Option<Profile>>;

    async fn find_active(&self, user_id: Uuid) -> RepoResult<Option<Profile>>;

    /// Fails with `Conflict` when the user already has a profile of that name.
    async fn insert(&self, profile: &Profile) -> RepoResult<()>;

    /// Persists name, mode and description. Fails with `Conflict` on a duplicate name.
    async fn update(&self, profile: &Profile) -> RepoResult<()>;

    /// Makes `profile_id` the only active profile of the user.
    async fn activate(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<bool>;

    /// Deletes the profile; when it was active, activates the oldest remaining
    /// one in the same transaction and returns its id. Refuses to delete the
    /// user's last profile.
    async fn delete(&self, user_id: Uuid, profile_id: Uuid) -> RepoResult<Option<Uuid>>;
}

#[async_trait]
pub trait StrategyRepository: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Strategy>>;

    async fn find(&self, user_id: Uuid, strategy_id: Uuid) -> RepoResult<Option<Strategy>>;

    async fn insert(&self, strategy: &Strategy) -> RepoResult<()>;

    async fn update(&self, strategy: &Strategy) -> RepoResult<()>;

    async fn delete(&self, user_id: Uuid, strategy_id: Uuid) -> RepoResult<bool>;
}

#[async_trait]
pub trait ChartDrawingRepository: Send + Sync {
    /// Exact key match: `None` only matches the session-less record.
    async fn find(
        &self,
        user_id: Uuid,
        symbol: &str,
        session_id: Option<&str>,
    ) -> RepoResult<Option<ChartDrawing>>;

    /// Insert or replace the drawings stored under the natural key.
    async fn upsert(&self, drawing: &ChartDrawing) -> RepoResult<ChartDrawing>;

    async fn delete(
        &self,
        user_id: Uuid,
        symbol: &str,
        session_id: Option<&str>,
    ) -> RepoResult<bool>;
}

#[async_trait]
pub trait JournalRepository: Send + Sync {
    /// Newest first.
    async fn list_for_profile(&self, user_id: Uuid, profile_id: Uuid)
        -> RepoResult<Vec<JournalEntry>>;

    async fn find(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<Option<JournalEntry>>;

    async fn insert(&self, entry: &JournalEntry) -> RepoResult<()>;

    async fn update(&self, entry: &JournalEntry) -> RepoResult<()>;

    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<bool>;
}

#[async_trait]
pub trait FeatureFlagRepository: Send + Sync {
    async fn list(&self) -> RepoResult<Vec<FeatureFlag>>;

    async fn upsert(&self, flag: &FeatureFlag) -> RepoResult<FeatureFlag>;
}

#[async_trait]
pub trait SecurityRepository: Send + Sync {
    async fn record_failed_attempt(&self, attempt: &FailedLoginAttempt) -> RepoResult<()>;

    async fn count_failed_attempts_since(&self, ip: &str, since: DateTime<Utc>) -> RepoResult<i64>;

    /// Deletes every attempt recorded for the IP, returning how many went.
    async fn clear_failed_attempts(&self, ip: &str) -> RepoResult<u64>;

    async fn recent_failed_attempts(&self, limit: i64) -> RepoResult<Vec<FailedLoginAttempt>>;

    async fn find_active_block(&self, ip: &str, now: DateTime<Utc>)
        -> RepoResult<Option<BlockedIp>>;

    /// Insert a block unless an active one exists for the same IP. An expired
    /// row for the IP is replaced. Returns whether this call created the block.
    async fn insert_block(&self, block: &BlockedIp, now: DateTime<Utc>) -> RepoResult<bool>;

    /// Write the block in one statement, overwriting any row for the IP.
    async fn replace_block(&self, block: &BlockedIp) -> RepoResult<()>;

    async fn remove_block(&self, ip: &str) -> RepoResult<bool>;

    async fn list_blocks(&self) -> RepoResult<Vec<BlockedIp>>;

    async fn append_log(&self, log: &SecurityLog) -> RepoResult<()>;

    /// Newest first.
    async fn recent_logs(&self, limit: i64) -> RepoResult<Vec<SecurityLog>>;
}

/// The full set of stores the service talks to.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub strategies: Arc<dyn StrategyRepository>,
    pub charts: Arc<dyn ChartDrawingRepository>,
    pub journal: Arc<dyn JournalRepository>,
    pub flags: Arc<dyn FeatureFlagRepository>,
    pub security: Arc<dyn SecurityRepository>,
}

impl Repositories {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + ProfileRepository
            + StrategyRepository
            + ChartDrawingRepository
            + JournalRepository
            + FeatureFlagRepository
            + SecurityRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            profiles: store.clone(),
            strategies: store.clone(),
            charts: store.clone(),
            journal: store.clone(),
            flags: store.clone(),
            security: store,
        }
    }

    pub fn postgres(store: PgStore) -> Self {
        Self::from_store(Arc::new(store))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }

    /// Share one in-memory store so tests can inspect it directly.
    pub fn from_memory(store: Arc<InMemoryStore>) -> Self {
        Self::from_store(store)
    }
}
