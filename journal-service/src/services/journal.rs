use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::dtos::resources::{CreateJournalEntryRequest, UpdateJournalEntryRequest};
use crate::models::{chart_drawing::normalize_symbol, JournalEntry, JournalStats, TradeDirection};
use crate::repositories::{JournalRepository, StrategyRepository};
use crate::services::{ProfileService, ServiceError};

/// Trade entries recorded under a user's profiles.
#[derive(Clone)]
pub struct JournalService {
    entries: Arc<dyn JournalRepository>,
    strategies: Arc<dyn StrategyRepository>,
    profiles: ProfileService,
}

impl JournalService {
    pub fn new(
        entries: Arc<dyn JournalRepository>,
        strategies: Arc<dyn StrategyRepository>,
        profiles: ProfileService,
    ) -> Self {
        Self {
            entries,
            strategies,
            profiles,
        }
    }

    async fn check_strategy(&self, user_id: Uuid, strategy_id: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(id) = strategy_id {
            if self.strategies.find(user_id, id).await?.is_none() {
                return Err(ServiceError::NotFound("Strategy not found".to_string()));
            }
        }
        Ok(())
    }

    /// Entries of the given profile, or of the active one. Newest first.
    pub async fn list(
        &self,
        user_id: Uuid,
        profile_id: Option<Uuid>,
    ) -> Result<(Uuid, Vec<JournalEntry>), ServiceError> {
        let profile = self.profiles.resolve(user_id, profile_id).await?;
        let entries = self
            .entries
            .list_for_profile(user_id, profile.profile_id)
            .await?;
        Ok((profile.profile_id, entries))
    }

    pub async fn get(&self, user_id: Uuid, entry_id: Uuid) -> Result<JournalEntry, ServiceError> {
        self.entries
            .find(user_id, entry_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Journal entry not found".to_string()))
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        req: CreateJournalEntryRequest,
    ) -> Result<JournalEntry, ServiceError> {
        let direction: TradeDirection = req
            .direction
            .parse()
            .map_err(ServiceError::ValidationError)?;
        let profile = self.profiles.resolve(user_id, req.profile_id).await?;
        self.check_strategy(user_id, req.strategy_id).await?;

        let now = Utc::now();
        let entry = JournalEntry {
            entry_id: Uuid::new_v4(),
            user_id,
            profile_id: profile.profile_id,
            strategy_id: req.strategy_id,
            symbol: normalize_symbol(&req.symbol),
            direction: direction.as_str().to_string(),
            entry_price: req.entry_price,
            exit_price: req.exit_price,
            quantity: req.quantity,
            pnl: JournalEntry::realized_pnl(direction, req.entry_price, req.exit_price, req.quantity),
            notes: req.notes,
            entry_utc: req.entry_utc.unwrap_or(now),
            exit_utc: req
                .exit_utc
                .or_else(|| req.exit_price.map(|_| now)),
            created_utc: now,
        };

        self.entries.insert(&entry).await?;
        tracing::info!(user_id = %user_id, entry_id = %entry.entry_id, symbol = %entry.symbol, "Journal entry created");
        Ok(entry)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        req: UpdateJournalEntryRequest,
    ) -> Result<JournalEntry, ServiceError> {
        let mut entry = self.get(user_id, entry_id).await?;
        self.check_strategy(user_id, req.strategy_id).await?;

        if req.strategy_id.is_some() {
            entry.strategy_id = req.strategy_id;
        }
        if let Some(quantity) = req.quantity {
            entry.quantity = quantity;
        }
        if let Some(exit_price) = req.exit_price {
            entry.exit_price = Some(exit_price);
            entry.exit_utc = Some(req.exit_utc.unwrap_or_else(Utc::now));
        } else if req.exit_utc.is_some() {
            entry.exit_utc = req.exit_utc;
        }
        if req.notes.is_some() {
            entry.notes = req.notes;
        }

        let direction: TradeDirection = entry
            .direction
            .parse()
            .map_err(ServiceError::ValidationError)?;
        entry.pnl =
            JournalEntry::realized_pnl(direction, entry.entry_price, entry.exit_price, entry.quantity);

        self.entries.update(&entry).await?;
        Ok(entry)
    }

    pub async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> Result<(), ServiceError> {
        if !self.entries.delete(user_id, entry_id).await? {
            return Err(ServiceError::NotFound("Journal entry not found".to_string()));
        }
        Ok(())
    }

    pub async fn stats(
        &self,
        user_id: Uuid,
        profile_id: Option<Uuid>,
    ) -> Result<(Uuid, JournalStats), ServiceError> {
        let (profile_id, entries) = self.list(user_id, profile_id).await?;
        Ok((profile_id, JournalStats::from_entries(&entries)))
    }
}
