use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::dtos::resources::{CreateProfileRequest, UpdateProfileRequest};
use crate::models::Profile;
use crate::repositories::ProfileRepository;
use crate::services::ServiceError;

/// Profile rules: unique names per user and exactly one active profile.
#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Profile not found".to_string())
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Profile>, ServiceError> {
        self.profiles.list_for_user(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, profile_id: Uuid) -> Result<Profile, ServiceError> {
        self.profiles
            .find(user_id, profile_id)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn active(&self, user_id: Uuid) -> Result<Profile, ServiceError> {
        self.profiles
            .find_active(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No active profile".to_string()))
    }

    /// Resolve an explicit profile id, falling back to the active profile.
    pub async fn resolve(
        &self,
        user_id: Uuid,
        profile_id: Option<Uuid>,
    ) -> Result<Profile, ServiceError> {
        match profile_id {
            Some(id) => self.get(user_id, id).await,
            None => self.active(user_id).await,
        }
    }

    /// The first profile a user creates becomes active.
    pub async fn create(
        &self,
        user_id: Uuid,
        req: CreateProfileRequest,
    ) -> Result<Profile, ServiceError> {
        let is_first = self.profiles.find_active(user_id).await?.is_none();
        let profile = Profile::new(
            user_id,
            req.name.trim().to_string(),
            req.mode,
            req.description,
            is_first,
        );

        self.profiles.insert(&profile).await?;
        tracing::info!(user_id = %user_id, profile_id = %profile.profile_id, "Profile created");
        Ok(profile)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        profile_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<Profile, ServiceError> {
        let mut profile = self.get(user_id, profile_id).await?;

        if let Some(name) = req.name {
            profile.name = name.trim().to_string();
        }
        if let Some(mode) = req.mode {
            profile.mode = mode.as_str().to_string();
        }
        if req.description.is_some() {
            profile.description = req.description;
        }
        profile.updated_utc = Utc::now();

        self.profiles.update(&profile).await?;
        Ok(profile)
    }

    pub async fn activate(&self, user_id: Uuid, profile_id: Uuid) -> Result<Profile, ServiceError> {
        if !self.profiles.activate(user_id, profile_id).await? {
            return Err(not_found());
        }
        tracing::info!(user_id = %user_id, profile_id = %profile_id, "Profile activated");
        self.get(user_id, profile_id).await
    }

    /// Delete a profile. Returns the id of the profile activated in its
    /// place when the deleted one was active.
    pub async fn delete(&self, user_id: Uuid, profile_id: Uuid) -> Result<Option<Uuid>, ServiceError> {
        let activated = self.profiles.delete(user_id, profile_id).await?;
        tracing::info!(
            user_id = %user_id,
            profile_id = %profile_id,
            activated = ?activated,
            "Profile deleted"
        );
        Ok(activated)
    }
}
