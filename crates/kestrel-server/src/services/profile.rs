//! Self-service profile operations.

use std::sync::Arc;

use kestrel_core::{KestrelError, RecordStore, Result, User, UserId, UserPatch};

use super::ensure_identity_free;
use crate::cache::{CacheKey, CacheService, Mutation};

#[derive(Clone)]
pub struct ProfileService {
    records: Arc<dyn RecordStore>,
    cache: CacheService,
}

impl ProfileService {
    pub fn new(records: Arc<dyn RecordStore>, cache: CacheService) -> Self {
        Self { records, cache }
    }

    /// Cached profile of a user.
    pub async fn get_profile(&self, user: UserId) -> Result<User> {
        let ttl = self.cache.ttls().user_profile();
        self.cache
            .get_or_compute(&CacheKey::UserProfile(user), ttl, || async {
                self.records
                    .find_user(user)
                    .await?
                    .ok_or_else(|| KestrelError::user_not_found(user.get()))
            })
            .await
    }

    /// Updates the caller's own profile after the uniqueness check.
    pub async fn update_profile(&self, user: UserId, patch: UserPatch) -> Result<User> {
        ensure_identity_free(self.records.as_ref(), user, &patch).await?;

        let updated = self.records.update_user(user, patch).await?;
        self.cache.invalidate(&Mutation::UserUpdated { user }).await;
        Ok(updated)
    }

    /// Deletes the caller's account with everything it owns.
    pub async fn delete_profile(&self, user: UserId) -> Result<User> {
        let deleted = self.records.delete_user(user).await?;
        self.cache.invalidate(&Mutation::UserDeleted { user }).await;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheTtls;
    use kestrel_core::{InMemoryRecordStore, NewUser};
    use kestrel_store::MemoryStore;

    fn service() -> (ProfileService, CacheService, InMemoryRecordStore) {
        let records = InMemoryRecordStore::new();
        let cache = CacheService::new(Arc::new(MemoryStore::new(1_000)), CacheTtls::default());
        let profiles = ProfileService::new(Arc::new(records.clone()), cache.clone());
        (profiles, cache, records)
    }

    #[tokio::test]
    async fn test_profile_is_cached_and_refreshed_on_update() {
        let (profiles, cache, records) = service();
        let user = records.insert_user(NewUser::new("a@x.io", "ana")).unwrap();

        profiles.get_profile(user.id).await.unwrap();
        assert!(cache.exists(&CacheKey::UserProfile(user.id)).await);

        let patch = UserPatch {
            first_name: Some("Ana".into()),
            ..UserPatch::default()
        };
        profiles.update_profile(user.id, patch).await.unwrap();
        assert!(!cache.exists(&CacheKey::UserProfile(user.id)).await);

        let fresh = profiles.get_profile(user.id).await.unwrap();
        assert_eq!(fresh.first_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_taken_username_conflicts() {
        let (profiles, _, records) = service();
        let ana = records.insert_user(NewUser::new("a@x.io", "ana")).unwrap();
        records.insert_user(NewUser::new("b@x.io", "bo")).unwrap();

        let patch = UserPatch {
            username: Some("bo".into()),
            ..UserPatch::default()
        };
        let err = profiles.update_profile(ana.id, patch).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_cached() {
        let (profiles, cache, _) = service();
        let ghost = UserId::new(12);

        assert!(profiles.get_profile(ghost).await.unwrap_err().is_not_found());
        assert!(!cache.exists(&CacheKey::UserProfile(ghost)).await);
    }
}
