//! Administrative user and todo management.

use std::sync::Arc;

use kestrel_core::{
    KestrelError, RecordStore, Result, Role, SystemStats, Todo, TodoFilter, TodoStatus, User,
    UserDetail, UserFilter, UserId, UserPatch, UserSummary,
};
use tracing::info;

use super::ensure_identity_free;
use crate::cache::{CacheKey, CacheService, Mutation};

#[derive(Clone)]
pub struct AdminService {
    records: Arc<dyn RecordStore>,
    cache: CacheService,
}

impl AdminService {
    pub fn new(records: Arc<dyn RecordStore>, cache: CacheService) -> Self {
        Self { records, cache }
    }

    pub async fn get_all_users(&self) -> Result<Vec<UserSummary>> {
        let ttl = self.cache.ttls().all_users();
        self.cache
            .get_or_compute(&CacheKey::AllUsers, ttl, || self.records.list_users())
            .await
    }

    /// User with all of their todos. Always read from the record store.
    pub async fn get_user_by_id(&self, id: UserId) -> Result<UserDetail> {
        let user = self.require_user(id).await?;
        let todos = self.records.list_todos(TodoFilter::owned_by(id)).await?;
        Ok(UserDetail { user, todos })
    }

    pub async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User> {
        self.require_user(id).await?;
        ensure_identity_free(self.records.as_ref(), id, &patch).await?;

        let updated = self.records.update_user(id, patch).await?;
        self.cache.invalidate(&Mutation::UserUpdated { user: id }).await;
        Ok(updated)
    }

    /// Deletes a user and evicts everything cached about them, session
    /// included.
    pub async fn delete_user(&self, id: UserId) -> Result<User> {
        self.require_user(id).await?;

        let deleted = self.records.delete_user(id).await?;
        let evicted = self.cache.invalidate(&Mutation::UserDeleted { user: id }).await;
        info!(user = %id, evicted = evicted, "User deleted");
        Ok(deleted)
    }

    pub async fn get_all_todos(&self) -> Result<Vec<Todo>> {
        let ttl = self.cache.ttls().all_todos();
        self.cache
            .get_or_compute(&CacheKey::AllTodos, ttl, || {
                self.records.list_todos(TodoFilter::default())
            })
            .await
    }

    /// Dashboard counters; the four counts are fetched concurrently.
    pub async fn get_system_stats(&self) -> Result<SystemStats> {
        let ttl = self.cache.ttls().system_stats();
        self.cache
            .get_or_compute(&CacheKey::SystemStats, ttl, || async {
                let (total_users, total_todos, admin_users, completed_todos) = tokio::try_join!(
                    self.records.count_users(UserFilter::default()),
                    self.records.count_todos(TodoFilter::default()),
                    self.records.count_users(UserFilter::role(Role::Admin)),
                    self.records
                        .count_todos(TodoFilter::status(TodoStatus::Completed)),
                )?;
                Ok::<_, KestrelError>(SystemStats::from_counts(
                    total_users,
                    total_todos,
                    admin_users,
                    completed_todos,
                ))
            })
            .await
    }

    async fn require_user(&self, id: UserId) -> Result<User> {
        self.records
            .find_user(id)
            .await?
            .ok_or_else(|| KestrelError::user_not_found(id.get()))
    }
}
