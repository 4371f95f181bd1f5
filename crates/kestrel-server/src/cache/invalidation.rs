//! Write-invalidate protocol.
//!
//! Every mutation of the record store maps to an [`InvalidationPlan`]; the
//! mutating operation executes the plan after its write succeeds and before
//! it returns.

use glob::Pattern;
use kestrel_core::UserId;
use kestrel_store::StoreError;
use tracing::{info, warn};

use crate::cache::keys::CacheKey;
use crate::cache::service::CacheService;

/// A completed record-store mutation that makes cached data stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    TodoCreated { owner: UserId },
    TodoUpdated { owner: UserId },
    TodoDeleted { owner: UserId },
    UserUpdated { user: UserId },
    UserDeleted { user: UserId },
}

/// Keys to delete plus user namespaces to sweep by pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvalidationPlan {
    pub keys: Vec<CacheKey>,
    pub user_namespaces: Vec<UserId>,
}

impl Mutation {
    /// Returns the cache entries made stale by this mutation.
    ///
    /// # Examples
    ///
    /// ```
    /// use kestrel_core::UserId;
    /// use kestrel_server::cache::{CacheKey, Mutation};
    ///
    /// let plan = Mutation::TodoCreated { owner: UserId::new(3) }.plan();
    /// assert!(plan.keys.contains(&CacheKey::UserTodos(UserId::new(3))));
    /// assert!(plan.keys.contains(&CacheKey::AllTodos));
    /// ```
    pub fn plan(&self) -> InvalidationPlan {
        match *self {
            Self::TodoCreated { owner }
            | Self::TodoUpdated { owner }
            | Self::TodoDeleted { owner } => InvalidationPlan {
                keys: vec![
                    CacheKey::UserTodos(owner),
                    CacheKey::AllTodos,
                    CacheKey::SystemStats,
                ],
                user_namespaces: Vec::new(),
            },
            Self::UserUpdated { user } => InvalidationPlan {
                keys: vec![
                    CacheKey::UserProfile(user),
                    CacheKey::AllUsers,
                    CacheKey::SystemStats,
                ],
                user_namespaces: Vec::new(),
            },
            Self::UserDeleted { user } => InvalidationPlan {
                keys: vec![
                    CacheKey::UserTodos(user),
                    CacheKey::UserProfile(user),
                    CacheKey::AllUsers,
                    CacheKey::AllTodos,
                    CacheKey::SystemStats,
                    CacheKey::Session(user),
                ],
                user_namespaces: vec![user],
            },
        }
    }
}

/// Resultado de una operación de invalidación.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationResult {
    /// Número de entries invalidadas.
    pub count: u64,
    /// Patrones aplicados.
    pub patterns: Vec<String>,
}

impl CacheService {
    /// Executes the invalidation plan of a mutation.
    ///
    /// Store failures are logged and skipped: the mutation has already been
    /// committed and must not be reported as failed.
    pub async fn invalidate(&self, mutation: &Mutation) -> u64 {
        let plan = mutation.plan();
        let mut count = 0;

        for key in &plan.keys {
            count += self.delete(key).await;
        }

        for user in plan.user_namespaces {
            match self.invalidate_user_cache(user).await {
                Ok(result) => count += result.count,
                Err(e) => {
                    warn!(user = %user, error = %e, "User namespace sweep failed");
                    self.metrics().record_store_error("sweep");
                }
            }
        }

        info!(mutation = ?mutation, count = count, "Cache invalidated");
        count
    }

    /// Removes every key under `user:{id}:`, located by pattern scan.
    pub async fn invalidate_user_cache(
        &self,
        user: UserId,
    ) -> Result<InvalidationResult, StoreError> {
        self.invalidate_by_pattern(&CacheKey::user_namespace(user))
            .await
    }

    /// Invalida entradas usando un patrón glob (`*`, `?`, `[...]`).
    ///
    /// The pattern is validated locally before any key is scanned. Intended
    /// for operational use; cost grows with the size of the store.
    pub async fn invalidate_by_pattern(
        &self,
        pattern: &str,
    ) -> Result<InvalidationResult, StoreError> {
        Pattern::new(pattern).map_err(|e| StoreError::invalid_pattern(pattern, e.msg))?;

        let keys = self.store().keys_matching(pattern).await?;
        let count = self.store().delete_many(&keys).await?;
        self.metrics().record_invalidated(count);

        info!(
            pattern = %pattern,
            count = count,
            "Cache entries invalidated by pattern"
        );

        Ok(InvalidationResult {
            count,
            patterns: vec![pattern.to_string()],
        })
    }

    /// Invalida múltiples patrones a la vez.
    pub async fn invalidate_by_patterns(
        &self,
        patterns: &[&str],
    ) -> Result<InvalidationResult, StoreError> {
        let mut total = InvalidationResult::default();

        for pattern in patterns {
            let result = self.invalidate_by_pattern(pattern).await?;
            total.count += result.count;
            total.patterns.extend(result.patterns);
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheTtls;
    use kestrel_store::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    async fn populated(user: UserId) -> (CacheService, MemoryStore) {
        let store = MemoryStore::new(1_000);
        let cache = CacheService::new(Arc::new(store.clone()), CacheTtls::default());

        for key in [
            CacheKey::UserTodos(user),
            CacheKey::UserProfile(user),
            CacheKey::AllUsers,
            CacheKey::AllTodos,
            CacheKey::SystemStats,
        ] {
            store.set(&key.to_string(), "[]", None).await.unwrap();
        }
        (cache, store)
    }

    #[test]
    fn test_user_deleted_plan_covers_session_and_namespace() {
        let user = UserId::new(5);
        let plan = Mutation::UserDeleted { user }.plan();

        assert!(plan.keys.contains(&CacheKey::Session(user)));
        assert!(plan.keys.contains(&CacheKey::AllTodos));
        assert_eq!(plan.user_namespaces, vec![user]);
    }

    #[test]
    fn test_user_updated_plan_leaves_todos_alone() {
        let plan = Mutation::UserUpdated { user: UserId::new(1) }.plan();
        assert!(!plan.keys.contains(&CacheKey::AllTodos));
        assert!(plan.keys.contains(&CacheKey::UserProfile(UserId::new(1))));
    }

    #[tokio::test]
    async fn test_todo_mutation_keeps_profile() {
        let user = UserId::new(2);
        let (cache, store) = populated(user).await;

        cache.invalidate(&Mutation::TodoUpdated { owner: user }).await;

        assert!(!store.exists("user:2:todos").await.unwrap());
        assert!(!store.exists("admin:all-todos").await.unwrap());
        assert!(!store.exists("admin:system-stats").await.unwrap());
        assert!(store.exists("user:2:profile").await.unwrap());
        assert!(store.exists("admin:all-users").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_deleted_sweeps_unknown_subkeys() {
        let user = UserId::new(5);
        let (cache, store) = populated(user).await;
        store.set("user:5:preferences", "{}", None).await.unwrap();
        store.set("user:50:todos", "[]", None).await.unwrap();

        cache.invalidate(&Mutation::UserDeleted { user }).await;

        assert!(store.keys_matching("user:5:*").await.unwrap().is_empty());
        assert!(store.exists("user:50:todos").await.unwrap());
        assert_eq!(store.db_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_during_outage_does_not_fail() {
        let user = UserId::new(8);
        let (cache, store) = populated(user).await;
        store.simulate_outage(true);

        assert_eq!(cache.invalidate(&Mutation::UserDeleted { user }).await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_by_patterns() {
        let (cache, _) = populated(UserId::new(1)).await;

        let result = cache
            .invalidate_by_patterns(&["user:1:*", "admin:all-*"])
            .await
            .unwrap();

        assert_eq!(result.count, 4);
        assert_eq!(result.patterns, vec!["user:1:*", "admin:all-*"]);
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_rejected() {
        let (cache, _) = populated(UserId::new(1)).await;
        let err = cache.invalidate_by_pattern("user:[").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPattern { .. }));
    }
}
