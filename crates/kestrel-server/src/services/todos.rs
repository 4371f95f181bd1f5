//! Todo operations.

use std::sync::Arc;

use kestrel_core::{
    Actor, KestrelError, NewTodo, RecordStore, Result, Todo, TodoFilter, TodoId, TodoPatch,
    UserId,
};
use tracing::debug;

use crate::cache::{CacheKey, CacheService, Mutation};

#[derive(Clone)]
pub struct TodoService {
    records: Arc<dyn RecordStore>,
    cache: CacheService,
}

impl TodoService {
    pub fn new(records: Arc<dyn RecordStore>, cache: CacheService) -> Self {
        Self { records, cache }
    }

    /// Creates a todo owned by the actor.
    pub async fn create(&self, actor: &Actor, todo: NewTodo) -> Result<Todo> {
        let created = self.records.create_todo(actor.id, todo).await?;
        self.cache
            .invalidate(&Mutation::TodoCreated { owner: actor.id })
            .await;
        Ok(created)
    }

    /// Admins see every todo, users their own list. Both are read through
    /// the cache.
    pub async fn find_all(&self, actor: &Actor) -> Result<Vec<Todo>> {
        let (key, ttl, filter) = if actor.role.is_admin() {
            (
                CacheKey::AllTodos,
                self.cache.ttls().all_todos(),
                TodoFilter::default(),
            )
        } else {
            (
                CacheKey::UserTodos(actor.id),
                self.cache.ttls().user_todos(),
                TodoFilter::owned_by(actor.id),
            )
        };

        self.cache
            .get_or_compute(&key, ttl, || self.records.list_todos(filter))
            .await
    }

    /// Loads one todo, enforcing ownership for non-admins.
    pub async fn find_one(&self, actor: &Actor, id: TodoId) -> Result<Todo> {
        let todo = self
            .records
            .find_todo(id)
            .await?
            .ok_or_else(|| KestrelError::todo_not_found(id.get()))?;

        if !actor.can_access(todo.user_id) {
            debug!(actor = %actor.id, todo = %id, "Todo access denied");
            return Err(KestrelError::forbidden("You can only access your own todos"));
        }
        Ok(todo)
    }

    pub async fn update(&self, actor: &Actor, id: TodoId, patch: TodoPatch) -> Result<Todo> {
        let existing = self.find_one(actor, id).await?;
        let updated = self.records.update_todo(id, patch).await?;
        self.cache
            .invalidate(&Mutation::TodoUpdated {
                owner: existing.user_id,
            })
            .await;
        Ok(updated)
    }

    pub async fn remove(&self, actor: &Actor, id: TodoId) -> Result<Todo> {
        let existing = self.find_one(actor, id).await?;
        let removed = self.records.delete_todo(id).await?;
        self.cache
            .invalidate(&Mutation::TodoDeleted {
                owner: existing.user_id,
            })
            .await;
        Ok(removed)
    }

    /// Lists another user's todos straight from the record store.
    pub async fn find_by_user(&self, actor: &Actor, user: UserId) -> Result<Vec<Todo>> {
        if !actor.can_access(user) {
            return Err(KestrelError::forbidden("You can only access your own todos"));
        }
        self.records.list_todos(TodoFilter::owned_by(user)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheTtls;
    use kestrel_core::{InMemoryRecordStore, NewUser, Role};
    use kestrel_store::MemoryStore;

    fn service() -> (TodoService, InMemoryRecordStore) {
        let records = InMemoryRecordStore::new();
        let cache = CacheService::new(Arc::new(MemoryStore::new(1_000)), CacheTtls::default());
        (TodoService::new(Arc::new(records.clone()), cache), records)
    }

    #[tokio::test]
    async fn test_created_todo_shows_up_in_cached_list() {
        let (todos, records) = service();
        let user = records.insert_user(NewUser::new("a@x.io", "a")).unwrap();
        let actor = Actor::new(user.id, Role::User);

        // Prime the cache with an empty list
        assert!(todos.find_all(&actor).await.unwrap().is_empty());

        todos.create(&actor, NewTodo::titled("write docs")).await.unwrap();

        let listed = todos.find_all(&actor).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "write docs");
    }

    #[tokio::test]
    async fn test_foreign_todo_is_forbidden() {
        let (todos, records) = service();
        let owner = records.insert_user(NewUser::new("o@x.io", "o")).unwrap();
        let other = records.insert_user(NewUser::new("p@x.io", "p")).unwrap();
        let todo = todos
            .create(&Actor::new(owner.id, Role::User), NewTodo::titled("mine"))
            .await
            .unwrap();

        let intruder = Actor::new(other.id, Role::User);
        let err = todos.find_one(&intruder, todo.id).await.unwrap_err();
        assert!(err.is_forbidden());

        let err = todos.remove(&intruder, todo.id).await.unwrap_err();
        assert!(err.is_forbidden());
        assert!(records.find_todo(todo.id).await.unwrap().is_some());

        let admin = Actor::new(UserId::new(999), Role::Admin);
        assert_eq!(todos.find_one(&admin, todo.id).await.unwrap().id, todo.id);
    }

    #[tokio::test]
    async fn test_find_by_user_checks_ownership() {
        let (todos, records) = service();
        let owner = records.insert_user(NewUser::new("q@x.io", "q")).unwrap();
        let other = records.insert_user(NewUser::new("r@x.io", "r")).unwrap();
        let owner_actor = Actor::new(owner.id, Role::User);
        todos.create(&owner_actor, NewTodo::titled("one")).await.unwrap();
        todos.create(&owner_actor, NewTodo::titled("two")).await.unwrap();

        assert_eq!(todos.find_by_user(&owner_actor, owner.id).await.unwrap().len(), 2);

        let err = todos
            .find_by_user(&Actor::new(other.id, Role::User), owner.id)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        let admin = Actor::new(UserId::new(999), Role::Admin);
        let listed = todos.find_by_user(&admin, owner.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|todo| todo.user_id == owner.id));
        assert!(todos.find_by_user(&admin, other.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_todo() {
        let (todos, _) = service();
        let actor = Actor::new(UserId::new(1), Role::User);

        let err = todos
            .update(&actor, TodoId::new(77), TodoPatch::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
