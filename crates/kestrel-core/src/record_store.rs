//! System-of-record contract and an in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::clock::{SharedClock, system_clock};
use crate::error::{KestrelError, Result};
use crate::records::{
    NewTodo, NewUser, Todo, TodoFilter, TodoOwner, TodoPatch, User, UserFilter, UserPatch,
    UserSummary,
};
use crate::types::{TodoId, UserId};

/// The system of truth for users and todos.
///
/// This trait abstracts over the relational backend so the cache and
/// invalidation logic can be exercised without a database.
///
/// # Errors
///
/// - `KestrelError::NotFound` when a referenced record is absent
/// - `KestrelError::Conflict` when a unique column would be duplicated
/// - `KestrelError::Unavailable` when the backend cannot be reached
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Looks up a user by id.
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    /// Finds a user other than `excluding` holding either the email or the
    /// username. Used for uniqueness checks before updates.
    async fn find_user_by_email_or_username(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        excluding: Option<UserId>,
    ) -> Result<Option<User>>;

    /// Lists every user, newest first, with their todo counts.
    async fn list_users(&self) -> Result<Vec<UserSummary>>;

    /// Applies a partial update.
    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User>;

    /// Deletes a user and every todo they own.
    async fn delete_user(&self, id: UserId) -> Result<User>;

    /// Counts users matching the filter.
    async fn count_users(&self, filter: UserFilter) -> Result<u64>;

    /// Looks up a todo by id.
    async fn find_todo(&self, id: TodoId) -> Result<Option<Todo>>;

    /// Lists todos matching the filter, newest first.
    async fn list_todos(&self, filter: TodoFilter) -> Result<Vec<Todo>>;

    /// Creates a todo owned by `owner`.
    async fn create_todo(&self, owner: UserId, todo: NewTodo) -> Result<Todo>;

    /// Applies a partial update.
    async fn update_todo(&self, id: TodoId, patch: TodoPatch) -> Result<Todo>;

    /// Deletes a todo.
    async fn delete_todo(&self, id: TodoId) -> Result<Todo>;

    /// Counts todos matching the filter.
    async fn count_todos(&self, filter: TodoFilter) -> Result<u64>;

    /// Verifies the backend is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Name used for logging and health reports.
    fn name(&self) -> &str;
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    todos: BTreeMap<TodoId, Todo>,
    next_user_id: i64,
    next_todo_id: i64,
}

/// Record store kept in process memory.
///
/// Backs the development binary and the test suites. Ids are assigned
/// sequentially starting at 1; ordering of listings is newest first, ties
/// broken by descending id.
#[derive(Debug, Clone)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
    clock: SharedClock,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    /// Creates an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Creates an empty store stamping records with `clock`.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            clock,
        }
    }

    /// Inserts a user, enforcing email and username uniqueness.
    pub fn insert_user(&self, new_user: NewUser) -> Result<User> {
        let now = self.clock.now();
        let mut tables = self.tables.write();

        let taken = tables
            .users
            .values()
            .any(|u| u.email == new_user.email || u.username == new_user.username);
        if taken {
            return Err(KestrelError::conflict("Email or username already taken"));
        }

        tables.next_user_id += 1;
        let user = User {
            id: UserId::new(tables.next_user_id),
            email: new_user.email,
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

fn newest_first<T, K>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, K))
where
    K: Ord,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_user_by_email_or_username(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        excluding: Option<UserId>,
    ) -> Result<Option<User>> {
        if email.is_none() && username.is_none() {
            return Ok(None);
        }

        let tables = self.tables.read();
        let found = tables.users.values().find(|u| {
            Some(u.id) != excluding
                && (email.is_some_and(|e| u.email == e)
                    || username.is_some_and(|n| u.username == n))
        });
        Ok(found.cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let tables = self.tables.read();
        let mut users: Vec<UserSummary> = tables
            .users
            .values()
            .map(|user| UserSummary {
                user: user.clone(),
                todo_count: tables
                    .todos
                    .values()
                    .filter(|t| t.user_id == user.id)
                    .count() as u64,
            })
            .collect();
        newest_first(&mut users, |s| (s.user.created_at, s.user.id));
        Ok(users)
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User> {
        let now = self.clock.now();
        let mut tables = self.tables.write();

        let clash = tables.users.values().any(|u| {
            u.id != id
                && (patch.email.as_deref().is_some_and(|e| u.email == e)
                    || patch.username.as_deref().is_some_and(|n| u.username == n))
        });
        if clash {
            return Err(KestrelError::conflict("Email or username already taken"));
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| KestrelError::user_not_found(id.get()))?;

        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        user.updated_at = now;
        let updated = user.clone();

        // Owner projections embedded in todos follow the user row.
        for todo in tables.todos.values_mut().filter(|t| t.user_id == id) {
            todo.user = TodoOwner {
                id,
                username: updated.username.clone(),
                email: updated.email.clone(),
            };
        }

        Ok(updated)
    }

    async fn delete_user(&self, id: UserId) -> Result<User> {
        let mut tables = self.tables.write();
        let user = tables
            .users
            .remove(&id)
            .ok_or_else(|| KestrelError::user_not_found(id.get()))?;
        tables.todos.retain(|_, todo| todo.user_id != id);
        Ok(user)
    }

    async fn count_users(&self, filter: UserFilter) -> Result<u64> {
        let tables = self.tables.read();
        Ok(tables.users.values().filter(|u| filter.matches(u)).count() as u64)
    }

    async fn find_todo(&self, id: TodoId) -> Result<Option<Todo>> {
        Ok(self.tables.read().todos.get(&id).cloned())
    }

    async fn list_todos(&self, filter: TodoFilter) -> Result<Vec<Todo>> {
        let tables = self.tables.read();
        let mut todos: Vec<Todo> = tables
            .todos
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        newest_first(&mut todos, |t| (t.created_at, t.id));
        Ok(todos)
    }

    async fn create_todo(&self, owner: UserId, todo: NewTodo) -> Result<Todo> {
        let now = self.clock.now();
        let mut tables = self.tables.write();

        let user = tables
            .users
            .get(&owner)
            .ok_or_else(|| KestrelError::user_not_found(owner.get()))?;
        let owner_view = TodoOwner {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        };

        tables.next_todo_id += 1;
        let created = Todo {
            id: TodoId::new(tables.next_todo_id),
            title: todo.title,
            description: todo.description,
            status: todo.status,
            deadline: todo.deadline,
            user_id: owner,
            user: owner_view,
            created_at: now,
            updated_at: now,
        };
        tables.todos.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_todo(&self, id: TodoId, patch: TodoPatch) -> Result<Todo> {
        let now = self.clock.now();
        let mut tables = self.tables.write();
        let todo = tables
            .todos
            .get_mut(&id)
            .ok_or_else(|| KestrelError::todo_not_found(id.get()))?;

        if let Some(title) = patch.title {
            todo.title = title;
        }
        if let Some(description) = patch.description {
            todo.description = Some(description);
        }
        if let Some(status) = patch.status {
            todo.status = status;
        }
        if let Some(deadline) = patch.deadline {
            todo.deadline = Some(deadline);
        }
        todo.updated_at = now;
        Ok(todo.clone())
    }

    async fn delete_todo(&self, id: TodoId) -> Result<Todo> {
        self.tables
            .write()
            .todos
            .remove(&id)
            .ok_or_else(|| KestrelError::todo_not_found(id.get()))
    }

    async fn count_todos(&self, filter: TodoFilter) -> Result<u64> {
        let tables = self.tables.read();
        Ok(tables.todos.values().filter(|t| filter.matches(t)).count() as u64)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, TodoStatus};

    fn store_with_users() -> (InMemoryRecordStore, User, User) {
        let store = InMemoryRecordStore::new();
        let ana = store.insert_user(NewUser::new("ana@example.com", "ana")).unwrap();
        let root = store
            .insert_user(NewUser::new("root@example.com", "root").with_role(Role::Admin))
            .unwrap();
        (store, ana, root)
    }

    #[test]
    fn test_insert_user_rejects_duplicates() {
        let (store, _, _) = store_with_users();
        let err = store
            .insert_user(NewUser::new("ana@example.com", "other"))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_create_and_list_todos() {
        let (store, ana, root) = store_with_users();

        store.create_todo(ana.id, NewTodo::titled("write docs")).await.unwrap();
        store.create_todo(root.id, NewTodo::titled("review")).await.unwrap();

        let mine = store.list_todos(TodoFilter::owned_by(ana.id)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user.username, "ana");

        let all = store.list_todos(TodoFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].title, "review");
    }

    #[tokio::test]
    async fn test_create_todo_for_missing_user() {
        let store = InMemoryRecordStore::new();
        let err = store
            .create_todo(UserId::new(99), NewTodo::titled("orphan"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_user_cascades_todos() {
        let (store, ana, root) = store_with_users();
        store.create_todo(ana.id, NewTodo::titled("a")).await.unwrap();
        store.create_todo(root.id, NewTodo::titled("b")).await.unwrap();

        store.delete_user(ana.id).await.unwrap();

        assert_eq!(store.count_todos(TodoFilter::default()).await.unwrap(), 1);
        assert!(store.find_user(ana.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_conflict() {
        let (store, ana, _) = store_with_users();
        let patch = UserPatch {
            username: Some("root".into()),
            ..UserPatch::default()
        };
        assert!(store.update_user(ana.id, patch).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_find_user_by_email_or_username_excludes_self() {
        let (store, ana, _) = store_with_users();

        let found = store
            .find_user_by_email_or_username(Some("ana@example.com"), None, Some(ana.id))
            .await
            .unwrap();
        assert!(found.is_none());

        let found = store
            .find_user_by_email_or_username(None, Some("root"), Some(ana.id))
            .await
            .unwrap();
        assert_eq!(found.unwrap().username, "root");
    }

    #[tokio::test]
    async fn test_counts_with_filters() {
        let (store, ana, _) = store_with_users();
        let todo = store.create_todo(ana.id, NewTodo::titled("x")).await.unwrap();
        store
            .update_todo(
                todo.id,
                TodoPatch {
                    status: Some(TodoStatus::Completed),
                    ..TodoPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(store.count_users(UserFilter::role(Role::Admin)).await.unwrap(), 1);
        assert_eq!(
            store
                .count_todos(TodoFilter::status(TodoStatus::Completed))
                .await
                .unwrap(),
            1
        );
    }
}
