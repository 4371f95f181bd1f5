//! Record shapes returned by the record store and cached by the server.
//!
//! Every record serializes to camelCase JSON; this is the representation
//! stored in the key-value cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Role, TodoId, TodoStatus, UserId};

/// Public view of a user account (never carries credentials).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User row of the admin listing, with the number of todos owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    pub todo_count: u64,
}

/// A user together with every todo they own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub todos: Vec<Todo>,
}

/// Owner projection embedded in every todo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoOwner {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// A todo item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub user_id: UserId,
    pub user: TodoOwner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for account creation (seeding and registration flows).
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

impl NewUser {
    /// Creates a regular user with the given email and username.
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Partial update of a user. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    /// Returns true if the patch touches a unique column.
    pub fn touches_identity(&self) -> bool {
        self.email.is_some() || self.username.is_some()
    }
}

/// Input for todo creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TodoStatus,
    pub deadline: Option<DateTime<Utc>>,
}

impl NewTodo {
    /// Creates a pending todo with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a todo.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Filter for user counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
}

impl UserFilter {
    /// Matches users with the given role.
    pub fn role(role: Role) -> Self {
        Self { role: Some(role) }
    }

    /// Returns true if `user` passes the filter.
    pub fn matches(&self, user: &User) -> bool {
        self.role.is_none_or(|role| user.role == role)
    }
}

/// Filter for todo listings and counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TodoFilter {
    pub user_id: Option<UserId>,
    pub status: Option<TodoStatus>,
}

impl TodoFilter {
    /// Matches todos owned by `user_id`.
    pub fn owned_by(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            status: None,
        }
    }

    /// Matches todos in the given status.
    pub fn status(status: TodoStatus) -> Self {
        Self {
            user_id: None,
            status: Some(status),
        }
    }

    /// Returns true if `todo` passes the filter.
    pub fn matches(&self, todo: &Todo) -> bool {
        self.user_id.is_none_or(|id| todo.user_id == id)
            && self.status.is_none_or(|status| todo.status == status)
    }
}

/// Aggregate counters shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: u64,
    pub total_todos: u64,
    pub admin_users: u64,
    pub regular_users: u64,
    pub completed_todos: u64,
    pub pending_todos: u64,
}

impl SystemStats {
    /// Derives the complementary counters from the four raw counts.
    pub fn from_counts(
        total_users: u64,
        total_todos: u64,
        admin_users: u64,
        completed_todos: u64,
    ) -> Self {
        Self {
            total_users,
            total_todos,
            admin_users,
            regular_users: total_users.saturating_sub(admin_users),
            completed_todos,
            pending_todos: total_todos.saturating_sub(completed_todos),
        }
    }
}
