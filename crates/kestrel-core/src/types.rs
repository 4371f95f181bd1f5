//! Identifier newtypes and enumerations shared by every Kestrel crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User identifier.
///
/// # Example
///
/// ```
/// use kestrel_core::UserId;
///
/// let id = UserId::new(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a new user identifier.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Todo identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    /// Creates a new todo identifier.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TodoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Returns true for administrators.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Returns the wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// The authenticated caller of a business operation.
///
/// Produced by the (external) authentication layer and consumed by the
/// services for ownership checks and by the rate limiter for client keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    /// Creates a new actor.
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Returns true if the actor may access records owned by `owner`.
    pub fn can_access(&self, owner: UserId) -> bool {
        self.role.is_admin() || self.id == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_transparently() {
        let json = serde_json::to_string(&UserId::new(7)).unwrap();
        assert_eq!(json, "7");

        let parsed: UserId = "12".parse().unwrap();
        assert_eq!(parsed, UserId::new(12));
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""ADMIN""#);
        let role: Role = serde_json::from_str(r#""USER""#).unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_todo_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&TodoStatus::InProgress).unwrap(),
            r#""IN_PROGRESS""#
        );
    }

    #[test]
    fn test_actor_access() {
        let user = Actor::new(1, Role::User);
        let admin = Actor::new(2, Role::Admin);

        assert!(user.can_access(UserId::new(1)));
        assert!(!user.can_access(UserId::new(3)));
        assert!(admin.can_access(UserId::new(3)));
    }
}
