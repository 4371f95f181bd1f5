//! Kestrel Core - Domain types and traits
//!
//! This crate provides the foundational types shared by the Kestrel store
//! adapters and server: record shapes, the record store contract, the error
//! taxonomy and the clock abstraction.

pub mod clock;
pub mod error;
pub mod record_store;
pub mod records;
pub mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
pub use error::{KestrelError, Result};
pub use record_store::{InMemoryRecordStore, RecordStore};
pub use records::{
    NewTodo, NewUser, SystemStats, Todo, TodoFilter, TodoOwner, TodoPatch, User, UserDetail,
    UserFilter, UserPatch, UserSummary,
};
pub use types::{Actor, Role, TodoId, TodoStatus, UserId};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
