#![allow(dead_code)]
use kestrel_core::{InMemoryRecordStore, NewUser, Role, User};

/// Builds a store seeded with one regular user and one administrator.
pub fn seeded_store() -> (InMemoryRecordStore, User, User) {
    let store = InMemoryRecordStore::new();
    let user = store
        .insert_user(NewUser::new("john@example.com", "john"))
        .expect("Failed to seed regular user");
    let admin = store
        .insert_user(NewUser::new("admin@example.com", "admin").with_role(Role::Admin))
        .expect("Failed to seed admin user");
    (store, user, admin)
}
