//! Business services that read through the cache and invalidate on writes.
//!
//! Each mutating operation follows the same order: authorization and
//! conflict checks, the record-store write, then the invalidation plan of
//! the mutation.

mod admin;
mod profile;
mod todos;

pub use admin::AdminService;
pub use profile::ProfileService;
pub use todos::TodoService;

use kestrel_core::{KestrelError, RecordStore, Result, UserId, UserPatch};

/// Rejects a patch that would take another user's email or username.
pub(crate) async fn ensure_identity_free(
    records: &dyn RecordStore,
    user: UserId,
    patch: &UserPatch,
) -> Result<()> {
    if !patch.touches_identity() {
        return Ok(());
    }

    let taken = records
        .find_user_by_email_or_username(
            patch.email.as_deref(),
            patch.username.as_deref(),
            Some(user),
        )
        .await?;

    match taken {
        Some(_) => Err(KestrelError::conflict(
            "Email or username already exists",
        )),
        None => Ok(()),
    }
}
