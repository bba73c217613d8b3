use async_trait::async_trait;
use thiserror::Error;

use super::model::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique constraint on `email` rejected the write.
    #[error("email already registered")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records, keyed by unique email.
///
/// Implementations own the uniqueness invariant: of two concurrent `save`
/// calls with the same email exactly one succeeds and the other returns
/// [`StoreError::DuplicateEmail`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user, assigning its id and creation time.
    async fn save(&self, user: NewUser) -> Result<User, StoreError>;

    /// Find a user by (normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}
