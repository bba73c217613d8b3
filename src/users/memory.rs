//! In-memory user store for development and tests.
//!
//! Selected when no `DATABASE_URL` is configured. Data lives for the
//! lifetime of the process only.

use std::collections::{hash_map::Entry, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    model::{NewUser, User},
    store::{StoreError, UserStore},
};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>, // email -> user
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl InMemoryUserStore {
    /// Drop a user by email. Not part of [`UserStore`]; stands in for
    /// out-of-band deletion.
    pub async fn remove(&self, email: &str) -> Option<User> {
        self.users.write().await.remove(email)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn save(&self, user: NewUser) -> Result<User, StoreError> {
        // The check and the insert happen under one write guard.
        let mut users = self.users.write().await;
        match users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let stored = User {
                    id: Uuid::new_v4(),
                    name: user.name,
                    email: user.email,
                    password_hash: user.password_hash,
                    role: user.role,
                    avatar: user.avatar,
                    created_at: OffsetDateTime::now_utc(),
                };
                Ok(slot.insert(stored).clone())
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }
}
