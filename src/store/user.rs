use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use super::repository::{Document, Filter, Repository, StoreError, Stored};

/// A stored user account. The password hash never leaves the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: String,
}

impl Document for UserRecord {
    const COLLECTION: &'static str = "users";
}

#[derive(Clone)]
pub struct UserStore {
    repo: Repository<UserRecord>,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repo: Repository::new(pool),
        }
    }

    /// Create a new user. Fails with `Conflict` if the email is taken.
    ///
    /// The pre-check gives the common case a clean answer; the unique index
    /// on email catches the losing side of a concurrent duplicate signup.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Stored<UserRecord>, StoreError> {
        if self.repo.exists(&Filter::new().eq("email", email)).await? {
            return Err(StoreError::Conflict);
        }

        self.repo
            .create(UserRecord {
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            })
            .await
    }

    /// Get a user by email.
    pub async fn by_email(&self, email: &str) -> Result<Stored<UserRecord>, StoreError> {
        self.repo.find_one(&Filter::new().eq("email", email)).await
    }

    /// Get a user by id.
    pub async fn by_id(&self, id: &str) -> Result<Stored<UserRecord>, StoreError> {
        self.repo.find_one(&Filter::by_id(id)).await
    }
}
