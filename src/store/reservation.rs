use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use super::repository::{Document, Filter, Repository, StoreError, Stored, Update};

/// A stored reservation. `user_id` is a back-reference to the owning user;
/// deleting a reservation never touches the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub place_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    pub user_id: String,
}

impl Document for Reservation {
    const COLLECTION: &'static str = "reservations";
}

/// Reservation access, always scoped to the owning user.
#[derive(Clone)]
pub struct ReservationStore {
    repo: Repository<Reservation>,
}

impl ReservationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repo: Repository::new(pool),
        }
    }

    fn owned(id: &str, user_id: &str) -> Filter {
        Filter::by_id(id).eq("user_id", user_id)
    }

    pub async fn create(&self, reservation: Reservation) -> Result<Stored<Reservation>, StoreError> {
        self.repo.create(reservation).await
    }

    /// Get one reservation owned by the given user.
    pub async fn get(&self, id: &str, user_id: &str) -> Result<Stored<Reservation>, StoreError> {
        self.repo.find_one(&Self::owned(id, user_id)).await
    }

    /// All reservations owned by the given user, in unspecified order.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Stored<Reservation>>, StoreError> {
        self.repo
            .find_many(&Filter::new().eq("user_id", user_id))
            .await
    }

    /// Atomically update one reservation owned by the given user.
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        update: &Update,
    ) -> Result<Stored<Reservation>, StoreError> {
        self.repo
            .find_one_and_update(&Self::owned(id, user_id), update)
            .await
    }

    /// Atomically delete one reservation owned by the given user, returning
    /// its last stored state.
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<Stored<Reservation>, StoreError> {
        self.repo.find_one_and_delete(&Self::owned(id, user_id)).await
    }
}
