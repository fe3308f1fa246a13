//! Storage capabilities consumed by the API
//!
//! Each capability is a single trait with one implementation per backend:
//! [`memory`] for development and tests, [`postgres`] for deployments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{CredentialRecord, Magazine, MagazineInput, SearchField};

pub use memory::{InMemoryCredentialStore, InMemoryMagazineStore};
pub use postgres::{PgCredentialStore, PgMagazineStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Read access to user credentials. Users are created out of band; `insert`
/// exists for seeding.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn insert(&self, record: CredentialRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MagazineStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Magazine>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Magazine>, StoreError>;

    async fn find_by_title(&self, title: &str) -> Result<Option<Magazine>, StoreError>;

    async fn find_by_price(&self, price: &str) -> Result<Vec<Magazine>, StoreError>;

    /// Case-insensitive substring match, at most `limit` results
    async fn search(
        &self,
        field: SearchField,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Magazine>, StoreError>;

    async fn create(&self, input: MagazineInput) -> Result<Magazine, StoreError>;

    /// `None` when no magazine has this id
    async fn update(&self, id: Uuid, input: MagazineInput) -> Result<Option<Magazine>, StoreError>;

    /// `false` when no magazine has this id
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
