//! In-process stores

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, MagazineStore, StoreError};
use crate::models::{CredentialRecord, Magazine, MagazineInput, SearchField};

#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user, as if the account had been deleted elsewhere
    pub async fn remove(&self, email: &str) -> bool {
        self.users.write().await.remove(email).is_some()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&record.email) {
            return Err(StoreError::Conflict(format!(
                "user {} already exists",
                record.email
            )));
        }
        users.insert(record.email.clone(), record);
        Ok(())
    }
}

/// Magazines in insertion order
#[derive(Default)]
pub struct InMemoryMagazineStore {
    magazines: RwLock<Vec<Magazine>>,
}

impl InMemoryMagazineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MagazineStore for InMemoryMagazineStore {
    async fn list(&self) -> Result<Vec<Magazine>, StoreError> {
        Ok(self.magazines.read().await.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Magazine>, StoreError> {
        Ok(self
            .magazines
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Magazine>, StoreError> {
        Ok(self
            .magazines
            .read()
            .await
            .iter()
            .find(|m| m.title == title)
            .cloned())
    }

    async fn find_by_price(&self, price: &str) -> Result<Vec<Magazine>, StoreError> {
        Ok(self
            .magazines
            .read()
            .await
            .iter()
            .filter(|m| m.price == price)
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        field: SearchField,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Magazine>, StoreError> {
        let needle = term.to_lowercase();
        let mut hits: Vec<Magazine> = self
            .magazines
            .read()
            .await
            .iter()
            .filter(|m| match field {
                SearchField::Title => m.title.to_lowercase().contains(&needle),
            })
            .cloned()
            .collect();

        // Same order as the Postgres store: title, then creation
        hits.sort_by(|a, b| a.title.cmp(&b.title));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn create(&self, input: MagazineInput) -> Result<Magazine, StoreError> {
        let magazine = Magazine {
            id: Uuid::new_v4(),
            title: input.title,
            price: input.price,
        };
        self.magazines.write().await.push(magazine.clone());
        Ok(magazine)
    }

    async fn update(&self, id: Uuid, input: MagazineInput) -> Result<Option<Magazine>, StoreError> {
        let mut magazines = self.magazines.write().await;
        let Some(existing) = magazines.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        existing.title = input.title;
        existing.price = input.price;
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut magazines = self.magazines.write().await;
        let before = magazines.len();
        magazines.retain(|m| m.id != id);
        Ok(magazines.len() < before)
    }
}
