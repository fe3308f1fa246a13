//! Postgres-backed stores (tables from `magshelf-shared` migrations)

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, MagazineStore, StoreError};
use crate::models::{CredentialRecord, Magazine, MagazineInput, SearchField};

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            "SELECT id, email, name, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id)
        .bind(&record.email)
        .bind(&record.name)
        .bind(&record.password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMagazineStore {
    pool: PgPool,
}

impl PgMagazineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards so the term matches literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl MagazineStore for PgMagazineStore {
    async fn list(&self) -> Result<Vec<Magazine>, StoreError> {
        let magazines = sqlx::query_as::<_, Magazine>(
            "SELECT id, title, price FROM magazines ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(magazines)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Magazine>, StoreError> {
        let magazine =
            sqlx::query_as::<_, Magazine>("SELECT id, title, price FROM magazines WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(magazine)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Magazine>, StoreError> {
        let magazine = sqlx::query_as::<_, Magazine>(
            "SELECT id, title, price FROM magazines WHERE title = $1 LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(magazine)
    }

    async fn find_by_price(&self, price: &str) -> Result<Vec<Magazine>, StoreError> {
        let magazines = sqlx::query_as::<_, Magazine>(
            "SELECT id, title, price FROM magazines WHERE price = $1 ORDER BY created_at ASC",
        )
        .bind(price)
        .fetch_all(&self.pool)
        .await?;

        Ok(magazines)
    }

    async fn search(
        &self,
        field: SearchField,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Magazine>, StoreError> {
        let query = match field {
            SearchField::Title => {
                "SELECT id, title, price FROM magazines WHERE title ILIKE $1 ORDER BY title, created_at LIMIT $2"
            }
        };

        let magazines = sqlx::query_as::<_, Magazine>(query)
            .bind(like_pattern(term))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(magazines)
    }

    async fn create(&self, input: MagazineInput) -> Result<Magazine, StoreError> {
        let magazine = sqlx::query_as::<_, Magazine>(
            r#"
            INSERT INTO magazines (id, title, price)
            VALUES ($1, $2, $3)
            RETURNING id, title, price
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&input.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(magazine)
    }

    async fn update(&self, id: Uuid, input: MagazineInput) -> Result<Option<Magazine>, StoreError> {
        let magazine = sqlx::query_as::<_, Magazine>(
            r#"
            UPDATE magazines
            SET title = $2, price = $3
            WHERE id = $1
            RETURNING id, title, price
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.price)
        .fetch_optional(&self.pool)
        .await?;

        Ok(magazine)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query("DELETE FROM magazines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
