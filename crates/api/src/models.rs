//! Domain records and request/response bodies

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user as held by the credential store.
/// Not `Serialize`: the password hash must never reach a response body.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CredentialRecord {
    pub id: Uuid,
    /// Unique, case-sensitive email
    pub email: String,
    pub name: Option<String>,
    /// PHC-encoded Argon2 hash of password + pepper
    pub password_hash: String,
}

/// Public view of the current user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<CredentialRecord> for UserProfile {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            name: record.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Magazine {
    pub id: Uuid,
    pub title: String,
    pub price: String,
}

/// Body for create and update
#[derive(Debug, Clone, Deserialize)]
pub struct MagazineInput {
    pub title: String,
    pub price: String,
}

impl MagazineInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title cannot be empty".to_string());
        }
        if self.title.len() > 256 {
            return Err("title must be at most 256 characters".to_string());
        }
        if self.price.trim().is_empty() {
            return Err("price cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Fields accepted by magazine search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
}

impl std::str::FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SearchField::Title),
            other => Err(format!("cannot search on field '{}'", other)),
        }
    }
}
