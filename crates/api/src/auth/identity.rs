//! Resolve the authenticated caller to a live user record

use std::sync::Arc;

use crate::error::ApiError;
use crate::models::CredentialRecord;
use crate::store::{CredentialStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The token is valid but the account is gone
    #[error("Identity not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotFound => ApiError::IdentityNotFound,
            IdentityError::Store(e) => e.into(),
        }
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn CredentialStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Look up the record behind a validated identity claim
    pub async fn resolve(&self, identity: &str) -> Result<CredentialRecord, IdentityError> {
        match self.store.find_by_email(identity).await? {
            Some(record) => Ok(record),
            None => {
                tracing::info!(email = %identity, "Authenticated identity has no account");
                Err(IdentityError::NotFound)
            }
        }
    }
}
