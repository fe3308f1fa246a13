//! Login-time credential check

use std::sync::Arc;

use super::password::{self, PasswordError};
use crate::error::{ApiError, ApiResult};
use crate::models::CredentialRecord;
use crate::store::CredentialStore;

/// Verifies an email/password pair against the credential store.
///
/// Unknown email and wrong password both come back as
/// [`ApiError::CredentialMismatch`] after one Argon2 evaluation.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    pepper: Arc<str>,
    decoy_hash: Arc<str>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>, pepper: &str) -> Result<Self, PasswordError> {
        Ok(Self {
            store,
            pepper: Arc::from(pepper),
            decoy_hash: Arc::from(password::generate_impossible_hash()?),
        })
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<CredentialRecord> {
        let record = self.store.find_by_email(email).await.map_err(|e| {
            ApiError::Internal(format!("Credential lookup failed: {}", e))
        })?;

        let stored_hash = match &record {
            Some(record) => record.password_hash.clone(),
            None => self.decoy_hash.to_string(),
        };

        let pepper = self.pepper.clone();
        let password = password.to_string();
        let matched = tokio::task::spawn_blocking(move || {
            password::verify_password(&password, &stored_hash, &pepper)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Password verification task failed: {}", e)))?;

        match record {
            Some(record) if matched => Ok(record),
            Some(_) => {
                tracing::warn!(action = "login_failed", reason = "wrong_password", "Login rejected");
                Err(ApiError::CredentialMismatch)
            }
            None => {
                tracing::warn!(action = "login_failed", reason = "unknown_email", "Login rejected");
                Err(ApiError::CredentialMismatch)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCredentialStore;
    use uuid::Uuid;

    const PEPPER: &str = "test-pepper";

    async fn verifier_with_user() -> CredentialVerifier {
        let store = Arc::new(InMemoryCredentialStore::new());
        store
            .insert(CredentialRecord {
                id: Uuid::new_v4(),
                email: "a@example.com".to_string(),
                name: None,
                password_hash: password::hash_password("s3cret", PEPPER).unwrap(),
            })
            .await
            .unwrap();
        CredentialVerifier::new(store, PEPPER).unwrap()
    }

    #[tokio::test]
    async fn test_correct_credentials() {
        let verifier = verifier_with_user().await;
        let record = verifier.authenticate("a@example.com", "s3cret").await.unwrap();
        assert_eq!(record.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_are_identical() {
        let verifier = verifier_with_user().await;

        let wrong_password = verifier.authenticate("a@example.com", "nope").await;
        let unknown_email = verifier.authenticate("b@example.com", "s3cret").await;

        assert!(matches!(wrong_password, Err(ApiError::CredentialMismatch)));
        assert!(matches!(unknown_email, Err(ApiError::CredentialMismatch)));
    }

    #[tokio::test]
    async fn test_email_match_is_case_sensitive() {
        let verifier = verifier_with_user().await;
        assert!(matches!(
            verifier.authenticate("A@example.com", "s3cret").await,
            Err(ApiError::CredentialMismatch)
        ));
    }
}
