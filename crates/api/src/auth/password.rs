//! Password hashing and verification (Argon2id, salted, peppered)
//!
//! The pepper is a process-wide secret appended to the password before
//! hashing. It is configuration, never stored next to the hash.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;

const SALT_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(String),
}

fn peppered(password: &str, pepper: &str) -> String {
    let mut input = String::with_capacity(password.len() + pepper.len());
    input.push_str(password);
    input.push_str(pepper);
    input
}

/// Hash `password + pepper` into a PHC string with a fresh random salt
pub fn hash_password(password: &str, pepper: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    rand::rng().fill(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(peppered(password, pepper).as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check a presented password against a stored hash.
///
/// Every failure is a plain `false`: wrong password, wrong pepper and an
/// unparseable stored hash are indistinguishable to the caller.
pub fn verify_password(password: &str, stored_hash: &str, pepper: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is not a valid PHC string");
            return false;
        }
    };

    Argon2::default()
        .verify_password(peppered(password, pepper).as_bytes(), &parsed)
        .is_ok()
}

/// A well-formed hash that no password verifies against.
/// Used in place of a missing user's hash so both login failures cost the same.
pub fn generate_impossible_hash() -> Result<String, PasswordError> {
    let mut secret = [0u8; 32];
    rand::rng().fill(&mut secret);
    let throwaway: String = secret.iter().map(|b| format!("{:02x}", b)).collect();
    hash_password(&throwaway, &throwaway)
}
