//! Fixtures shared by the router-level tests

use std::collections::HashMap;
use std::sync::Arc;

use magshelf_shared::{RateLimitConfig, RateLimiter};
use uuid::Uuid;

use crate::{
    auth::hash_password,
    config::Config,
    models::CredentialRecord,
    state::AppState,
    store::{CredentialStore, InMemoryCredentialStore, InMemoryMagazineStore},
};

pub const TEST_SECRET: &str = "test-jwt-secret-key-for-testing-only-32b";
pub const TEST_PEPPER: &str = "test-pepper";
pub const TEST_EMAIL: &str = "a@example.com";
pub const TEST_PASSWORD: &str = "s3cret";

pub fn test_config(max_requests: u32) -> Config {
    let max_requests = max_requests.to_string();
    let values: HashMap<String, String> = [
        ("JWT_SECRET", TEST_SECRET),
        ("PASSWORD_PEPPER", TEST_PEPPER),
        ("RATE_LIMIT_MAX_REQUESTS", max_requests.as_str()),
        ("RATE_LIMIT_WINDOW_SECS", "60"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Config::from_map(&values).unwrap()
}

/// App state over in-memory stores, seeded with [`TEST_EMAIL`]
pub struct TestApp {
    pub state: AppState,
    pub credentials: Arc<InMemoryCredentialStore>,
}

pub async fn test_app(max_requests: u32) -> TestApp {
    let config = test_config(max_requests);

    let credentials = Arc::new(InMemoryCredentialStore::new());
    credentials
        .insert(CredentialRecord {
            id: Uuid::new_v4(),
            email: TEST_EMAIL.to_string(),
            name: Some("Ada".to_string()),
            password_hash: hash_password(TEST_PASSWORD, TEST_PEPPER).unwrap(),
        })
        .await
        .unwrap();

    let rate_limiter = RateLimiter::new_in_memory(RateLimitConfig {
        max_requests,
        window: std::time::Duration::from_secs(60),
    });

    let state = AppState::new(
        config,
        credentials.clone(),
        Arc::new(InMemoryMagazineStore::new()),
        rate_limiter,
    )
    .unwrap();

    TestApp { state, credentials }
}
