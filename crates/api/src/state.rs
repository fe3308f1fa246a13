//! Application state

use std::sync::Arc;

use magshelf_shared::RateLimiter;

use crate::{
    auth::{AuthState, CookiePolicy, CredentialVerifier, IdentityResolver, JwtManager, PasswordError},
    config::Config,
    store::{CredentialStore, MagazineStore},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jwt_manager: JwtManager,
    pub cookie_policy: CookiePolicy,
    pub credential_verifier: CredentialVerifier,
    pub identity_resolver: IdentityResolver,
    pub magazines: Arc<dyn MagazineStore>,
    /// Per-IP request counter (in-memory or Redis, chosen at startup)
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        magazines: Arc<dyn MagazineStore>,
        rate_limiter: RateLimiter,
    ) -> Result<Self, PasswordError> {
        let jwt_manager = JwtManager::from_config(&config);
        tracing::info!(
            ttl_hours = config.session_ttl_hours,
            "Session token codec initialized"
        );

        let cookie_policy = CookiePolicy::from_config(&config);

        let credential_verifier =
            CredentialVerifier::new(credentials.clone(), &config.password_pepper)?;
        let identity_resolver = IdentityResolver::new(credentials);

        Ok(Self {
            config,
            jwt_manager,
            cookie_policy,
            credential_verifier,
            identity_resolver,
            magazines,
            rate_limiter,
        })
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
            rate_limiter: self.rate_limiter.clone(),
            trust_proxy_headers: self.config.trust_proxy_headers,
        }
    }
}
