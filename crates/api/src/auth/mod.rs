//! Authentication module for Magshelf

pub mod cookie;
pub mod credentials;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use cookie::{CookiePolicy, SESSION_COOKIE_NAME};
pub use credentials::CredentialVerifier;
pub use identity::{IdentityError, IdentityResolver};
pub use jwt::{Claims, JwtManager, SessionToken, TokenError};
pub use middleware::{
    authenticate_token, rate_limit, verify_token, AuthDecision, AuthStage, AuthState, AuthUser,
    RejectReason,
};
pub use password::{generate_impossible_hash, hash_password, verify_password, PasswordError};
