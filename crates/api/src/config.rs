//! Server configuration loaded from the environment

use std::collections::HashMap;
use std::time::Duration;

use magshelf_shared::RateLimitConfig;

/// Signing secrets shorter than this are accepted but logged as weak
const RECOMMENDED_SECRET_BYTES: usize = 32;

/// Longest session a token may be issued for (one year)
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Backends (in-memory when unset)
    pub database_url: Option<String>,
    pub redis_url: Option<String>,

    // Secrets, immutable after startup
    pub jwt_secret: String,
    pub password_pepper: String,

    // Sessions
    pub session_ttl_hours: i64,
    pub cookie_insecure_dev_override: bool,

    // Rate limiting
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub trust_proxy_headers: bool,

    // Optional user seeded into the in-memory credential store
    pub seed_user: Option<SeedUser>,
}

#[derive(Clone)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_secret", &"[REDACTED]")
            .field("password_pepper", &"[REDACTED]")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field(
                "cookie_insecure_dev_override",
                &self.cookie_insecure_dev_override,
            )
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("seed_user", &self.seed_user.as_ref().map(|u| &u.email))
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Load configuration from environment variables.
    /// `main` has already merged any `.env` file into the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a fixed set of values
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| values.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = required(&lookup, "JWT_SECRET")?;
        if jwt_secret.len() < RECOMMENDED_SECRET_BYTES {
            tracing::warn!(
                length = jwt_secret.len(),
                recommended = RECOMMENDED_SECRET_BYTES,
                "JWT_SECRET is shorter than recommended"
            );
        }

        let password_pepper = required(&lookup, "PASSWORD_PEPPER")?;

        let bind_address =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let session_ttl_hours: i64 = parsed(&lookup, "SESSION_TTL_HOURS", 168)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_HOURS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        if session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_HOURS".to_string(),
                format!("must be at most {}", MAX_SESSION_TTL_HOURS),
            ));
        }

        let rate_limit_max_requests: u32 = parsed(&lookup, "RATE_LIMIT_MAX_REQUESTS", 100)?;
        if rate_limit_max_requests == 0 {
            return Err(ConfigError::InvalidValue(
                "RATE_LIMIT_MAX_REQUESTS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let rate_limit_window_secs: u64 = parsed(&lookup, "RATE_LIMIT_WINDOW_SECS", 60)?;
        if rate_limit_window_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RATE_LIMIT_WINDOW_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let cookie_insecure_dev_override =
            parsed_bool(&lookup, "COOKIE_INSECURE_DEV_OVERRIDE", false)?;
        let trust_proxy_headers = parsed_bool(&lookup, "TRUST_PROXY_HEADERS", false)?;

        let seed_user = match (
            non_empty(&lookup, "SEED_USER_EMAIL"),
            non_empty(&lookup, "SEED_USER_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(SeedUser {
                email,
                password,
                name: non_empty(&lookup, "SEED_USER_NAME"),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "SEED_USER_EMAIL".to_string(),
                    "SEED_USER_EMAIL and SEED_USER_PASSWORD must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            bind_address,
            database_url: non_empty(&lookup, "DATABASE_URL"),
            redis_url: non_empty(&lookup, "REDIS_URL"),
            jwt_secret,
            password_pepper,
            session_ttl_hours,
            cookie_insecure_dev_override,
            rate_limit_max_requests,
            rate_limit_window_secs,
            trust_proxy_headers,
            seed_user,
        })
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max_requests,
            window: Duration::from_secs(self.rate_limit_window_secs),
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Err(ConfigError::MissingVar(key.to_string())),
        Some(v) if v.is_empty() => Err(ConfigError::InvalidValue(
            key.to_string(),
            "cannot be empty".to_string(),
        )),
        Some(v) => Ok(v),
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}

fn parsed_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("expected a boolean, got '{}'", other),
            )),
        },
    }
}
