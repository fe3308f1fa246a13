#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Magshelf shared infrastructure
//!
//! Pieces used by the API server that are independent of HTTP:
//! database pool creation, embedded migrations and the request rate limiter.

pub mod db;
pub mod rate_limit;

pub use db::{create_pool, run_migrations};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitError, RateLimiter};
