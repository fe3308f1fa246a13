// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Magshelf API Library
//!
//! HTTP server components for the Magshelf magazine catalogue: password
//! verification, session tokens and cookies, the auth gate chain and the
//! catalogue routes it protects.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
