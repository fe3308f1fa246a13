//! Session cookie handling
//!
//! The token travels in a single cookie whose name the verifier gate looks up
//! verbatim. `HttpOnly`, `SameSite=Lax` and `Path=/` are fixed; `Secure` can
//! only be dropped through [`CookiePolicy::insecure_dev_override`].

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use time::{macros::format_description, OffsetDateTime, UtcOffset};

use super::jwt::SessionToken;
use crate::config::Config;

/// Name of the session cookie. The verifier gate searches for exactly this.
pub const SESSION_COOKIE_NAME: &str = "jwt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    secure: bool,
}

impl CookiePolicy {
    /// Secure cookies only
    pub const fn strict() -> Self {
        Self { secure: true }
    }

    /// Plain-HTTP development. Must be asked for explicitly.
    pub fn insecure_dev_override() -> Self {
        tracing::warn!(
            "Session cookies are issued WITHOUT the Secure attribute (COOKIE_INSECURE_DEV_OVERRIDE)"
        );
        Self { secure: false }
    }

    pub fn from_config(config: &Config) -> Self {
        if config.cookie_insecure_dev_override {
            Self::insecure_dev_override()
        } else {
            Self::strict()
        }
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::strict()
    }
}

/// HTTP-date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
fn http_date(at: OffsetDateTime) -> Option<String> {
    at.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ))
        .ok()
}

fn build_cookie(value: &str, expires_at: OffsetDateTime, max_age: i64, policy: CookiePolicy) -> String {
    let mut cookie = format!("{}={}; Path=/", SESSION_COOKIE_NAME, value);
    if let Some(date) = http_date(expires_at) {
        cookie.push_str("; Expires=");
        cookie.push_str(&date);
    }
    cookie.push_str(&format!("; Max-Age={}", max_age.max(0)));
    cookie.push_str("; HttpOnly");
    if policy.is_secure() {
        cookie.push_str("; Secure");
    }
    cookie.push_str("; SameSite=Lax");
    cookie
}

/// `Set-Cookie` value binding `token` to the session cookie
pub fn session_cookie(token: &SessionToken, policy: CookiePolicy) -> String {
    build_cookie(
        &token.token,
        token.expires_at,
        token.claims.exp - token.claims.iat,
        policy,
    )
}

/// `Set-Cookie` value that makes the client drop the session cookie
pub fn cleared_cookie(policy: CookiePolicy) -> String {
    build_cookie("", OffsetDateTime::UNIX_EPOCH, 0, policy)
}

fn append(headers: &mut HeaderMap, cookie: String) {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Session cookie is not a valid header value"),
    }
}

/// Attach the session cookie for `token` to a response
pub fn attach(headers: &mut HeaderMap, token: &SessionToken, policy: CookiePolicy) {
    append(headers, session_cookie(token, policy));
}

/// Overwrite the session cookie with an empty, already-expired one
pub fn clear(headers: &mut HeaderMap, policy: CookiePolicy) {
    append(headers, cleared_cookie(policy));
}

/// Session token from the request's `Cookie` headers, if present and non-empty
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
