//! Request gates for Axum
//!
//! Protected routes pass through, in this order:
//! 1. [`rate_limit`]: per-IP fixed-window counter (applied to every route)
//! 2. [`verify_token`]: session cookie present and token parses
//! 3. [`authenticate_token`]: claims re-checked independently of the codec
//!
//! Each gate either forwards the request untouched or ends it with a fixed
//! response. Why a gate rejected is logged, never sent to the client.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use magshelf_shared::{RateLimitDecision, RateLimiter};
use time::OffsetDateTime;

use super::cookie::extract_session_token;
use super::jwt::{Claims, JwtManager, TokenError};
use crate::error::ApiError;

/// State needed by the gates
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
    pub rate_limiter: RateLimiter,
    /// Key the rate limiter on the proxy's `X-Forwarded-For`/`X-Real-IP` entry
    /// (only behind a trusted proxy)
    pub trust_proxy_headers: bool,
}

/// How far a request got through the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Start,
    RateChecked,
    TokenPresent,
    TokenValid,
    Authenticated,
}

/// Server-side reason for a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    RateLimited { retry_after: Duration },
    MissingToken,
    Token(TokenError),
    ClaimsExpired,
    InvalidClaims,
}

impl RejectReason {
    /// Last stage reached before the rejection
    pub fn stage(&self) -> AuthStage {
        match self {
            RejectReason::RateLimited { .. } => AuthStage::Start,
            RejectReason::MissingToken => AuthStage::RateChecked,
            RejectReason::Token(_) => AuthStage::TokenPresent,
            RejectReason::ClaimsExpired | RejectReason::InvalidClaims => AuthStage::TokenValid,
        }
    }
}

impl From<RejectReason> for ApiError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::RateLimited { retry_after } => ApiError::RateLimited { retry_after },
            _ => ApiError::Unauthenticated,
        }
    }
}

/// Per-request result of the chain, stored in the request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub authenticated: bool,
    pub identity: Option<String>,
    pub failure: Option<RejectReason>,
}

impl AuthDecision {
    pub fn authenticated(identity: String) -> Self {
        Self {
            authenticated: true,
            identity: Some(identity),
            failure: None,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            authenticated: false,
            identity: None,
            failure: Some(reason),
        }
    }

    pub fn stage(&self) -> AuthStage {
        match self.failure {
            Some(reason) => reason.stage(),
            None if self.authenticated => AuthStage::Authenticated,
            None => AuthStage::Start,
        }
    }
}

/// Claims that passed the verifier gate, waiting for the authenticator gate
#[derive(Debug, Clone)]
struct VerifiedClaims(Claims);

/// Authenticated caller, extracted by handlers behind the full chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub email: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthDecision>() {
            Some(AuthDecision {
                authenticated: true,
                identity: Some(email),
                ..
            }) => Ok(AuthUser {
                email: email.clone(),
            }),
            _ => Err(ApiError::Unauthenticated),
        }
    }
}

/// Rate limit key for the caller
fn client_ip(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        // Earlier X-Forwarded-For entries come from the client and can be
        // forged; the last one was appended by the trusted proxy
        if let Some(ip) = request
            .headers()
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|xff| xff.rsplit(',').next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            return ip.to_string();
        }
        if let Some(ip) = request
            .headers()
            .get("X-Real-IP")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn reject(path: &str, reason: RejectReason) -> Response {
    tracing::warn!(
        path = %path,
        stage = ?reason.stage(),
        reason = ?reason,
        "Request rejected by auth gate"
    );
    ApiError::from(reason).into_response()
}

/// Gate 1: count the request against the caller's IP
pub async fn rate_limit(
    State(auth_state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request, auth_state.trust_proxy_headers);

    match auth_state.rate_limiter.check(&ip).await {
        Ok(RateLimitDecision::Allowed { .. }) => next.run(request).await,
        Ok(RateLimitDecision::Limited { retry_after }) => {
            tracing::warn!(action = "rate_limited", ip = %ip, "Rate limit exceeded");
            reject(
                request.uri().path(),
                RejectReason::RateLimited { retry_after },
            )
        }
        Err(e) => {
            // Counter backend down: serve rather than lock every caller out
            tracing::error!(error = %e, "Rate limiter unavailable, allowing request");
            next.run(request).await
        }
    }
}

/// Find the session cookie and parse its token
pub fn verify_session_cookie(
    jwt_manager: &JwtManager,
    headers: &axum::http::HeaderMap,
) -> Result<Claims, RejectReason> {
    let token = extract_session_token(headers).ok_or(RejectReason::MissingToken)?;
    jwt_manager.parse(&token).map_err(RejectReason::Token)
}

/// Gate 2: session cookie must be present and its token must parse
pub async fn verify_token(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match verify_session_cookie(&auth_state.jwt_manager, request.headers()) {
        Ok(claims) => {
            request.extensions_mut().insert(VerifiedClaims(claims));
            next.run(request).await
        }
        Err(reason) => reject(request.uri().path(), reason),
    }
}

/// Re-check parsed claims against the clock (unix seconds)
pub fn authenticate_claims(claims: &Claims, now: i64) -> Result<String, RejectReason> {
    if claims.email.trim().is_empty() || claims.iat > claims.exp {
        return Err(RejectReason::InvalidClaims);
    }
    if claims.exp <= now {
        return Err(RejectReason::ClaimsExpired);
    }
    Ok(claims.email.clone())
}

/// Gate 3: claims from gate 2 must still hold; records the decision
pub async fn authenticate_token(mut request: Request, next: Next) -> Response {
    let Some(VerifiedClaims(claims)) = request.extensions_mut().remove::<VerifiedClaims>() else {
        return reject(request.uri().path(), RejectReason::MissingToken);
    };

    match authenticate_claims(&claims, OffsetDateTime::now_utc().unix_timestamp()) {
        Ok(identity) => {
            tracing::debug!(email = %identity, "Request authenticated");
            request
                .extensions_mut()
                .insert(AuthDecision::authenticated(identity));
            next.run(request).await
        }
        Err(reason) => reject(request.uri().path(), reason),
    }
}
