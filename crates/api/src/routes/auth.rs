//! Login, logout and current-user routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    auth::{cookie, AuthUser},
    error::{ApiError, ApiResult},
    models::{LoginForm, UserProfile},
    state::AppState,
};

/// Where login and logout send the browser
const AFTER_AUTH_REDIRECT: &str = "/magazines";

fn redirect_found() -> Response {
    (StatusCode::FOUND, [(LOCATION, AFTER_AUTH_REDIRECT)]).into_response()
}

/// POST /login: verify credentials, set the session cookie, redirect
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginForm>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(form) = payload?;
    let user = state
        .credential_verifier
        .authenticate(&form.email, &form.password)
        .await?;

    let token = state
        .jwt_manager
        .issue(&user.email)
        .map_err(|e| ApiError::Internal(format!("Failed to issue session token: {}", e)))?;

    let mut response = redirect_found();
    cookie::attach(response.headers_mut(), &token, state.cookie_policy);

    tracing::info!(user_id = %user.id, "Login succeeded");
    Ok(response)
}

/// POST|GET /logout: tell the client to drop the session cookie. Always succeeds.
pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = redirect_found();
    cookie::clear(response.headers_mut(), state.cookie_policy);
    response
}

/// GET /me: the authenticated caller's account
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<UserProfile>> {
    let record = state.identity_resolver.resolve(&user.email).await?;
    Ok(Json(record.into()))
}
