//! HTTP routes
//!
//! Every route sits behind the rate limiter. Routes that need a caller
//! identity additionally pass the token verifier and authenticator gates.

pub mod auth;
pub mod magazines;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    auth::{authenticate_token, rate_limit, verify_token},
    state::AppState,
};

/// Request bodies above this are refused
const MAX_BODY_BYTES: usize = 1_048_576;

pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    let public = Router::new()
        .route("/health", get(health))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout).get(auth::logout))
        .route("/magazines", get(magazines::list))
        .route("/magazines/search", get(magazines::search))
        .route("/magazines/title/{title}", get(magazines::by_title))
        .route("/magazines/price/{price}", get(magazines::by_price))
        .route("/magazines/{id}", get(magazines::get));

    // route_layer: the layer added last runs first
    let protected = Router::new()
        .route("/me", get(auth::me))
        .route("/magazines", post(magazines::create))
        .route(
            "/magazines/{id}",
            put(magazines::update).delete(magazines::delete),
        )
        .route_layer(middleware::from_fn(authenticate_token))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            verify_token,
        ));

    public
        .merge(protected)
        .layer(middleware::from_fn_with_state(auth_state, rate_limit))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
