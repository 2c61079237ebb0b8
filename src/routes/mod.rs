//! HTTP route handlers for the Kitsu API.
//!
//! - `health`: liveness endpoints (legacy and versioned)
//! - `anime`: catalog listing, lookup and search
//! - `users`: user lookups

pub mod anime;
pub mod health;
pub mod users;

use axum::{http::StatusCode, routing::get, Router};

use crate::error::AppError;
use crate::state::AppState;

/// All routes, without the middleware stack (see [`crate::server::build_app`]).
pub fn router() -> Router<AppState> {
    let v1 = Router::new()
        .route("/health", get(health::health_v1))
        .route("/anime", get(anime::list_anime))
        .route("/anime/search", get(anime::search_anime))
        .route("/anime/{id}", get(anime::get_anime))
        .route("/users/lookup", get(users::lookup_user))
        .route("/users/{id}", get(users::get_user));

    Router::new()
        .route("/health", get(health::health_legacy))
        .nest("/api/v1", v1)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
}

async fn not_found() -> AppError {
    AppError::http(StatusCode::NOT_FOUND, "Not Found")
}

async fn method_not_allowed() -> AppError {
    AppError::http(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}
