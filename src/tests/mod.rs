//! Unit and integration tests for the Kitsu backend.
//!
//! ## Test Modules
//!
//! - **error_tests**: error taxonomy and translation
//! - **config_tests**: configuration loading and validation
//! - **db_tests**: migrations and schema deltas
//! - **repository_tests**: query functions and their visibility filters
//! - **health_api_tests**: health endpoints
//! - **api_tests**: full middleware stack, envelope and request IDs
//!
//! Shared fixtures live in this module.

pub mod config_tests;

use std::collections::HashMap;

use axum::{body::Body, http::Request, response::Response, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use http_body_util::BodyExt;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::{self, AppConfig};
use crate::db;

pub(crate) fn test_env() -> HashMap<String, String> {
    [
        ("SECRET_KEY", "x".repeat(32)),
        ("DATABASE_URL", "sqlite::memory:".to_string()),
        ("REDIS_URL", "redis://localhost:6379/1".to_string()),
        ("ALLOWED_ORIGINS", "http://localhost:3000".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub(crate) fn test_config() -> AppConfig {
    config::load_from(test_env()).unwrap()
}

/// One connection, so the in-memory database is shared by every query.
pub(crate) async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap()
}

pub(crate) async fn migrated_pool() -> SqlitePool {
    let pool = memory_pool().await;
    db::migrate(&pool).await.unwrap();
    pool
}

pub(crate) fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
}

pub(crate) async fn insert_anime(
    pool: &SqlitePool,
    title: &str,
    state: &str,
    is_deleted: bool,
    created_at: DateTime<Utc>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO anime (id, title, state, is_deleted, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(state)
    .bind(is_deleted)
    .bind(created_at.to_rfc3339_opts(SecondsFormat::Millis, true))
    .execute(pool)
    .await
    .unwrap();
    id
}

pub(crate) async fn insert_published(pool: &SqlitePool, title: &str, created_at: &str) -> Uuid {
    insert_anime(pool, title, "published", false, at(created_at)).await
}

pub(crate) async fn insert_user(pool: &SqlitePool, email: &str, username: &str) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, username, hashed_password) VALUES (?1, ?2, ?3, 'hash')")
        .bind(id.to_string())
        .bind(email)
        .bind(username)
        .execute(pool)
        .await?;
    Ok(id)
}

pub(crate) async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

pub(crate) async fn get(app: &Router, uri: &str) -> Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub(crate) async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Exactly one of `data` / `error` carries information.
pub(crate) fn assert_envelope(body: &serde_json::Value, success: bool) {
    let obj = body.as_object().unwrap();
    assert!(obj.contains_key("data") && obj.contains_key("meta") && obj.contains_key("error"), "{}", body);
    if success {
        assert!(body["error"].is_null(), "{}", body);
    } else {
        assert!(body["data"].is_null(), "{}", body);
        assert!(body["error"]["code"].is_string(), "{}", body);
        assert!(body["error"]["message"].is_string(), "{}", body);
    }
}
