use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::parse_stored_id;
use crate::error::{AppError, AppResult};
use crate::types::UserRead;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    username: String,
    is_active: bool,
    is_admin: bool,
    avatar: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRead {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRead {
            id: parse_stored_id("user", &row.id)?,
            email: row.email,
            username: row.username,
            is_active: row.is_active,
            is_admin: row.is_admin,
            avatar: row.avatar,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn get_user_by_id(pool: &SqlitePool, id: Uuid) -> AppResult<Option<UserRead>> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, email, username, is_active, is_admin, avatar, created_at, updated_at
         FROM users WHERE id = ?1",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.map(UserRead::try_from).transpose()
}

/// Case-insensitive username lookup. The unique constraint is
/// case-sensitive, so `Alice` and `alice` can coexist; matching both is
/// reported as [`AppError::MultipleResults`] rather than picking one.
pub async fn find_user_by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<UserRead>> {
    let mut rows: Vec<UserRow> = sqlx::query_as(
        "SELECT id, email, username, is_active, is_admin, avatar, created_at, updated_at
         FROM users WHERE lower(username) = lower(?1) LIMIT 2",
    )
    .bind(username)
    .fetch_all(pool)
    .await?;

    match rows.len() {
        0 => Ok(None),
        1 => rows.pop().map(UserRead::try_from).transpose(),
        _ => Err(AppError::MultipleResults { entity: "user" }),
    }
}
