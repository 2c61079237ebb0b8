use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{escape_like_pattern, parse_stored_id};
use crate::error::{AppError, AppResult};
use crate::types::{AnimeRead, Pagination, MAX_LIMIT};

const ANIME_COLUMNS: &str = "id, title, description, year, state, created_at, updated_at";
pub const PUBLISHED: &str = "published";

#[derive(Debug, sqlx::FromRow)]
struct AnimeRow {
    id: String,
    title: String,
    description: Option<String>,
    year: Option<i64>,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AnimeRow> for AnimeRead {
    type Error = AppError;

    fn try_from(row: AnimeRow) -> Result<Self, Self::Error> {
        Ok(AnimeRead {
            id: parse_stored_id("anime", &row.id)?,
            title: row.title,
            description: row.description,
            year: row.year,
            state: row.state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// SELECT over rows a public client may see; callers append predicates with AND.
fn public_anime<'a>() -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM anime WHERE is_deleted = 0 AND state = ", ANIME_COLUMNS));
    qb.push_bind(PUBLISHED);
    qb
}

fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, page: Pagination) {
    qb.push(" LIMIT ")
        .push_bind(page.limit.clamp(1, MAX_LIMIT))
        .push(" OFFSET ")
        .push_bind(page.offset.max(0));
}

async fn fetch_all(mut qb: QueryBuilder<'_, Sqlite>, pool: &SqlitePool) -> AppResult<Vec<AnimeRead>> {
    let rows: Vec<AnimeRow> = qb.build_query_as().fetch_all(pool).await?;
    rows.into_iter().map(AnimeRead::try_from).collect()
}

/// Public catalog, newest first.
pub async fn list_anime(pool: &SqlitePool, page: Pagination) -> AppResult<Vec<AnimeRead>> {
    let mut qb = public_anime();
    qb.push(" ORDER BY created_at DESC, id DESC");
    push_page(&mut qb, page);
    fetch_all(qb, pool).await
}

/// `None` when the entry does not exist, is deleted or is not published.
pub async fn get_anime_by_id(pool: &SqlitePool, id: Uuid) -> AppResult<Option<AnimeRead>> {
    let mut qb = public_anime();
    qb.push(" AND id = ").push_bind(id.to_string());
    let row: Option<AnimeRow> = qb.build_query_as().fetch_optional(pool).await?;
    row.map(AnimeRead::try_from).transpose()
}

/// Case-insensitive substring match on the title, ordered by title.
///
/// The term is bound, never interpolated, and LIKE wildcards in it are
/// escaped, so `%`, `_`, quotes and SQL fragments match literally. An empty
/// term matches every public entry. SQLite folds ASCII case only.
pub async fn search_anime(pool: &SqlitePool, query: &str, page: Pagination) -> AppResult<Vec<AnimeRead>> {
    if query.chars().any(|ch| ch.is_control()) {
        return Err(AppError::InvalidValue(format!("search term contains control characters: {:?}", query)));
    }
    let pattern = format!("%{}%", escape_like_pattern(query));

    let mut qb = public_anime();
    qb.push(" AND title LIKE ").push_bind(pattern).push(" ESCAPE '!'");
    qb.push(" ORDER BY title ASC, id ASC");
    push_page(&mut qb, page);
    fetch_all(qb, pool).await
}
