use anyhow::Context;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};

use crate::config;

/// A schema change applied at most once, inside its own transaction.
#[derive(Debug)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create anime and users tables",
        statements: &[
            r#"CREATE TABLE IF NOT EXISTS anime (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NULL,
                year INTEGER NULL,
                state TEXT NOT NULL DEFAULT 'draft',
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            )"#,
            "CREATE INDEX IF NOT EXISTS ix_anime_public_created ON anime(is_deleted, state, created_at DESC)",
            r#"CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                avatar TEXT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            )"#,
        ],
    },
    Migration {
        version: 2,
        description: "add case-insensitive index for anime title search",
        statements: &["CREATE INDEX IF NOT EXISTS ix_anime_title_nocase ON anime(title COLLATE NOCASE)"],
    },
    Migration {
        version: 3,
        description: "add core user fields",
        // SQLite cannot add a NOT NULL column with a non-constant default, so
        // the table is rebuilt. username is backfilled from the email local part.
        statements: &[
            r#"CREATE TABLE users_new (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL CONSTRAINT uq_users_username UNIQUE,
                hashed_password TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_admin INTEGER NOT NULL DEFAULT 0,
                avatar TEXT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            )"#,
            r#"INSERT INTO users_new
                (id, email, username, hashed_password, is_active, is_admin, avatar, created_at, updated_at)
            SELECT
                id,
                email,
                CASE WHEN instr(email, '@') > 1 THEN substr(email, 1, instr(email, '@') - 1) ELSE email END,
                hashed_password,
                is_active,
                0,
                avatar,
                created_at,
                strftime('%Y-%m-%dT%H:%M:%fZ','now')
            FROM users"#,
            "DROP TABLE users",
            "ALTER TABLE users_new RENAME TO users",
            "CREATE INDEX IF NOT EXISTS ix_users_username ON users(username)",
        ],
    },
];

/// Opens the pool, creating the database file (and its directory) if needed.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    config::ensure_sqlite_parent_dir(url)?;
    if !url.contains(":memory:") && !Sqlite::database_exists(url).await.unwrap_or(false) {
        tracing::info!("Creating SQLite database at {}", url);
        Sqlite::create_database(url).await?;
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // Foreign keys are critical - fail the connection if this doesn't work
                sqlx::query("PRAGMA foreign_keys=ON;").execute(&mut *conn).await?;
                if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await {
                    tracing::warn!("Failed to set busy_timeout: {}", e);
                }
                Ok(())
            })
        })
        .connect(url)
        .await?;
    Ok(pool)
}

/// Applies every pending migration.
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<Vec<i64>> {
    migrate_to(pool, i64::MAX).await
}

/// Applies pending migrations up to and including `target`. Returns the
/// versions applied by this call.
pub async fn migrate_to(pool: &SqlitePool, target: i64) -> anyhow::Result<Vec<i64>> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    let already = applied_versions(pool).await?;
    let mut applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version <= target && !already.contains(&m.version)) {
        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await.with_context(|| {
                format!("Migration {:04} ({}) failed", migration.version, migration.description)
            })?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?1, ?2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!("Applied migration {:04}: {}", migration.version, migration.description);
        applied.push(migration.version);
    }
    Ok(applied)
}

pub async fn applied_versions(pool: &SqlitePool) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar("SELECT version FROM schema_migrations ORDER BY version").fetch_all(pool).await
}

/// Cheap connectivity probe used by the legacy health endpoint.
pub async fn ping(pool: &SqlitePool) -> anyhow::Result<()> {
    let query = sqlx::query("SELECT 1").fetch_one(pool);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(anyhow::anyhow!("database probe timed out")),
    }
}
