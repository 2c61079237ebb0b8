use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;

/// The shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool; a connection is checked out per query.
    pub db: SqlitePool,
    /// Settings loaded once at startup. Read-only.
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        Self { db, config: Arc::new(config) }
    }
}
