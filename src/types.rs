use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::validation::{Checker, Validate, ValidationIssue};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;
pub const MAX_SEARCH_LEN: usize = 200;

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// `limit` in 1..=100 (default 20), `offset` >= 0 (default 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, offset: 0 }
    }
}

impl Pagination {
    fn check(&self, checker: &mut Checker) {
        checker
            .range(&["query", "limit"], self.limit, 1, Some(MAX_LIMIT))
            .range(&["query", "offset"], self.offset, 0, None);
    }
}

impl Validate for Pagination {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut checker = Checker::new();
        self.check(&mut checker);
        checker.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnimeSearchParams {
    #[serde(default)]
    pub q: String,
    // Not flattened: urlencoded + flatten cannot deserialize numbers.
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl AnimeSearchParams {
    pub fn page(&self) -> Pagination {
        Pagination { limit: self.limit, offset: self.offset }
    }
}

impl Validate for AnimeSearchParams {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut checker = Checker::new();
        checker.length(&["query", "q"], &self.q, 0, MAX_SEARCH_LEN);
        self.page().check(&mut checker);
        checker.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UsernameLookup {
    pub username: String,
}

impl Validate for UsernameLookup {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        Checker::new().length(&["query", "username"], &self.username, 3, 50).finish()
    }
}

/// Public view of a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeRead {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub year: Option<i64>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user; the password hash never leaves the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRead {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
