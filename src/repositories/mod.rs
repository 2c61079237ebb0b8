//! Read-side query functions, one module per entity.
//!
//! Every function takes the pool and its parameters and returns
//! [`crate::error::AppResult`]. Catalog reads only ever see rows that are not
//! soft-deleted and are in the `published` state.

pub mod anime;
pub mod users;

use uuid::Uuid;

use crate::error::AppError;

const LIKE_ESCAPE: char = '!';

/// Escapes LIKE wildcards so user input matches literally. Use with
/// `ESCAPE '!'`.
pub(crate) fn escape_like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

// Ids are stored as hyphenated TEXT.
pub(crate) fn parse_stored_id(entity: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("{} row has malformed id {:?}: {}", entity, raw, e)))
}
