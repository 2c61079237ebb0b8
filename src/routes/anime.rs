use axum::extract::State;
use uuid::Uuid;

use crate::error::{AppResult, OptionExt};
use crate::extract::{ApiPath, ValidatedQuery};
use crate::middleware::RequestId;
use crate::repositories::anime as repo;
use crate::response::{ApiMeta, ApiResponse};
use crate::state::AppState;
use crate::types::{AnimeRead, AnimeSearchParams, Pagination};

fn page_meta(request_id: &RequestId, page: Pagination, count: usize) -> ApiMeta {
    ApiMeta::with_request_id(request_id.as_str())
        .extra("limit", page.limit)
        .extra("offset", page.offset)
        .extra("count", count)
}

pub async fn list_anime(
    State(state): State<AppState>,
    request_id: RequestId,
    ValidatedQuery(page): ValidatedQuery<Pagination>,
) -> AppResult<ApiResponse<Vec<AnimeRead>>> {
    let items = repo::list_anime(&state.db, page).await?;
    let meta = page_meta(&request_id, page, items.len());
    Ok(ApiResponse::ok_with_meta(items, meta))
}

pub async fn search_anime(
    State(state): State<AppState>,
    request_id: RequestId,
    ValidatedQuery(params): ValidatedQuery<AnimeSearchParams>,
) -> AppResult<ApiResponse<Vec<AnimeRead>>> {
    let page = params.page();
    let items = repo::search_anime(&state.db, &params.q, page).await?;
    let meta = page_meta(&request_id, page, items.len()).extra("q", params.q);
    Ok(ApiResponse::ok_with_meta(items, meta))
}

pub async fn get_anime(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<AnimeRead>> {
    let anime = repo::get_anime_by_id(&state.db, id).await?.ok_or_not_found("Anime")?;
    Ok(ApiResponse::ok_with_meta(anime, ApiMeta::with_request_id(request_id.as_str())))
}
