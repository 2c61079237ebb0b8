use axum::extract::State;
use uuid::Uuid;

use crate::error::{AppResult, OptionExt};
use crate::extract::{ApiPath, ValidatedQuery};
use crate::middleware::RequestId;
use crate::repositories::users as repo;
use crate::response::{ApiMeta, ApiResponse};
use crate::state::AppState;
use crate::types::{UserRead, UsernameLookup};

pub async fn get_user(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<UserRead>> {
    let user = repo::get_user_by_id(&state.db, id).await?.ok_or_not_found("User")?;
    Ok(ApiResponse::ok_with_meta(user, ApiMeta::with_request_id(request_id.as_str())))
}

pub async fn lookup_user(
    State(state): State<AppState>,
    request_id: RequestId,
    ValidatedQuery(lookup): ValidatedQuery<UsernameLookup>,
) -> AppResult<ApiResponse<UserRead>> {
    let user = repo::find_user_by_username(&state.db, &lookup.username).await?.ok_or_not_found("User")?;
    Ok(ApiResponse::ok_with_meta(user, ApiMeta::with_request_id(request_id.as_str())))
}
