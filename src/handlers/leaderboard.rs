use crate::error::{AppError, AppResult};
use crate::response::ApiResponse;
use crate::services::cache::CacheService;
use crate::services::leaderboard::{
    LeaderboardEntry, LeaderboardService, UserRank, MAX_LEADERBOARD_SIZE,
};
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_LEADERBOARD_SIZE: u64 = 10;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaderboardQuery {
    /// Number of entries (1-100, default 10)
    pub limit: Option<u64>,
    /// Entries to skip (default 0)
    pub offset: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/leaderboard",
    params(
        ("limit" = Option<u64>, Query, description = "Number of entries, 1-100"),
        ("offset" = Option<u64>, Query, description = "Entries to skip, 0-100"),
    ),
    responses(
        (status = 200, description = "Top users by points", body = Vec<LeaderboardEntry>),
        (status = 400, description = "Invalid limit or offset", body = AppError),
    ),
    tag = "leaderboard"
)]
pub async fn get_leaderboard(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    Query(params): Query<LeaderboardQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_SIZE);
    if limit == 0 || limit > MAX_LEADERBOARD_SIZE {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LEADERBOARD_SIZE
        )));
    }

    let offset = params.offset.unwrap_or(0);
    if offset > MAX_LEADERBOARD_SIZE {
        return Err(AppError::Validation(format!(
            "offset must be at most {}",
            MAX_LEADERBOARD_SIZE
        )));
    }

    let service = LeaderboardService::new(db).with_cache(cache.map(|Extension(c)| c));
    let entries = service.standings(offset, limit).await?;
    Ok(ApiResponse::ok(entries))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/rank",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Rank and points, null data when the user has no points activity", body = UserRank),
    ),
    tag = "leaderboard"
)]
pub async fn get_user_rank(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let rank = LeaderboardService::new(db).rank_of(id).await?;
    Ok(ApiResponse::ok(rank))
}
