use crate::config::{rules::RulesConfig, runtime::RuntimeConfig};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{PointAction, PointsLedgerModel, ProfileModel, ProfileRole};
use crate::response::ApiResponse;
use crate::services::points::PointsLedgerService;
use crate::services::profile::ProfileService;
use crate::services::quota::{QuotaTracker, QuotaUsage};
use axum::{extract::Query, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub display_name: String,
    pub role: ProfileRole,
    pub points: i32,
    pub created_at: String,
}

impl From<ProfileModel> for ProfileResponse {
    fn from(p: ProfileModel) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name,
            role: p.role,
            points: p.points,
            created_at: p.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub complaint_id: Option<Uuid>,
    pub action: PointAction,
    pub delta: i32,
    pub created_at: String,
}

impl From<PointsLedgerModel> for LedgerEntryResponse {
    fn from(e: PointsLedgerModel) -> Self {
        Self {
            id: e.id,
            complaint_id: e.complaint_id,
            action: e.action,
            delta: e.delta,
            created_at: e.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PointsResponse {
    /// Sum of all ledger entries
    pub total: i64,
    /// Most recent entries first
    pub history: Vec<LedgerEntryResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PointsHistoryQuery {
    /// Number of ledger entries (max 200, default 50)
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "users"
)]
pub async fn get_me(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let profile = ProfileService::new(db).get(auth_user.user_id).await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/points",
    security(("jwt_token" = [])),
    params(("limit" = Option<u64>, Query, description = "Number of ledger entries")),
    responses(
        (status = 200, description = "Points total and ledger history", body = PointsResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "users"
)]
pub async fn my_points(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<PointsHistoryQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);

    let ledger = PointsLedgerService::new(db);
    let total = ledger.total_for(auth_user.user_id).await?;
    let history = ledger.history(auth_user.user_id, limit).await?;

    Ok(ApiResponse::ok(PointsResponse {
        total,
        history: history.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/quota",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Today's report quota", body = QuotaUsage),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "users"
)]
pub async fn my_quota(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let usage = QuotaTracker::new(db, rules.daily_report_limit)
        .usage(auth_user.user_id, runtime.civic_today())
        .await?;
    Ok(ApiResponse::ok(usage))
}
