use crate::config::{rules::RulesConfig, runtime::RuntimeConfig};
use crate::error::{AppError, AppResult};
use crate::handlers::complaint::{
    complaint_service, request_deadline, validation_error, SubmitComplaintRequest,
    SubmitComplaintResponse,
};
use crate::handlers::user::{LedgerEntryResponse, ProfileResponse};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{PointAction, ProfileRole};
use crate::response::ApiResponse;
use crate::services::admin::{AdminService, AdminStats};
use crate::services::cache::CacheService;
use crate::services::complaint::DuplicatePolicy;
use crate::services::points::PointsLedgerService;
use crate::services::profile::ProfileService;
use axum::{extract::Path, http::HeaderMap, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AwardRequest {
    /// One of `self_cleaned`, `parking_violation`, `false_report`
    pub action: PointAction,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AppealSubmissionRequest {
    #[validate(nested)]
    pub complaint: SubmitComplaintRequest,
    /// `flag` keeps the complaint marked as a likely duplicate, `allow` skips the check
    pub policy: DuplicatePolicy,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: ProfileRole,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    /// Rows repaired
    pub repaired: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Complaint and ledger statistics", body = AdminStats),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn get_stats(
    Extension(db): Extension<DatabaseConnection>,
    Extension(runtime): Extension<RuntimeConfig>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let stats = AdminService::new(db).get_stats(&runtime).await?;
    Ok(ApiResponse::ok(stats))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/complaints/{id}/awards",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Complaint ID")),
    request_body = AwardRequest,
    responses(
        (status = 200, description = "Ledger entry recorded for the complaint owner", body = LedgerEntryResponse),
        (status = 400, description = "Action is not awarded by hand", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Complaint not found", body = AppError),
        (status = 409, description = "Already awarded", body = AppError),
    ),
    tag = "admin"
)]
pub async fn award_points(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AwardRequest>,
) -> AppResult<impl IntoResponse> {
    let admin_id = require_admin(&auth_user)?;

    let service = complaint_service(db, rules, runtime, cache);
    let entry = service.adjudicate(id, payload.action, admin_id).await?;
    Ok(ApiResponse::ok(LedgerEntryResponse::from(entry)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/complaints",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Citizen the complaint is filed for")),
    request_body = AppealSubmissionRequest,
    responses(
        (status = 200, description = "Complaint filed on the citizen's behalf", body = SubmitComplaintResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "User not found", body = AppError),
        (status = 429, description = "Citizen's daily limit reached", body = AppError),
    ),
    tag = "admin"
)]
pub async fn submit_on_behalf(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AppealSubmissionRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(validation_error)?;
    let admin_id = require_admin(&auth_user)?;

    if payload.policy == DuplicatePolicy::Reject {
        return Err(AppError::Validation(
            "Appeal submissions use the flag or allow policy".to_string(),
        ));
    }

    let citizen = ProfileService::new(db.clone()).get(user_id).await?;
    if citizen.role == ProfileRole::Banned {
        return Err(AppError::Forbidden);
    }

    let deadline = request_deadline(&headers, runtime.submit_timeout);
    let service = complaint_service(db, rules, runtime, cache);
    let outcome = service
        .submit(
            citizen.id,
            payload.complaint.into_draft(),
            payload.policy,
            deadline,
        )
        .await?;

    tracing::info!(
        complaint_id = %outcome.complaint.id,
        citizen = %citizen.id,
        admin = %admin_id,
        policy = ?payload.policy,
        "Complaint filed on appeal"
    );

    Ok(ApiResponse::ok(SubmitComplaintResponse {
        complaint: outcome.complaint.into(),
        points_credited: outcome.points_credited,
        reports_today: outcome.reports_today,
        daily_limit: rules.daily_report_limit,
    }))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "User role updated", body = ProfileResponse),
        (status = 400, description = "Cannot change own role", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn update_user_role(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<impl IntoResponse> {
    let admin_id = require_admin(&auth_user)?;
    if admin_id == id {
        return Err(AppError::Validation(
            "Administrators cannot change their own role".to_string(),
        ));
    }

    let profile = ProfileService::new(db).set_role(id, payload.role).await?;
    tracing::info!(user_id = %id, role = ?payload.role, admin = %admin_id, "Role updated");
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/points/reconcile",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Cached totals rebuilt from the ledger", body = ReconcileResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn reconcile_points(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let repaired = PointsLedgerService::new(db)
        .with_cache(cache.map(|Extension(c)| c))
        .reconcile_cached_totals()
        .await?;
    Ok(ApiResponse::ok(ReconcileResponse { repaired }))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/ledger/reconcile",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Missing valid_report credits recorded", body = ReconcileResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn reconcile_ledger(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let repaired = complaint_service(db, rules, runtime, cache)
        .reconcile_missing_awards()
        .await?;
    Ok(ApiResponse::ok(ReconcileResponse { repaired }))
}
