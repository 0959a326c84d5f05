use crate::config::{rules::RulesConfig, runtime::RuntimeConfig};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_staff, AuthUser};
use crate::models::{ComplaintModel, ComplaintStatus, StatusHistoryModel};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::cache::CacheService;
use crate::services::complaint::{ComplaintFilter, ComplaintService, DuplicatePolicy};
use crate::services::complaint_state::ComplaintDraft;
use crate::services::duplicate::DuplicateMatch;
use crate::utils::geo::GeoPoint;
use axum::{
    extract::Path, extract::Query, http::HeaderMap, response::IntoResponse, Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Caller-supplied budget for the submission write, in milliseconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitComplaintRequest {
    /// Category ID
    pub category_id: i32,
    /// Subcategory ID, must belong to the category
    pub subcategory_id: Option<i32>,
    /// Description (10-500 characters)
    #[validate(length(min = 10, max = 500))]
    pub description: String,
    /// Latitude in decimal degrees
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Human-readable address (max 300 characters)
    #[validate(length(max = 300))]
    pub address: Option<String>,
}

impl SubmitComplaintRequest {
    pub fn into_draft(self) -> ComplaintDraft {
        ComplaintDraft {
            category_id: self.category_id,
            subcategory_id: self.subcategory_id,
            description: self.description,
            location: GeoPoint::new(self.latitude, self.longitude),
            address: self.address,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransitionRequest {
    /// Target status
    pub status: ComplaintStatus,
    /// Optional note recorded in the history (max 1000 characters)
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DuplicateCheckRequest {
    pub category_id: i32,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComplaintResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: i32,
    pub subcategory_id: Option<i32>,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    /// Department the complaint is routed to
    pub department: String,
    pub status: ComplaintStatus,
    /// Points credited for filing the report
    pub points_awarded: i32,
    pub verified: bool,
    pub flagged_duplicate: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ComplaintModel> for ComplaintResponse {
    fn from(c: ComplaintModel) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            category_id: c.category_id,
            subcategory_id: c.subcategory_id,
            description: c.description,
            latitude: c.latitude,
            longitude: c.longitude,
            address: c.address,
            department: c.department,
            status: c.status,
            points_awarded: c.points_awarded,
            verified: c.verified,
            flagged_duplicate: c.flagged_duplicate,
            created_at: c.created_at.to_string(),
            updated_at: c.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusHistoryResponse {
    pub sequence: i32,
    pub previous_status: Option<ComplaintStatus>,
    pub new_status: ComplaintStatus,
    pub actor_id: Uuid,
    pub note: Option<String>,
    pub created_at: String,
}

impl From<StatusHistoryModel> for StatusHistoryResponse {
    fn from(h: StatusHistoryModel) -> Self {
        Self {
            sequence: h.sequence,
            previous_status: h.previous_status,
            new_status: h.new_status,
            actor_id: h.actor_id,
            note: h.note,
            created_at: h.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComplaintDetailResponse {
    pub complaint: ComplaintResponse,
    pub history: Vec<StatusHistoryResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitComplaintResponse {
    pub complaint: ComplaintResponse,
    /// False when the points credit is still pending
    pub points_credited: bool,
    pub reports_today: u32,
    pub daily_limit: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionResponse {
    pub complaint: ComplaintResponse,
    pub entry: StatusHistoryResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DuplicateCheckResponse {
    pub duplicate: bool,
    pub existing: Option<DuplicateMatch>,
    pub radius_meters: f64,
    pub window_hours: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ComplaintListQuery {
    /// Page number
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
    /// Filter by status
    pub status: Option<String>,
    /// Filter by category ID
    pub category_id: Option<i32>,
    /// Filter by reporter
    pub user_id: Option<Uuid>,
}

pub(crate) fn complaint_service(
    db: DatabaseConnection,
    rules: RulesConfig,
    runtime: RuntimeConfig,
    cache: Option<Extension<CacheService>>,
) -> ComplaintService {
    ComplaintService::new(db, rules, runtime).with_cache(cache.map(|Extension(c)| c))
}

/// Deadline from [`REQUEST_TIMEOUT_HEADER`], falling back to the configured default.
pub(crate) fn request_deadline(headers: &HeaderMap, default: Duration) -> Duration {
    headers
        .get(REQUEST_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(|ms| Duration::from_millis(ms).min(MAX_REQUEST_TIMEOUT))
        .unwrap_or(default)
}

pub(crate) fn validation_error(e: validator::ValidationErrors) -> AppError {
    AppError::Validation(e.to_string())
}

#[utoipa::path(
    post,
    path = "/api/v1/complaints",
    security(("jwt_token" = [])),
    request_body = SubmitComplaintRequest,
    params(
        ("x-request-timeout-ms" = Option<u64>, Header, description = "Submission deadline in milliseconds"),
    ),
    responses(
        (status = 200, description = "Complaint filed", body = SubmitComplaintResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 409, description = "Duplicate report", body = AppError),
        (status = 429, description = "Daily limit reached", body = AppError),
        (status = 504, description = "Deadline exceeded", body = AppError),
    ),
    tag = "complaints"
)]
pub async fn submit_complaint(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<SubmitComplaintRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(validation_error)?;

    let deadline = request_deadline(&headers, runtime.submit_timeout);
    let service = complaint_service(db, rules, runtime, cache);
    let outcome = service
        .submit(
            auth_user.user_id,
            payload.into_draft(),
            DuplicatePolicy::Reject,
            deadline,
        )
        .await?;

    Ok(ApiResponse::ok(SubmitComplaintResponse {
        complaint: outcome.complaint.into(),
        points_credited: outcome.points_credited,
        reports_today: outcome.reports_today,
        daily_limit: rules.daily_report_limit,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/complaints/{id}",
    params(("id" = Uuid, Path, description = "Complaint ID")),
    responses(
        (status = 200, description = "Complaint with its status history", body = ComplaintDetailResponse),
        (status = 404, description = "Complaint not found", body = AppError),
    ),
    tag = "complaints"
)]
pub async fn get_complaint(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ComplaintService::new(db, rules, runtime);
    let detail = service.get_with_history(id).await?;

    Ok(ApiResponse::ok(ComplaintDetailResponse {
        complaint: detail.complaint.into(),
        history: detail.history.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/complaints",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("category_id" = Option<i32>, Query, description = "Filter by category"),
        ("user_id" = Option<Uuid>, Query, description = "Filter by reporter"),
    ),
    responses(
        (status = 200, description = "List of complaints", body = PaginatedResponse<ComplaintResponse>),
        (status = 400, description = "Unknown status", body = AppError),
    ),
    tag = "complaints"
)]
pub async fn list_complaints(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    Query(params): Query<ComplaintListQuery>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            ComplaintStatus::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown status '{}'", raw)))
        })
        .transpose()?;

    let filter = ComplaintFilter {
        status,
        category_id: params.category_id,
        user_id: params.user_id,
    };
    let page = PaginationQuery {
        page: params.page,
        per_page: params.per_page,
    };
    list_page(db, rules, runtime, filter, &page).await
}

#[utoipa::path(
    get,
    path = "/api/v1/me/complaints",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Complaints filed by the caller", body = PaginatedResponse<ComplaintResponse>),
    ),
    tag = "complaints"
)]
pub async fn my_complaints(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    auth_user: AuthUser,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = ComplaintFilter {
        user_id: Some(auth_user.user_id),
        ..Default::default()
    };
    list_page(db, rules, runtime, filter, &params).await
}

async fn list_page(
    db: DatabaseConnection,
    rules: RulesConfig,
    runtime: RuntimeConfig,
    filter: ComplaintFilter,
    pagination: &PaginationQuery,
) -> AppResult<ApiResponse<PaginatedResponse<ComplaintResponse>>> {
    let (page, per_page) = pagination.resolve();

    let service = ComplaintService::new(db, rules, runtime);
    let (complaints, total) = service.list(filter, page, per_page).await?;
    let items = complaints.into_iter().map(ComplaintResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/complaints/{id}/status",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Complaint ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status changed", body = TransitionResponse),
        (status = 403, description = "Admin or authority only", body = AppError),
        (status = 404, description = "Complaint not found", body = AppError),
        (status = 409, description = "Illegal transition", body = AppError),
    ),
    tag = "complaints"
)]
pub async fn transition_status(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(validation_error)?;
    let actor = require_staff(&auth_user)?;

    let service = complaint_service(db, rules, runtime, cache);
    let outcome = service
        .transition_status(id, payload.status, &actor, payload.note)
        .await?;

    Ok(ApiResponse::ok(TransitionResponse {
        complaint: outcome.complaint.into(),
        entry: outcome.entry.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/complaints/duplicate-check",
    security(("jwt_token" = [])),
    request_body = DuplicateCheckRequest,
    responses(
        (status = 200, description = "Whether a similar report was filed recently nearby", body = DuplicateCheckResponse),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "complaints"
)]
pub async fn check_duplicate(
    Extension(db): Extension<DatabaseConnection>,
    Extension(rules): Extension<RulesConfig>,
    Extension(runtime): Extension<RuntimeConfig>,
    _auth_user: AuthUser,
    Json(payload): Json<DuplicateCheckRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(validation_error)?;

    let service = ComplaintService::new(db, rules, runtime);
    let existing = service
        .check_duplicate(
            payload.category_id,
            GeoPoint::new(payload.latitude, payload.longitude),
        )
        .await?;

    Ok(ApiResponse::ok(DuplicateCheckResponse {
        duplicate: existing.is_some(),
        existing,
        radius_meters: rules.duplicate_radius_meters,
        window_hours: rules.duplicate_window_hours,
    }))
}
