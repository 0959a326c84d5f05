mod config;
mod error;
mod handlers;
mod middleware;
mod migration;
mod models;
mod response;
mod routes;
mod services;
mod utils;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use services::cache::CacheService;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Complaint routes
        crate::handlers::complaint::submit_complaint,
        crate::handlers::complaint::get_complaint,
        crate::handlers::complaint::list_complaints,
        crate::handlers::complaint::my_complaints,
        crate::handlers::complaint::transition_status,
        crate::handlers::complaint::check_duplicate,
        // Category routes
        crate::handlers::category::list_categories,
        // Leaderboard routes
        crate::handlers::leaderboard::get_leaderboard,
        crate::handlers::leaderboard::get_user_rank,
        // User routes
        crate::handlers::user::get_me,
        crate::handlers::user::my_points,
        crate::handlers::user::my_quota,
        // Admin routes
        crate::handlers::admin::get_stats,
        crate::handlers::admin::award_points,
        crate::handlers::admin::submit_on_behalf,
        crate::handlers::admin::update_user_role,
        crate::handlers::admin::reconcile_points,
        crate::handlers::admin::reconcile_ledger,
    ),
    components(
        schemas(
            crate::response::ApiResponse<serde_json::Value>,
            crate::response::PaginatedResponse<serde_json::Value>,
            crate::response::PaginationQuery,
            crate::error::AppError,
            crate::models::ComplaintStatus,
            crate::models::PointAction,
            crate::models::ProfileRole,
            // Complaint
            crate::handlers::complaint::SubmitComplaintRequest,
            crate::handlers::complaint::SubmitComplaintResponse,
            crate::handlers::complaint::ComplaintResponse,
            crate::handlers::complaint::ComplaintDetailResponse,
            crate::handlers::complaint::StatusHistoryResponse,
            crate::handlers::complaint::TransitionRequest,
            crate::handlers::complaint::TransitionResponse,
            crate::handlers::complaint::DuplicateCheckRequest,
            crate::handlers::complaint::DuplicateCheckResponse,
            crate::handlers::complaint::ComplaintListQuery,
            crate::services::duplicate::DuplicateMatch,
            // Category
            crate::handlers::category::CategoryResponse,
            crate::handlers::category::SubcategoryResponse,
            // Leaderboard
            crate::handlers::leaderboard::LeaderboardQuery,
            crate::services::leaderboard::LeaderboardEntry,
            crate::services::leaderboard::UserRank,
            // User
            crate::handlers::user::ProfileResponse,
            crate::handlers::user::LedgerEntryResponse,
            crate::handlers::user::PointsResponse,
            crate::handlers::user::PointsHistoryQuery,
            crate::services::quota::QuotaUsage,
            // Admin
            crate::handlers::admin::AwardRequest,
            crate::handlers::admin::AppealSubmissionRequest,
            crate::handlers::admin::UpdateRoleRequest,
            crate::handlers::admin::ReconcileResponse,
            crate::services::admin::AdminStats,
            crate::services::admin::StatusCount,
            crate::services::complaint::DuplicatePolicy,
        )
    ),
    tags(
        (name = "complaints", description = "Complaint intake and lifecycle"),
        (name = "categories", description = "Complaint category directory"),
        (name = "leaderboard", description = "Points rankings"),
        (name = "users", description = "Caller profile, points and quota"),
        (name = "admin", description = "Administrative operations"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civicdesk=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration before doing anything else
    let (jwt_config, database_url) = validate_config()?;

    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting civicdesk v{}...", env!("CARGO_PKG_VERSION"));

    let rules = config::rules::RulesConfig::from_env();
    let runtime = config::runtime::RuntimeConfig::from_env();
    tracing::info!(
        daily_report_limit = rules.daily_report_limit,
        duplicate_radius_m = rules.duplicate_radius_meters,
        duplicate_window_h = rules.duplicate_window_hours,
        civic_offset = %runtime.civic_offset,
        "Business rules loaded"
    );

    let db = config::database::get_database(&database_url).await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    // Redis/Cache is optional - graceful degradation if unavailable
    let cache = match config::redis::get_redis().await {
        Ok(Some(conn)) => {
            tracing::info!("Redis connected successfully");
            Some(CacheService::new(conn))
        }
        Ok(None) => {
            tracing::info!("REDIS_URL not set, running without cache");
            None
        }
        Err(e) => {
            tracing::warn!("Redis unavailable, running without cache: {}", e);
            None
        }
    };

    let mut app = create_app()
        .layer(Extension(db))
        .layer(Extension(rules))
        .layer(Extension(runtime));

    if let Some(cache) = cache {
        app = app.layer(Extension(cache));
    }

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<(config::jwt::JwtConfig, String)> {
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable must be set"))?;

    Ok((jwt_config, database_url))
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderName, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(handlers::complaint::REQUEST_TIMEOUT_HEADER),
        ]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "civicdesk",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
