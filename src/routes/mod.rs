use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::auth_middleware;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let public_read = public_read_routes(&rate_limit_config);
    let submit = submit_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));
    let staff = staff_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    public_read.merge(submit).merge(staff)
}

/// Anonymous reads: complaints, categories, leaderboard.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/categories",
            routing::get(handlers::category::list_categories),
        )
        .route(
            "/complaints",
            routing::get(handlers::complaint::list_complaints),
        )
        .route(
            "/complaints/{id}",
            routing::get(handlers::complaint::get_complaint),
        )
        .route(
            "/leaderboard",
            routing::get(handlers::leaderboard::get_leaderboard),
        )
        .route(
            "/users/{id}/rank",
            routing::get(handlers::leaderboard::get_user_rank),
        );

    with_optional_rate_limit(router, config.enabled, config.public_read)
}

/// Complaint intake.
fn submit_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/complaints",
            routing::post(handlers::complaint::submit_complaint),
        )
        .route(
            "/complaints/duplicate-check",
            routing::post(handlers::complaint::check_duplicate),
        );

    with_optional_rate_limit(router, config.enabled, config.submit)
}

/// Authenticated reads, lifecycle transitions and admin operations.
fn staff_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Me
        .route("/me", routing::get(handlers::user::get_me))
        .route(
            "/me/complaints",
            routing::get(handlers::complaint::my_complaints),
        )
        .route("/me/points", routing::get(handlers::user::my_points))
        .route("/me/quota", routing::get(handlers::user::my_quota))
        // Lifecycle (admin or authority - checked in handler)
        .route(
            "/complaints/{id}/status",
            routing::put(handlers::complaint::transition_status),
        )
        // Admin
        .route("/admin/stats", routing::get(handlers::admin::get_stats))
        .route(
            "/admin/complaints/{id}/awards",
            routing::post(handlers::admin::award_points),
        )
        .route(
            "/admin/users/{id}/complaints",
            routing::post(handlers::admin::submit_on_behalf),
        )
        .route(
            "/admin/users/{id}/role",
            routing::put(handlers::admin::update_user_role),
        )
        .route(
            "/admin/points/reconcile",
            routing::post(handlers::admin::reconcile_points),
        )
        .route(
            "/admin/ledger/reconcile",
            routing::post(handlers::admin::reconcile_ledger),
        );

    with_optional_rate_limit(router, config.enabled, config.staff)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    match GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    {
        Some(governor_conf) => router.layer(GovernorLayer::new(governor_conf)),
        None => {
            tracing::warn!(?rule, "Invalid rate limit rule, serving without limit");
            router
        }
    }
}
