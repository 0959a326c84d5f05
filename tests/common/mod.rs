#![allow(dead_code)]

use reqwest::Client;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, Once,
};
use uuid::Uuid;

static INIT: Once = Once::new();
static MIGRATIONS_RAN: AtomicBool = AtomicBool::new(false);
/// Tests in one binary share the database; each holds this for its whole run.
static DB_LOCK: Mutex<()> = Mutex::new(());

/// Centre of Bengaluru; tests offset from here.
pub const BASE_LAT: f64 = 12.9716;
pub const BASE_LNG: f64 = 77.5946;

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::remove_var("JWT_AUDIENCE");
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = civicdesk::config::jwt::JwtConfig::from_env().unwrap();
        let _ = civicdesk::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
    _guard: MutexGuard<'static, ()>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

pub async fn spawn_app() -> TestApp {
    let guard = DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    init_env();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    if !MIGRATIONS_RAN.swap(true, Ordering::SeqCst) {
        civicdesk::migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
    }

    cleanup_tables(&db).await;

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(civicdesk::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(
            civicdesk::config::rules::RulesConfig::default(),
        ))
        .layer(axum::extract::Extension(
            civicdesk::config::runtime::RuntimeConfig::default(),
        ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
        _guard: guard,
    }
}

async fn cleanup_tables(db: &DatabaseConnection) {
    // Category tables keep their migration seed.
    let tables = [
        "complaint_status_history",
        "points_ledger",
        "user_daily_quotas",
        "complaints",
        "profiles",
    ];

    for table in tables {
        let sql = format!("TRUNCATE TABLE {} CASCADE", table);
        let _ = db
            .execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                sql,
            ))
            .await;
    }
}

/// Mint a token for a fresh identity and provision its profile. Returns (user_id, token).
pub async fn create_test_user(app: &TestApp, name: &str) -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    let token = civicdesk::utils::jwt::encode_token(user_id, Some(name), 3600)
        .expect("Failed to mint token");

    let resp = app
        .client
        .get(app.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to provision profile");
    assert_eq!(resp.status(), 200, "profile provisioning failed");

    (user_id, token)
}

/// Change a user's role directly in the database.
pub async fn set_role(db: &DatabaseConnection, user_id: Uuid, role: &str) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE profiles SET role = $2 WHERE id = $1",
        vec![user_id.into(), role.into()],
    ))
    .await
    .expect("Failed to set role");
}

pub async fn make_admin(db: &DatabaseConnection, user_id: Uuid) {
    set_role(db, user_id, "admin").await;
}

pub async fn category_id(db: &DatabaseConnection, slug: &str) -> i32 {
    let row = db
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT id FROM categories WHERE slug = $1",
            vec![slug.into()],
        ))
        .await
        .expect("Failed to query categories")
        .unwrap_or_else(|| panic!("Category '{}' not seeded", slug));
    row.try_get_by_index(0).unwrap()
}

pub async fn subcategory_id(db: &DatabaseConnection, category: &str, slug: &str) -> i32 {
    let row = db
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT s.id FROM subcategories s JOIN categories c ON c.id = s.category_id
             WHERE c.slug = $1 AND s.slug = $2",
            vec![category.into(), slug.into()],
        ))
        .await
        .expect("Failed to query subcategories")
        .unwrap_or_else(|| panic!("Subcategory '{}/{}' not seeded", category, slug));
    row.try_get_by_index(0).unwrap()
}

pub fn complaint_body(category_id: i32, lat: f64, lng: f64) -> Value {
    serde_json::json!({
        "category_id": category_id,
        "description": "Garbage has not been collected for a week",
        "latitude": lat,
        "longitude": lng,
    })
}

/// Submit a complaint and return the raw response.
pub async fn submit(app: &TestApp, token: &str, body: &Value) -> reqwest::Response {
    app.client
        .post(app.url("/complaints"))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .expect("Failed to submit complaint")
}

/// Submit a complaint that must succeed and return its id.
pub async fn submit_ok(app: &TestApp, token: &str, category_id: i32, lat: f64, lng: f64) -> Uuid {
    let resp = submit(app, token, &complaint_body(category_id, lat, lng)).await;
    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse submit response");
    assert_eq!(status, 200, "submit failed: {}", body);
    body["data"]["complaint"]["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("Response missing complaint id")
}

/// Move a complaint to `status` and return the raw response.
pub async fn transition(
    app: &TestApp,
    token: &str,
    complaint_id: Uuid,
    status: &str,
) -> reqwest::Response {
    app.client
        .put(app.url(&format!("/complaints/{}/status", complaint_id)))
        .bearer_auth(token)
        .json(&serde_json::json!({ "status": status }))
        .send()
        .await
        .expect("Failed to transition complaint")
}

/// Shift every complaint's creation time back by `hours`.
pub async fn backdate_complaints(db: &DatabaseConnection, hours: i64) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE complaints SET created_at = created_at - make_interval(hours => $1)",
        vec![(hours as i32).into()],
    ))
    .await
    .expect("Failed to backdate complaints");
}

pub async fn count_rows(db: &DatabaseConnection, sql: &str, values: Vec<sea_orm::Value>) -> i64 {
    let row = db
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            sql,
            values,
        ))
        .await
        .expect("Count query failed")
        .expect("Count query returned no row");
    row.try_get_by_index(0).unwrap()
}
