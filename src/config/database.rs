use crate::config::rate_limit::parse_bool_env;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Connection pool sizing. Submissions hold a connection for the whole
/// duplicate-check transaction, so the pool bounds concurrent intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub log_statements: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            log_statements: false,
        }
    }
}

impl PoolSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_connections = env_or("DB_MAX_CONNECTIONS", defaults.max_connections).max(1);
        Self {
            max_connections,
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections)
                .min(max_connections),
            acquire_timeout: Duration::from_secs(env_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )),
            log_statements: parse_bool_env("DB_LOG_STATEMENTS", defaults.log_statements),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

pub async fn get_database(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let settings = PoolSettings::from_env();
    tracing::debug!(?settings, "Opening database pool");

    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(settings.log_statements);

    Database::connect(opt).await
}
