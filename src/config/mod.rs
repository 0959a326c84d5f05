pub mod database;
pub mod jwt;
pub mod rate_limit;
pub mod redis;
pub mod rules;
pub mod runtime;
