use crate::{
    error::{AppError, AppResult},
    models::{daily_quota, DailyQuota},
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Statement};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct QuotaUsage {
    pub date: NaiveDate,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl QuotaUsage {
    fn new(date: NaiveDate, used: u32, limit: u32) -> Self {
        Self {
            date,
            used,
            limit,
            remaining: limit.saturating_sub(used),
        }
    }
}

/// Per-user daily submission counter keyed by `(user_id, civic date)`.
pub struct QuotaTracker {
    db: DatabaseConnection,
    daily_limit: u32,
}

impl QuotaTracker {
    pub fn new(db: DatabaseConnection, daily_limit: u32) -> Self {
        Self { db, daily_limit }
    }

    /// Atomically claims one submission slot for `today`.
    ///
    /// The upsert only increments while the count is below the limit, so two
    /// concurrent requests cannot both take the last slot.
    pub async fn check_and_reserve(&self, user_id: Uuid, today: NaiveDate) -> AppResult<u32> {
        let now = chrono::Utc::now().naive_utc();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "INSERT INTO user_daily_quotas AS q (user_id, quota_date, report_count, updated_at)
                 SELECT $1, $2, 1, $4 WHERE $3 > 0
                 ON CONFLICT (user_id, quota_date)
                 DO UPDATE SET report_count = q.report_count + 1, updated_at = EXCLUDED.updated_at
                 WHERE q.report_count < $3
                 RETURNING report_count",
                vec![
                    user_id.into(),
                    today.into(),
                    (self.daily_limit as i32).into(),
                    now.into(),
                ],
            ))
            .await?;

        match row {
            Some(row) => {
                let count: i32 = row.try_get_by_index(0)?;
                tracing::debug!(user_id = %user_id, %today, count, "Reserved report quota");
                Ok(count.max(0) as u32)
            }
            None => {
                tracing::info!(user_id = %user_id, %today, "Daily report limit reached");
                Err(AppError::QuotaExceeded {
                    limit: self.daily_limit,
                })
            }
        }
    }

    /// Gives back a slot taken by [`Self::check_and_reserve`] when a later step fails.
    pub async fn release(&self, user_id: Uuid, today: NaiveDate) -> AppResult<()> {
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "UPDATE user_daily_quotas
                 SET report_count = GREATEST(report_count - 1, 0), updated_at = $3
                 WHERE user_id = $1 AND quota_date = $2",
                vec![
                    user_id.into(),
                    today.into(),
                    chrono::Utc::now().naive_utc().into(),
                ],
            ))
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(user_id = %user_id, %today, "Quota release found no reservation");
        }
        Ok(())
    }

    pub async fn usage(&self, user_id: Uuid, today: NaiveDate) -> AppResult<QuotaUsage> {
        let used = DailyQuota::find()
            .filter(daily_quota::Column::UserId.eq(user_id))
            .filter(daily_quota::Column::QuotaDate.eq(today))
            .one(&self.db)
            .await?
            .map(|q| q.report_count.max(0) as u32)
            .unwrap_or(0);

        Ok(QuotaUsage::new(today, used, self.daily_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_never_underflows() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(QuotaUsage::new(date, 2, 5).remaining, 3);
        assert_eq!(QuotaUsage::new(date, 5, 5).remaining, 0);
        assert_eq!(QuotaUsage::new(date, 7, 5).remaining, 0);
    }
}
