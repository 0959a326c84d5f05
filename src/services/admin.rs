use crate::{
    config::runtime::RuntimeConfig,
    error::AppResult,
    models::{complaint, Complaint, ComplaintStatus, Profile},
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Statement,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: ComplaintStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_complaints: u64,
    pub by_status: Vec<StatusCount>,
    /// Complaints created since the start of the current civic day.
    pub complaints_today: u64,
    pub flagged_duplicates: u64,
    pub total_users: u64,
    pub ledger_points_total: i64,
}

pub struct AdminService {
    db: DatabaseConnection,
}

impl AdminService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_stats(&self, runtime: &RuntimeConfig) -> AppResult<AdminStats> {
        let grouped: Vec<(ComplaintStatus, i64)> = Complaint::find()
            .select_only()
            .column(complaint::Column::Status)
            .column_as(complaint::Column::Id.count(), "count")
            .group_by(complaint::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        let by_status = fill_status_counts(grouped);
        let total_complaints = by_status.iter().map(|s| s.count).sum();

        let today_start = runtime.civic_day_start_utc(runtime.civic_today());
        let complaints_today = Complaint::find()
            .filter(complaint::Column::CreatedAt.gte(today_start))
            .count(&self.db)
            .await?;

        let flagged_duplicates = Complaint::find()
            .filter(complaint::Column::FlaggedDuplicate.eq(true))
            .count(&self.db)
            .await?;

        let total_users = Profile::find().count(&self.db).await?;

        let ledger_points_total = match self
            .db
            .query_one(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT COALESCE(SUM(delta), 0)::BIGINT FROM points_ledger",
            ))
            .await?
        {
            Some(row) => row.try_get_by_index(0)?,
            None => 0,
        };

        Ok(AdminStats {
            total_complaints,
            by_status,
            complaints_today,
            flagged_duplicates,
            total_users,
            ledger_points_total,
        })
    }
}

/// One entry per status in lifecycle order, zero for statuses with no complaints.
fn fill_status_counts(grouped: Vec<(ComplaintStatus, i64)>) -> Vec<StatusCount> {
    use sea_orm::Iterable;

    ComplaintStatus::iter()
        .map(|status| StatusCount {
            status,
            count: grouped
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, n)| (*n).max(0) as u64)
                .unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_statuses_count_as_zero() {
        let counts = fill_status_counts(vec![
            (ComplaintStatus::Resolved, 2),
            (ComplaintStatus::Submitted, 7),
        ]);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[0].status, ComplaintStatus::Submitted);
        assert_eq!(counts[0].count, 7);
        assert_eq!(counts[1].count, 0);
        assert_eq!(counts[3].status, ComplaintStatus::Resolved);
        assert_eq!(counts[3].count, 2);
    }
}
