use crate::{
    error::{AppError, AppResult},
    models::{points_ledger, profile, PointAction, PointsLedger, PointsLedgerModel, Profile},
    services::cache::CacheService,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Statement, TransactionTrait,
};
use uuid::Uuid;

use super::leaderboard::invalidate_standings;

/// Append-only points ledger. A user's total is the sum of their entries;
/// `profiles.points` is a cache of that sum kept in step on every award.
pub struct PointsLedgerService {
    db: DatabaseConnection,
    cache: Option<CacheService>,
}

impl PointsLedgerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, cache: None }
    }

    pub fn with_cache(mut self, cache: Option<CacheService>) -> Self {
        self.cache = cache;
        self
    }

    /// Records one award. Every action is tied to a complaint, and a repeated
    /// `(user, complaint, action)` is rejected with [`AppError::DuplicateLedgerEntry`]
    /// leaving the ledger untouched.
    pub async fn award(
        &self,
        user_id: Uuid,
        complaint_id: Option<Uuid>,
        action: PointAction,
        points: i32,
    ) -> AppResult<PointsLedgerModel> {
        if complaint_id.is_none() {
            return Err(AppError::Validation(format!(
                "{} requires a complaint reference",
                action
            )));
        }

        let txn = self.db.begin().await?;

        let entry_id = Uuid::new_v4();
        let now = chrono::Utc::now().naive_utc();

        // 1) ledger row; the partial unique index makes a retry a no-op
        let inserted = txn
            .query_one(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "INSERT INTO points_ledger (id, user_id, complaint_id, action, delta, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (user_id, complaint_id, action) WHERE complaint_id IS NOT NULL
                 DO NOTHING
                 RETURNING id",
                vec![
                    entry_id.into(),
                    user_id.into(),
                    complaint_id.into(),
                    action.as_str().into(),
                    points.into(),
                    now.into(),
                ],
            ))
            .await?;

        if inserted.is_none() {
            txn.rollback().await?;
            return Err(AppError::DuplicateLedgerEntry);
        }

        // 2) cached projection on the profile
        let result = Profile::update_many()
            .col_expr(
                profile::Column::Points,
                Expr::col(profile::Column::Points).add(points),
            )
            .col_expr(profile::Column::UpdatedAt, Expr::value(now))
            .filter(profile::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        txn.commit().await?;

        tracing::info!(
            user_id = %user_id,
            complaint_id = ?complaint_id,
            action = %action,
            points,
            "Recorded ledger entry"
        );
        self.invalidate_leaderboard().await;

        Ok(PointsLedgerModel {
            id: entry_id,
            user_id,
            complaint_id,
            action,
            delta: points,
            created_at: now,
        })
    }

    /// Awards `action` at its table value, treating an existing entry as success.
    pub async fn award_once(
        &self,
        user_id: Uuid,
        complaint_id: Uuid,
        action: PointAction,
    ) -> AppResult<bool> {
        match self
            .award(user_id, Some(complaint_id), action, action.points())
            .await
        {
            Ok(_) => Ok(true),
            Err(AppError::DuplicateLedgerEntry) => {
                tracing::debug!(
                    user_id = %user_id,
                    complaint_id = %complaint_id,
                    action = %action,
                    "Award already recorded, skipping"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Sum of the user's ledger entries; the source of truth for their points.
    pub async fn total_for(&self, user_id: Uuid) -> AppResult<i64> {
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT COALESCE(SUM(delta), 0)::BIGINT FROM points_ledger WHERE user_id = $1",
                vec![user_id.into()],
            ))
            .await?;
        match row {
            Some(row) => Ok(row.try_get_by_index(0)?),
            None => Ok(0),
        }
    }

    pub async fn history(&self, user_id: Uuid, limit: u64) -> AppResult<Vec<PointsLedgerModel>> {
        Ok(PointsLedger::find()
            .filter(points_ledger::Column::UserId.eq(user_id))
            .order_by_desc(points_ledger::Column::CreatedAt)
            .order_by_desc(points_ledger::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Repairs every profile whose cached total drifted from its ledger sum.
    pub async fn reconcile_cached_totals(&self) -> AppResult<u64> {
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "UPDATE profiles p
                 SET points = s.total, updated_at = $1
                 FROM (
                     SELECT pr.id, COALESCE(SUM(l.delta), 0)::INTEGER AS total
                     FROM profiles pr
                     LEFT JOIN points_ledger l ON l.user_id = pr.id
                     GROUP BY pr.id
                 ) s
                 WHERE p.id = s.id AND p.points <> s.total",
                vec![chrono::Utc::now().naive_utc().into()],
            ))
            .await?;

        let fixed = result.rows_affected();
        if fixed > 0 {
            tracing::warn!(fixed, "Corrected drifted cached point totals");
            self.invalidate_leaderboard().await;
        }
        Ok(fixed)
    }

    pub(crate) async fn invalidate_leaderboard(&self) {
        if let Some(cache) = &self.cache {
            invalidate_standings(cache).await;
        }
    }
}
