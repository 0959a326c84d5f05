use crate::{
    config::{rules::RulesConfig, runtime::RuntimeConfig},
    error::{AppError, AppResult},
    models::{
        complaint, Complaint, ComplaintModel, ComplaintStatus, PointAction, PointsLedgerModel,
        StatusHistoryModel,
    },
    services::{
        cache::CacheService,
        complaint_state::{
            Actor, ComplaintDraft, ComplaintStateMachine, LifecycleEvent, TransitionOutcome,
        },
        duplicate::{DuplicateGuard, DuplicateMatch},
        points::PointsLedgerService,
        quota::QuotaTracker,
        retry::{backoff_delay, retry_transient},
    },
    utils::geo::GeoPoint,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

/// Attempts for the complaint write when the store connection drops.
const SUBMIT_WRITE_ATTEMPTS: u32 = 3;

/// What to do when a submission matches a recent nearby report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    /// Keep the complaint but mark it `flagged_duplicate`.
    Flag,
    /// Skip the duplicate check.
    Allow,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitOutcome {
    pub complaint: ComplaintModel,
    /// False when the `valid_report` credit was deferred to a background retry.
    pub points_credited: bool,
    pub reports_today: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComplaintDetail {
    pub complaint: ComplaintModel,
    pub history: Vec<StatusHistoryModel>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    pub category_id: Option<i32>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, FromQueryResult)]
struct UncreditedComplaint {
    id: Uuid,
    user_id: Uuid,
}

/// Single entry point for creating complaints and moving them through their lifecycle.
pub struct ComplaintService {
    db: DatabaseConnection,
    rules: RulesConfig,
    runtime: RuntimeConfig,
    cache: Option<CacheService>,
}

impl ComplaintService {
    pub fn new(db: DatabaseConnection, rules: RulesConfig, runtime: RuntimeConfig) -> Self {
        Self {
            db,
            rules,
            runtime,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<CacheService>) -> Self {
        self.cache = cache;
        self
    }

    fn state(&self) -> ComplaintStateMachine {
        ComplaintStateMachine::new(self.db.clone())
    }

    fn ledger(&self) -> PointsLedgerService {
        PointsLedgerService::new(self.db.clone()).with_cache(self.cache.clone())
    }

    fn quota(&self) -> QuotaTracker {
        QuotaTracker::new(self.db.clone(), self.rules.daily_report_limit)
    }

    /// Files a complaint: reserve quota, check for duplicates and create under one
    /// category lock, then credit `valid_report`.
    ///
    /// `deadline` bounds the duplicate check and the write. When it expires the
    /// service looks for the pre-generated complaint id before deciding whether
    /// to hand the quota slot back.
    pub async fn submit(
        &self,
        user_id: Uuid,
        draft: ComplaintDraft,
        policy: DuplicatePolicy,
        deadline: Duration,
    ) -> AppResult<SubmitOutcome> {
        draft.validate()?;

        let today = self.runtime.civic_today();
        let quota = self.quota();
        let reports_today = quota.check_and_reserve(user_id, today).await?;

        let complaint_id = Uuid::new_v4();
        let written = match tokio::time::timeout(
            deadline,
            self.write_complaint(complaint_id, user_id, &draft, policy),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    complaint_id = %complaint_id,
                    ?deadline,
                    "Submission deadline reached, confirming write"
                );
                match self.state().find(complaint_id).await {
                    Ok(Some(existing)) => Ok(existing),
                    Ok(None) => Err(AppError::Timeout),
                    Err(e) => {
                        // Outcome unknown; the slot stays reserved.
                        tracing::error!(
                            complaint_id = %complaint_id,
                            "Could not confirm submission after deadline: {}",
                            e
                        );
                        return Err(AppError::Timeout);
                    }
                }
            }
        };

        let complaint = match written {
            Ok(complaint) => complaint,
            Err(e) => {
                if let Err(release_err) = quota.release(user_id, today).await {
                    tracing::error!(
                        user_id = %user_id,
                        "Failed to release quota after rejected submission: {}",
                        release_err
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            complaint_id = %complaint.id,
            user_id = %user_id,
            category_id = complaint.category_id,
            flagged_duplicate = complaint.flagged_duplicate,
            "Complaint submitted"
        );

        let points_credited = self
            .credit(user_id, complaint.id, PointAction::ValidReport)
            .await;

        Ok(SubmitOutcome {
            complaint,
            points_credited,
            reports_today,
        })
    }

    async fn write_complaint(
        &self,
        complaint_id: Uuid,
        user_id: Uuid,
        draft: &ComplaintDraft,
        policy: DuplicatePolicy,
    ) -> AppResult<ComplaintModel> {
        let mut first_attempt = true;
        retry_transient("complaint write", SUBMIT_WRITE_ATTEMPTS, || {
            let confirm = !std::mem::replace(&mut first_attempt, false);
            async move {
                if confirm {
                    if let Some(existing) = self.state().find(complaint_id).await? {
                        return Ok(existing);
                    }
                }
                self.write_once(complaint_id, user_id, draft, policy).await
            }
        })
        .await
    }

    async fn write_once(
        &self,
        complaint_id: Uuid,
        user_id: Uuid,
        draft: &ComplaintDraft,
        policy: DuplicatePolicy,
    ) -> AppResult<ComplaintModel> {
        let txn = self.db.begin().await?;
        DuplicateGuard::lock_category(&txn, draft.category_id).await?;

        let flagged_duplicate = match policy {
            DuplicatePolicy::Allow => false,
            DuplicatePolicy::Reject | DuplicatePolicy::Flag => {
                let duplicate = DuplicateGuard::from_rules(&self.rules)
                    .check(
                        &txn,
                        Some(user_id),
                        draft.category_id,
                        draft.location,
                        self.rules.duplicate_window(),
                    )
                    .await?;
                if duplicate && policy == DuplicatePolicy::Reject {
                    return Err(AppError::DuplicateReport);
                }
                duplicate
            }
        };

        let complaint =
            ComplaintStateMachine::create(&txn, complaint_id, user_id, draft, flagged_duplicate)
                .await?;
        txn.commit().await?;
        Ok(complaint)
    }

    /// Awards `action` once; on failure hands it to a background retry and returns false.
    async fn credit(&self, user_id: Uuid, complaint_id: Uuid, action: PointAction) -> bool {
        match self.ledger().award_once(user_id, complaint_id, action).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    complaint_id = %complaint_id,
                    action = %action,
                    "Deferring ledger credit: {}",
                    e
                );
                self.spawn_credit_retry(user_id, complaint_id, action);
                false
            }
        }
    }

    fn spawn_credit_retry(&self, user_id: Uuid, complaint_id: Uuid, action: PointAction) {
        let ledger = self.ledger();
        let attempts = self.runtime.ledger_retry_attempts;
        tokio::spawn(async move {
            for attempt in 0..attempts {
                tokio::time::sleep(backoff_delay(attempt)).await;
                match ledger.award_once(user_id, complaint_id, action).await {
                    Ok(_) => {
                        tracing::info!(
                            complaint_id = %complaint_id,
                            action = %action,
                            attempt = attempt + 1,
                            "Deferred ledger credit recorded"
                        );
                        return;
                    }
                    Err(e) => tracing::warn!(
                        complaint_id = %complaint_id,
                        action = %action,
                        attempt = attempt + 1,
                        "Deferred ledger credit failed: {}",
                        e
                    ),
                }
            }
            tracing::error!(
                user_id = %user_id,
                complaint_id = %complaint_id,
                action = %action,
                "Giving up on ledger credit; ledger reconciliation will repair it"
            );
        });
    }

    /// Applies a status change and awards `govt_resolved` when an authority resolves.
    pub async fn transition_status(
        &self,
        complaint_id: Uuid,
        next: ComplaintStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> AppResult<TransitionOutcome> {
        if !actor.role.can_transition_complaints() {
            return Err(AppError::Forbidden);
        }

        let outcome = self
            .state()
            .transition(complaint_id, next, actor, note)
            .await?;

        if let Some(LifecycleEvent::ResolvedByAuthority {
            complaint_id,
            owner_id,
        }) = outcome.event
        {
            self.credit(owner_id, complaint_id, PointAction::GovtResolved)
                .await;
        }

        // Rejection withdraws the report from its owner's valid count.
        if next == ComplaintStatus::Rejected {
            self.ledger().invalidate_leaderboard().await;
        }

        Ok(outcome)
    }

    /// Records an administrator's verdict on a complaint as a ledger entry.
    pub async fn adjudicate(
        &self,
        complaint_id: Uuid,
        action: PointAction,
        admin_id: Uuid,
    ) -> AppResult<PointsLedgerModel> {
        if !action.is_adjudicated() {
            return Err(AppError::Validation(format!(
                "{} is awarded automatically",
                action
            )));
        }

        let complaint = self.state().get(complaint_id).await?;
        let entry = self
            .ledger()
            .award(complaint.user_id, Some(complaint.id), action, action.points())
            .await?;

        if matches!(
            action,
            PointAction::SelfCleaned | PointAction::ParkingViolation
        ) {
            Complaint::update_many()
                .col_expr(complaint::Column::Verified, Expr::value(true))
                .col_expr(
                    complaint::Column::UpdatedAt,
                    Expr::value(chrono::Utc::now().naive_utc()),
                )
                .filter(complaint::Column::Id.eq(complaint.id))
                .exec(&self.db)
                .await?;
        }

        tracing::info!(
            complaint_id = %complaint.id,
            owner = %complaint.user_id,
            admin = %admin_id,
            action = %action,
            "Adjudication recorded"
        );
        Ok(entry)
    }

    /// Advisory pre-check; the real check runs again at submission.
    pub async fn check_duplicate(
        &self,
        category_id: i32,
        location: GeoPoint,
    ) -> AppResult<Option<DuplicateMatch>> {
        if !location.is_valid() {
            return Err(AppError::Validation("Coordinates out of range".to_string()));
        }
        DuplicateGuard::from_rules(&self.rules)
            .find_duplicate(
                &self.db,
                category_id,
                location,
                self.rules.duplicate_window(),
            )
            .await
    }

    pub async fn get_with_history(&self, complaint_id: Uuid) -> AppResult<ComplaintDetail> {
        let state = self.state();
        let complaint = state.get(complaint_id).await?;
        let history = state.history(complaint_id).await?;
        Ok(ComplaintDetail { complaint, history })
    }

    pub async fn list(
        &self,
        filter: ComplaintFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ComplaintModel>, u64)> {
        let mut query = Complaint::find();
        if let Some(status) = filter.status {
            query = query.filter(complaint::Column::Status.eq(status));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(complaint::Column::CategoryId.eq(category_id));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(complaint::Column::UserId.eq(user_id));
        }

        let paginator = query
            .order_by_desc(complaint::Column::CreatedAt)
            .order_by_desc(complaint::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let complaints = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((complaints, total))
    }

    /// Credits `valid_report` to every complaint whose owner never received it.
    pub async fn reconcile_missing_awards(&self) -> AppResult<u64> {
        let missing = UncreditedComplaint::find_by_statement(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT c.id, c.user_id
             FROM complaints c
             WHERE NOT EXISTS (
                 SELECT 1 FROM points_ledger l
                 WHERE l.complaint_id = c.id
                   AND l.user_id = c.user_id
                   AND l.action = 'valid_report'
             )
             ORDER BY c.created_at",
        ))
        .all(&self.db)
        .await?;

        let ledger = self.ledger();
        let mut repaired = 0u64;
        for row in missing {
            if ledger
                .award_once(row.user_id, row.id, PointAction::ValidReport)
                .await?
            {
                repaired += 1;
            }
        }

        if repaired > 0 {
            tracing::warn!(repaired, "Credited complaints missing valid_report");
        }
        Ok(repaired)
    }
}
