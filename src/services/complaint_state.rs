use crate::{
    error::{AppError, AppResult},
    models::{
        complaint, status_history, Complaint, ComplaintModel, ComplaintStatus, PointAction,
        ProfileRole, StatusHistory, StatusHistoryModel,
    },
    services::category::CategoryService,
    utils::geo::GeoPoint,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const ADDRESS_MAX_CHARS: usize = 300;
pub const NOTE_MAX_CHARS: usize = 1000;

/// A citizen's report as received, before it becomes a complaint.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplaintDraft {
    pub category_id: i32,
    pub subcategory_id: Option<i32>,
    pub description: String,
    pub location: GeoPoint,
    pub address: Option<String>,
}

impl ComplaintDraft {
    /// Checks everything that does not need the store.
    pub fn validate(&self) -> AppResult<()> {
        let description_chars = self.description.trim().chars().count();
        if !(DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&description_chars) {
            return Err(AppError::Validation(format!(
                "Description must be between {} and {} characters",
                DESCRIPTION_MIN_CHARS, DESCRIPTION_MAX_CHARS
            )));
        }
        if !self.location.is_valid() {
            return Err(AppError::Validation(
                "Latitude must be within [-90, 90] and longitude within [-180, 180]".to_string(),
            ));
        }
        if let Some(address) = &self.address {
            if address.chars().count() > ADDRESS_MAX_CHARS {
                return Err(AppError::Validation(format!(
                    "Address must be at most {} characters",
                    ADDRESS_MAX_CHARS
                )));
            }
        }
        Ok(())
    }
}

/// Who is changing a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ProfileRole,
}

/// Side effects the state machine reports but does not perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// An external authority closed the complaint; the owner earns `govt_resolved`.
    ResolvedByAuthority { complaint_id: Uuid, owner_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub complaint: ComplaintModel,
    pub entry: StatusHistoryModel,
    pub event: Option<LifecycleEvent>,
}

/// Validates a move and decides whether it emits a lifecycle event.
fn plan_transition(
    complaint: &ComplaintModel,
    next: ComplaintStatus,
    actor: &Actor,
) -> AppResult<Option<LifecycleEvent>> {
    if !complaint.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: complaint.status,
            to: next,
        });
    }

    let event = (next == ComplaintStatus::Resolved && actor.role == ProfileRole::Authority)
        .then_some(LifecycleEvent::ResolvedByAuthority {
            complaint_id: complaint.id,
            owner_id: complaint.user_id,
        });
    Ok(event)
}

/// Owns `complaints.status` and the append-only `complaint_status_history`.
pub struct ComplaintStateMachine {
    db: DatabaseConnection,
}

impl ComplaintStateMachine {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a `submitted` complaint and its initial history entry on `conn`.
    ///
    /// Runs on the caller's connection so both rows share the caller's transaction.
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
        user_id: Uuid,
        draft: &ComplaintDraft,
        flagged_duplicate: bool,
    ) -> AppResult<ComplaintModel> {
        draft.validate()?;
        let category =
            CategoryService::resolve(conn, draft.category_id, draft.subcategory_id).await?;

        let now = chrono::Utc::now().naive_utc();
        let complaint = complaint::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            category_id: Set(category.category_id),
            subcategory_id: Set(category.subcategory_id),
            description: Set(draft.description.trim().to_string()),
            latitude: Set(draft.location.latitude),
            longitude: Set(draft.location.longitude),
            address: Set(draft
                .address
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)),
            department: Set(category.department),
            status: Set(ComplaintStatus::INITIAL),
            points_awarded: Set(PointAction::ValidReport.points()),
            verified: Set(false),
            flagged_duplicate: Set(flagged_duplicate),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            complaint_id: Set(id),
            previous_status: Set(None),
            new_status: Set(ComplaintStatus::INITIAL),
            actor_id: Set(user_id),
            note: Set(None),
            sequence: Set(1),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;

        Ok(complaint)
    }

    /// Moves a complaint along the lifecycle graph.
    ///
    /// The complaint row is locked for the duration, so concurrent transitions of
    /// the same complaint apply one after the other.
    pub async fn transition(
        &self,
        complaint_id: Uuid,
        next: ComplaintStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> AppResult<TransitionOutcome> {
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if note
            .as_ref()
            .is_some_and(|n| n.chars().count() > NOTE_MAX_CHARS)
        {
            return Err(AppError::Validation(format!(
                "Note must be at most {} characters",
                NOTE_MAX_CHARS
            )));
        }

        let txn = self.db.begin().await?;

        let current = Complaint::find_by_id(complaint_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let event = plan_transition(&current, next, actor)?;
        let previous = current.status;

        let sequence = StatusHistory::find()
            .filter(status_history::Column::ComplaintId.eq(complaint_id))
            .count(&txn)
            .await? as i32
            + 1;

        let now = chrono::Utc::now().naive_utc();
        let mut active: complaint::ActiveModel = current.into();
        active.status = Set(next);
        active.updated_at = Set(now);
        let complaint = active.update(&txn).await?;

        let entry = status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            complaint_id: Set(complaint_id),
            previous_status: Set(Some(previous)),
            new_status: Set(next),
            actor_id: Set(actor.id),
            note: Set(note),
            sequence: Set(sequence),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(
            complaint_id = %complaint_id,
            from = %previous,
            to = %next,
            actor = %actor.id,
            "Complaint status changed"
        );

        Ok(TransitionOutcome {
            complaint,
            entry,
            event,
        })
    }

    pub async fn get(&self, complaint_id: Uuid) -> AppResult<ComplaintModel> {
        Complaint::find_by_id(complaint_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn find(&self, complaint_id: Uuid) -> AppResult<Option<ComplaintModel>> {
        Ok(Complaint::find_by_id(complaint_id).one(&self.db).await?)
    }

    pub async fn history(&self, complaint_id: Uuid) -> AppResult<Vec<StatusHistoryModel>> {
        Ok(StatusHistory::find()
            .filter(status_history::Column::ComplaintId.eq(complaint_id))
            .order_by_asc(status_history::Column::Sequence)
            .all(&self.db)
            .await?)
    }
}
