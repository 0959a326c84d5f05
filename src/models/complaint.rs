use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Lifecycle state of a complaint.
///
/// `Submitted` is the only initial state. `Resolved` and `Rejected` are terminal.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "forwarded")]
    Forwarded,
    #[sea_orm(string_value = "acknowledged")]
    Acknowledged,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ComplaintStatus {
    pub const INITIAL: ComplaintStatus = ComplaintStatus::Submitted;

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Submitted => "submitted",
            ComplaintStatus::Forwarded => "forwarded",
            ComplaintStatus::Acknowledged => "acknowledged",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(ComplaintStatus::Submitted),
            "forwarded" => Some(ComplaintStatus::Forwarded),
            "acknowledged" => Some(ComplaintStatus::Acknowledged),
            "resolved" => Some(ComplaintStatus::Resolved),
            "rejected" => Some(ComplaintStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ComplaintStatus::Resolved | ComplaintStatus::Rejected)
    }

    /// Statuses reachable in one step. Intermediate statuses cannot be skipped.
    pub fn successors(&self) -> &'static [ComplaintStatus] {
        match self {
            ComplaintStatus::Submitted => &[ComplaintStatus::Forwarded, ComplaintStatus::Rejected],
            ComplaintStatus::Forwarded => {
                &[ComplaintStatus::Acknowledged, ComplaintStatus::Rejected]
            }
            ComplaintStatus::Acknowledged => {
                &[ComplaintStatus::Resolved, ComplaintStatus::Rejected]
            }
            ComplaintStatus::Resolved | ComplaintStatus::Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, next: ComplaintStatus) -> bool {
        self.successors().contains(&next)
    }

    /// True when `statuses` starts at the initial state and every step is a legal edge.
    pub fn is_valid_walk(statuses: &[ComplaintStatus]) -> bool {
        match statuses.first() {
            Some(first) if *first == Self::INITIAL => statuses
                .windows(2)
                .all(|pair| pair[0].can_transition_to(pair[1])),
            _ => false,
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "complaints")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: i32,
    pub subcategory_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[sea_orm(column_type = "String(StringLen::N(300))", nullable)]
    pub address: Option<String>,
    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub department: String,
    pub status: ComplaintStatus,
    pub points_awarded: i32,
    pub verified: bool,
    pub flagged_duplicate: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::status_history::Entity")]
    StatusHistory,
}

impl Related<super::status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
