use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Point-affecting actions. Values are fixed and not configurable.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PointAction {
    #[sea_orm(string_value = "valid_report")]
    ValidReport,
    #[sea_orm(string_value = "self_cleaned")]
    SelfCleaned,
    #[sea_orm(string_value = "parking_violation")]
    ParkingViolation,
    #[sea_orm(string_value = "false_report")]
    FalseReport,
    #[sea_orm(string_value = "govt_resolved")]
    GovtResolved,
}

impl PointAction {
    pub fn points(&self) -> i32 {
        match self {
            PointAction::ValidReport => 10,
            PointAction::SelfCleaned => 30,
            PointAction::ParkingViolation => 15,
            PointAction::FalseReport => -20,
            PointAction::GovtResolved => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PointAction::ValidReport => "valid_report",
            PointAction::SelfCleaned => "self_cleaned",
            PointAction::ParkingViolation => "parking_violation",
            PointAction::FalseReport => "false_report",
            PointAction::GovtResolved => "govt_resolved",
        }
    }

    /// Actions an administrator may grant by hand after reviewing a complaint.
    pub fn is_adjudicated(&self) -> bool {
        matches!(
            self,
            PointAction::SelfCleaned | PointAction::ParkingViolation | PointAction::FalseReport
        )
    }
}

impl fmt::Display for PointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "points_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub complaint_id: Option<Uuid>,
    pub action: PointAction,
    pub delta: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id"
    )]
    Profile,
    #[sea_orm(
        belongs_to = "super::complaint::Entity",
        from = "Column::ComplaintId",
        to = "super::complaint::Column::Id"
    )]
    Complaint,
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn point_table_matches_published_values() {
        assert_eq!(PointAction::ValidReport.points(), 10);
        assert_eq!(PointAction::SelfCleaned.points(), 30);
        assert_eq!(PointAction::ParkingViolation.points(), 15);
        assert_eq!(PointAction::FalseReport.points(), -20);
        assert_eq!(PointAction::GovtResolved.points(), 5);
    }

    #[test]
    fn only_penalty_is_negative() {
        let negative: Vec<_> = PointAction::iter().filter(|a| a.points() < 0).collect();
        assert_eq!(negative, vec![PointAction::FalseReport]);
    }

    #[test]
    fn automatic_awards_are_not_adjudicated() {
        assert!(!PointAction::ValidReport.is_adjudicated());
        assert!(!PointAction::GovtResolved.is_adjudicated());
        assert!(PointAction::FalseReport.is_adjudicated());
    }
}
