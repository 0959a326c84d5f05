use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    #[sea_orm(string_value = "citizen")]
    Citizen,
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Government system or department officer acting on complaints.
    #[sea_orm(string_value = "authority")]
    Authority,
    #[sea_orm(string_value = "banned")]
    Banned,
}

impl ProfileRole {
    pub fn can_transition_complaints(&self) -> bool {
        matches!(self, ProfileRole::Admin | ProfileRole::Authority)
    }
}

/// Local projection of an identity-provider account.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Subject id issued by the identity provider.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub display_name: String,
    pub role: ProfileRole,
    /// Cached sum of the user's ledger entries.
    pub points: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
