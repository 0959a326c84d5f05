use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum UserDailyQuotas {
    Table,
    UserId,
    QuotaDate,
    ReportCount,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserDailyQuotas::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserDailyQuotas::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserDailyQuotas::QuotaDate).date().not_null())
                    .col(
                        ColumnDef::new(UserDailyQuotas::ReportCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserDailyQuotas::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserDailyQuotas::UserId)
                            .col(UserDailyQuotas::QuotaDate),
                    )
                    .check(Expr::col(UserDailyQuotas::ReportCount).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_daily_quotas_user_id")
                            .from(UserDailyQuotas::Table, UserDailyQuotas::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserDailyQuotas::Table).to_owned())
            .await
    }
}
