use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum PointsLedger {
    Table,
    Id,
    UserId,
    ComplaintId,
    Action,
    Delta,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Complaints {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PointsLedger::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PointsLedger::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PointsLedger::UserId).uuid().not_null())
                    .col(ColumnDef::new(PointsLedger::ComplaintId).uuid().null())
                    .col(ColumnDef::new(PointsLedger::Action).string_len(32).not_null())
                    .col(ColumnDef::new(PointsLedger::Delta).integer().not_null())
                    .col(
                        ColumnDef::new(PointsLedger::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_points_ledger_user_id")
                            .from(PointsLedger::Table, PointsLedger::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_points_ledger_complaint_id")
                            .from(PointsLedger::Table, PointsLedger::ComplaintId)
                            .to(Complaints::Table, Complaints::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_points_ledger_user_created_at")
                    .table(PointsLedger::Table)
                    .col(PointsLedger::UserId)
                    .col(PointsLedger::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Partial unique index: sea-query's index builder cannot express the predicate.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_points_ledger_award_once \
                 ON points_ledger (user_id, complaint_id, action) \
                 WHERE complaint_id IS NOT NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PointsLedger::Table).to_owned())
            .await
    }
}
