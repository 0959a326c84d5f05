use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ComplaintStatusHistory {
    Table,
    Id,
    ComplaintId,
    PreviousStatus,
    NewStatus,
    ActorId,
    Note,
    Sequence,
    CreatedAt,
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
                    .table(ComplaintStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ComplaintStatusHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ComplaintStatusHistory::ComplaintId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ComplaintStatusHistory::PreviousStatus)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ComplaintStatusHistory::NewStatus)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ComplaintStatusHistory::ActorId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ComplaintStatusHistory::Note).text().null())
                    .col(
                        ColumnDef::new(ComplaintStatusHistory::Sequence)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ComplaintStatusHistory::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_status_history_complaint_id")
                            .from(
                                ComplaintStatusHistory::Table,
                                ComplaintStatusHistory::ComplaintId,
                            )
                            .to(Complaints::Table, Complaints::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_status_history_complaint_sequence")
                    .table(ComplaintStatusHistory::Table)
                    .col(ComplaintStatusHistory::ComplaintId)
                    .col(ComplaintStatusHistory::Sequence)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ComplaintStatusHistory::Table).to_owned())
            .await
    }
}
