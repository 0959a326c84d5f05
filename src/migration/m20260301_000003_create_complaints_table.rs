use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Complaints {
    Table,
    Id,
    UserId,
    CategoryId,
    SubcategoryId,
    Description,
    Latitude,
    Longitude,
    Address,
    Department,
    Status,
    PointsAwarded,
    Verified,
    FlaggedDuplicate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Subcategories {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Complaints::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Complaints::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Complaints::UserId).uuid().not_null())
                    .col(ColumnDef::new(Complaints::CategoryId).integer().not_null())
                    .col(ColumnDef::new(Complaints::SubcategoryId).integer().null())
                    .col(ColumnDef::new(Complaints::Description).text().not_null())
                    .col(ColumnDef::new(Complaints::Latitude).double().not_null())
                    .col(ColumnDef::new(Complaints::Longitude).double().not_null())
                    .col(ColumnDef::new(Complaints::Address).string_len(300).null())
                    .col(
                        ColumnDef::new(Complaints::Department)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Complaints::Status)
                            .string_len(20)
                            .not_null()
                            .default("submitted"),
                    )
                    .col(
                        ColumnDef::new(Complaints::PointsAwarded)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Complaints::Verified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Complaints::FlaggedDuplicate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Complaints::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Complaints::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::cust(
                        "status IN ('submitted', 'forwarded', 'acknowledged', 'resolved', 'rejected')",
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_complaints_user_id")
                            .from(Complaints::Table, Complaints::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_complaints_category_id")
                            .from(Complaints::Table, Complaints::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_complaints_subcategory_id")
                            .from(Complaints::Table, Complaints::SubcategoryId)
                            .to(Subcategories::Table, Subcategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Duplicate lookups: same category, recent first.
        manager
            .create_index(
                Index::create()
                    .name("idx_complaints_category_created_at")
                    .table(Complaints::Table)
                    .col(Complaints::CategoryId)
                    .col(Complaints::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_complaints_user_created_at")
                    .table(Complaints::Table)
                    .col(Complaints::UserId)
                    .col(Complaints::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_complaints_status")
                    .table(Complaints::Table)
                    .col(Complaints::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Complaints::Table).to_owned())
            .await
    }
}
