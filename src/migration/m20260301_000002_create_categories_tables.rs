use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Slug,
    Name,
    Department,
    DisplayOrder,
}

#[derive(DeriveIden)]
enum Subcategories {
    Table,
    Id,
    CategoryId,
    Slug,
    Name,
    DisplayOrder,
}

/// (slug, name, department, subcategories as (slug, name))
const SEED: &[(&str, &str, &str, &[(&str, &str)])] = &[
    (
        "bbmp",
        "BBMP",
        "bbmp",
        &[
            ("garbage", "Garbage"),
            ("water-supply", "Water Supply"),
            ("drainage", "Drainage"),
            ("street-lights", "Street Lights"),
            ("parks", "Parks"),
        ],
    ),
    (
        "traffic",
        "Traffic",
        "traffic",
        &[
            ("illegal-parking", "Illegal Parking"),
            ("signal-issues", "Signal Issues"),
            ("road-markings", "Road Markings"),
            ("speed-violations", "Speed Violations"),
        ],
    ),
    (
        "road-infra",
        "Road & Infrastructure",
        "road_infra",
        &[
            ("potholes", "Potholes"),
            ("footpath-damage", "Footpath Damage"),
            ("construction-debris", "Construction Debris"),
            ("flyover-issues", "Flyover Issues"),
        ],
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Categories::Slug)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Categories::Department)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Categories::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subcategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subcategories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subcategories::CategoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subcategories::Slug).string_len(50).not_null())
                    .col(ColumnDef::new(Subcategories::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Subcategories::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subcategories_category_id")
                            .from(Subcategories::Table, Subcategories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subcategories_category_slug")
                    .table(Subcategories::Table)
                    .col(Subcategories::CategoryId)
                    .col(Subcategories::Slug)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();
        for (order, (slug, name, department, subs)) in SEED.iter().enumerate() {
            db.execute_unprepared(&format!(
                "INSERT INTO categories (slug, name, department, display_order) \
                 VALUES ('{slug}', '{name}', '{department}', {order}) \
                 ON CONFLICT (slug) DO NOTHING"
            ))
            .await?;

            for (sub_order, (sub_slug, sub_name)) in subs.iter().enumerate() {
                db.execute_unprepared(&format!(
                    "INSERT INTO subcategories (category_id, slug, name, display_order) \
                     SELECT id, '{sub_slug}', '{sub_name}', {sub_order} \
                     FROM categories WHERE slug = '{slug}' \
                     ON CONFLICT (category_id, slug) DO NOTHING"
                ))
                .await?;
            }
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subcategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}
