use sea_orm_migration::prelude::*;

mod m20260301_000001_create_profiles_table;
mod m20260301_000002_create_categories_tables;
mod m20260301_000003_create_complaints_table;
mod m20260301_000004_create_status_history_table;
mod m20260301_000005_create_points_ledger_table;
mod m20260301_000006_create_daily_quotas_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_profiles_table::Migration),
            Box::new(m20260301_000002_create_categories_tables::Migration),
            Box::new(m20260301_000003_create_complaints_table::Migration),
            Box::new(m20260301_000004_create_status_history_table::Migration),
            Box::new(m20260301_000005_create_points_ledger_table::Migration),
            Box::new(m20260301_000006_create_daily_quotas_table::Migration),
        ]
    }
}
