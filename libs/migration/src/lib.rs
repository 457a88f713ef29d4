pub use sea_orm_migration::prelude::*;

mod m20260301_000000_bootstrap;
mod m20260301_000001_create_roles;
mod m20260301_000002_create_users;
mod m20260301_000003_create_catalog;
mod m20260301_000004_create_orders;
mod m20260301_000005_create_reviews;
mod m20260301_000006_create_media_objects;
mod m20260301_000007_seed_access_control;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000000_bootstrap::Migration),
            Box::new(m20260301_000001_create_roles::Migration),
            Box::new(m20260301_000002_create_users::Migration),
            Box::new(m20260301_000003_create_catalog::Migration),
            Box::new(m20260301_000004_create_orders::Migration),
            Box::new(m20260301_000005_create_reviews::Migration),
            Box::new(m20260301_000006_create_media_objects::Migration),
            Box::new(m20260301_000007_seed_access_control::Migration),
        ]
    }
}
