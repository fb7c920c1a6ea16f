pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_airports;
mod m20250301_000002_create_ticket_classes;
mod m20250301_000003_create_planes;
mod m20250301_000004_create_flights;
mod m20250301_000005_create_tickets;
mod m20250301_000006_create_parameters;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_airports::Migration),
            Box::new(m20250301_000002_create_ticket_classes::Migration),
            Box::new(m20250301_000003_create_planes::Migration),
            Box::new(m20250301_000004_create_flights::Migration),
            Box::new(m20250301_000005_create_tickets::Migration),
            Box::new(m20250301_000006_create_parameters::Migration),
        ]
    }
}
