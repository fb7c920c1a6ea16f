use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TicketClass::Table)
                    .if_not_exists()
                    .col(pk_auto(TicketClass::Id))
                    .col(string_len(TicketClass::ClassName, 50).not_null().unique_key())
                    .col(double(TicketClass::PriceMultiplier).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TicketClass::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TicketClass {
    Table,
    Id,
    ClassName,
    PriceMultiplier,
}
