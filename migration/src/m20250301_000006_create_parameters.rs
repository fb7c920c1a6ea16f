use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Parameter::Table)
                    .if_not_exists()
                    .col(pk_auto(Parameter::Id))
                    // Constant key: the unique constraint keeps this table to a single row.
                    .col(string_len(Parameter::Scope, 16).not_null().unique_key())
                    .col(integer(Parameter::MaxIntermediateStops).not_null())
                    .col(integer(Parameter::MinIntermediateStopDuration).not_null())
                    .col(integer(Parameter::MaxIntermediateStopDuration).not_null())
                    .col(integer(Parameter::MinFlightDuration).not_null())
                    .col(integer(Parameter::LatestTicketPurchaseTime).not_null())
                    .col(integer(Parameter::TicketCancellationTime).not_null())
                    .to_owned(),
            )
            .await?;

        let insert = Query::insert()
            .into_table(Parameter::Table)
            .columns([
                Parameter::Scope,
                Parameter::MaxIntermediateStops,
                Parameter::MinIntermediateStopDuration,
                Parameter::MaxIntermediateStopDuration,
                Parameter::MinFlightDuration,
                Parameter::LatestTicketPurchaseTime,
                Parameter::TicketCancellationTime,
            ])
            .values_panic([
                "global".into(),
                2.into(),
                10.into(),
                20.into(),
                30.into(),
                1.into(),
                1.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Parameter::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Parameter {
    Table,
    Id,
    Scope,
    MaxIntermediateStops,
    MinIntermediateStopDuration,
    MaxIntermediateStopDuration,
    MinFlightDuration,
    LatestTicketPurchaseTime,
    TicketCancellationTime,
}
