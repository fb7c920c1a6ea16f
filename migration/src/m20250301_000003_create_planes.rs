use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000002_create_ticket_classes::TicketClass;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Plane::Table)
                    .if_not_exists()
                    .col(pk_auto(Plane::Id))
                    .col(string_len(Plane::PlaneCode, 20).not_null().unique_key())
                    .col(string_len(Plane::PlaneName, 100).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Seat::Table)
                    .if_not_exists()
                    .col(pk_auto(Seat::Id))
                    .col(integer(Seat::PlaneId).not_null())
                    .col(string_len(Seat::SeatNumber, 10).not_null())
                    .col(integer(Seat::TicketClassId).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_plane")
                            .from(Seat::Table, Seat::PlaneId)
                            .to(Plane::Table, Plane::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_ticket_class")
                            .from(Seat::Table, Seat::TicketClassId)
                            .to(TicketClass::Table, TicketClass::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_seat_plane_number")
                    .table(Seat::Table)
                    .col(Seat::PlaneId)
                    .col(Seat::SeatNumber)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Seat::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Plane::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Plane {
    Table,
    Id,
    PlaneCode,
    PlaneName,
}

#[derive(DeriveIden)]
pub enum Seat {
    Table,
    Id,
    PlaneId,
    SeatNumber,
    TicketClassId,
}
