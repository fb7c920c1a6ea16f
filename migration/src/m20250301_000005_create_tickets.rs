use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000003_create_planes::Seat;
use super::m20250301_000004_create_flights::Flight;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(uuid(Ticket::Id).primary_key())
                    .col(integer(Ticket::FlightId).not_null())
                    .col(integer(Ticket::SeatId).not_null())
                    .col(string_len(Ticket::FullName, 100).not_null())
                    .col(string_len(Ticket::IdCard, 50).not_null())
                    .col(string_len(Ticket::PhoneNumber, 30).not_null())
                    .col(string_len(Ticket::Email, 255).not_null())
                    .col(double(Ticket::Price).not_null())
                    .col(string_len(Ticket::BookingType, 16).not_null())
                    .col(string_len(Ticket::TicketStatus, 16).not_null())
                    .col(timestamp_with_time_zone(Ticket::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Ticket::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_flight")
                            .from(Ticket::Table, Ticket::FlightId)
                            .to(Flight::Table, Flight::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_seat")
                            .from(Ticket::Table, Ticket::SeatId)
                            .to(Seat::Table, Seat::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_ticket_flight_status")
                    .table(Ticket::Table)
                    .col(Ticket::FlightId)
                    .col(Ticket::TicketStatus)
                    .to_owned(),
            )
            .await?;

        // At most one seat holder per (flight, seat). Both Postgres and SQLite
        // accept partial indexes, which sea-query cannot express here.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS ux_ticket_seat_holder \
                 ON ticket (flight_id, seat_id) \
                 WHERE ticket_status IN ('ACTIVE', 'USED')",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ticket::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ticket {
    Table,
    Id,
    FlightId,
    SeatId,
    FullName,
    IdCard,
    PhoneNumber,
    Email,
    Price,
    BookingType,
    TicketStatus,
    CreatedAt,
    UpdatedAt,
}
