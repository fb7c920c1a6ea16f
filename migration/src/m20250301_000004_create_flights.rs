use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_airports::Airport;
use super::m20250301_000003_create_planes::Plane;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Flight::Table)
                    .if_not_exists()
                    .col(pk_auto(Flight::Id))
                    .col(string_len(Flight::FlightCode, 32).not_null().unique_key())
                    .col(integer(Flight::PlaneId).not_null())
                    .col(integer(Flight::DepartureAirportId).not_null())
                    .col(integer(Flight::ArrivalAirportId).not_null())
                    .col(timestamp_with_time_zone(Flight::DepartureTime).not_null())
                    .col(integer(Flight::Duration).not_null())
                    .col(double(Flight::BasePrice).not_null())
                    .col(
                        timestamp_with_time_zone(Flight::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flight_plane")
                            .from(Flight::Table, Flight::PlaneId)
                            .to(Plane::Table, Plane::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flight_departure_airport")
                            .from(Flight::Table, Flight::DepartureAirportId)
                            .to(Airport::Table, Airport::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flight_arrival_airport")
                            .from(Flight::Table, Flight::ArrivalAirportId)
                            .to(Airport::Table, Airport::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_flight_departure_time")
                    .table(Flight::Table)
                    .col(Flight::DepartureTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IntermediateStop::Table)
                    .if_not_exists()
                    .col(pk_auto(IntermediateStop::Id))
                    .col(integer(IntermediateStop::FlightId).not_null())
                    .col(integer(IntermediateStop::AirportId).not_null())
                    .col(integer(IntermediateStop::StopOrder).not_null())
                    .col(integer(IntermediateStop::StopDuration).not_null())
                    .col(string_len_null(IntermediateStop::Note, 255))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_intermediate_stop_flight")
                            .from(IntermediateStop::Table, IntermediateStop::FlightId)
                            .to(Flight::Table, Flight::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_intermediate_stop_airport")
                            .from(IntermediateStop::Table, IntermediateStop::AirportId)
                            .to(Airport::Table, Airport::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // One visit per airport and one airport per position on an itinerary.
        manager
            .create_index(
                Index::create()
                    .name("ux_intermediate_stop_airport")
                    .table(IntermediateStop::Table)
                    .col(IntermediateStop::FlightId)
                    .col(IntermediateStop::AirportId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_intermediate_stop_order")
                    .table(IntermediateStop::Table)
                    .col(IntermediateStop::FlightId)
                    .col(IntermediateStop::StopOrder)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IntermediateStop::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Flight::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Flight {
    Table,
    Id,
    FlightCode,
    PlaneId,
    DepartureAirportId,
    ArrivalAirportId,
    DepartureTime,
    Duration,
    BasePrice,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum IntermediateStop {
    Table,
    Id,
    FlightId,
    AirportId,
    StopOrder,
    StopDuration,
    Note,
}
