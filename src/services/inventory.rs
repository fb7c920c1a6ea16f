//! Seat accounting for flights. Read-only; every function works on a plain
//! connection or inside a caller's transaction.

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;

use crate::entities::ticket::TicketStatus;
use crate::entities::{flight, seat, ticket, ticket_class};
use crate::error::{AppError, AppResult, StoreContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatCounts {
    pub total_seats: i64,
    pub booked_seats: i64,
    pub empty_seats: i64,
}

impl SeatCounts {
    /// More bookings than seats means the holder invariant broke somewhere.
    pub fn new(total_seats: i64, booked_seats: i64) -> AppResult<Self> {
        let empty_seats = total_seats - booked_seats;
        if empty_seats < 0 {
            return Err(AppError::internal(format!(
                "seat accounting violated: {} booked of {} seats",
                booked_seats, total_seats
            )));
        }
        Ok(Self {
            total_seats,
            booked_seats,
            empty_seats,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAvailability {
    pub class_name: String,
    pub price_multiplier: f64,
    pub price: f64,
    pub total_seats: i64,
    pub booked_seats: i64,
    pub empty_seats: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatOccupancy {
    pub seat_number: String,
    pub class_name: String,
    pub booked: bool,
    pub passenger_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatMap {
    pub classes: Vec<ClassAvailability>,
    pub seats: Vec<SeatOccupancy>,
}

pub async fn total_seats_for_plane<C: ConnectionTrait>(db: &C, plane_id: i32) -> AppResult<i64> {
    let total = seat::Entity::find()
        .filter(seat::Column::PlaneId.eq(plane_id))
        .count(db)
        .await
        .context("failed to count plane seats")?;
    Ok(total as i64)
}

pub async fn booked_seats_for_flight<C: ConnectionTrait>(db: &C, flight_id: i32) -> AppResult<i64> {
    let booked = ticket::Entity::find()
        .filter(ticket::Column::FlightId.eq(flight_id))
        .filter(ticket::Column::TicketStatus.eq(TicketStatus::Active))
        .count(db)
        .await
        .context("failed to count booked seats")?;
    Ok(booked as i64)
}

pub async fn seat_counts<C: ConnectionTrait>(db: &C, flight: &flight::Model) -> AppResult<SeatCounts> {
    let total = total_seats_for_plane(db, flight.plane_id).await?;
    let booked = booked_seats_for_flight(db, flight.id).await?;
    SeatCounts::new(total, booked)
}

/// Seat counts for many flights in two grouped queries, keyed by flight id.
pub async fn seat_counts_batch<C: ConnectionTrait>(
    db: &C,
    flights: &[flight::Model],
) -> AppResult<HashMap<i32, SeatCounts>> {
    if flights.is_empty() {
        return Ok(HashMap::new());
    }

    let mut plane_ids: Vec<i32> = flights.iter().map(|f| f.plane_id).collect();
    plane_ids.sort_unstable();
    plane_ids.dedup();
    let flight_ids: Vec<i32> = flights.iter().map(|f| f.id).collect();

    let totals: HashMap<i32, i64> = seat::Entity::find()
        .select_only()
        .column(seat::Column::PlaneId)
        .column_as(seat::Column::Id.count(), "total")
        .filter(seat::Column::PlaneId.is_in(plane_ids))
        .group_by(seat::Column::PlaneId)
        .into_tuple::<(i32, i64)>()
        .all(db)
        .await
        .context("failed to count seats per plane")?
        .into_iter()
        .collect();

    let booked: HashMap<i32, i64> = ticket::Entity::find()
        .select_only()
        .column(ticket::Column::FlightId)
        .column_as(ticket::Column::Id.count(), "booked")
        .filter(ticket::Column::FlightId.is_in(flight_ids))
        .filter(ticket::Column::TicketStatus.eq(TicketStatus::Active))
        .group_by(ticket::Column::FlightId)
        .into_tuple::<(i32, i64)>()
        .all(db)
        .await
        .context("failed to count bookings per flight")?
        .into_iter()
        .collect();

    flights
        .iter()
        .map(|f| {
            let total = totals.get(&f.plane_id).copied().unwrap_or(0);
            let taken = booked.get(&f.id).copied().unwrap_or(0);
            SeatCounts::new(total, taken).map(|counts| (f.id, counts))
        })
        .collect()
}

/// Per-class availability plus a seat-by-seat occupancy listing for one flight.
pub async fn seat_map<C: ConnectionTrait>(db: &C, flight: &flight::Model) -> AppResult<SeatMap> {
    let seats = seat::Entity::find()
        .filter(seat::Column::PlaneId.eq(flight.plane_id))
        .find_also_related(ticket_class::Entity)
        .order_by_asc(seat::Column::Id)
        .all(db)
        .await
        .context("failed to load plane seats")?;

    let holders: HashMap<i32, String> = ticket::Entity::find()
        .filter(ticket::Column::FlightId.eq(flight.id))
        .filter(ticket::Column::TicketStatus.eq(TicketStatus::Active))
        .all(db)
        .await
        .context("failed to load flight bookings")?
        .into_iter()
        .map(|t| (t.seat_id, t.full_name))
        .collect();

    let mut classes: Vec<ClassAvailability> = Vec::new();
    let mut class_index: HashMap<i32, usize> = HashMap::new();
    let mut listing = Vec::with_capacity(seats.len());

    for (seat, class) in seats {
        let class = class.ok_or_else(|| {
            AppError::internal(format!("seat {} has no ticket class", seat.seat_number))
        })?;
        let passenger_name = holders.get(&seat.id).cloned();
        let booked = passenger_name.is_some();

        let idx = *class_index.entry(class.id).or_insert_with(|| {
            classes.push(ClassAvailability {
                class_name: class.class_name.clone(),
                price_multiplier: class.price_multiplier,
                price: flight.base_price * class.price_multiplier,
                total_seats: 0,
                booked_seats: 0,
                empty_seats: 0,
            });
            classes.len() - 1
        });
        let entry = &mut classes[idx];
        entry.total_seats += 1;
        if booked {
            entry.booked_seats += 1;
        }

        listing.push(SeatOccupancy {
            seat_number: seat.seat_number,
            class_name: class.class_name,
            booked,
            passenger_name,
        });
    }

    for class in &mut classes {
        class.empty_seats = SeatCounts::new(class.total_seats, class.booked_seats)?.empty_seats;
    }

    Ok(SeatMap {
        classes,
        seats: listing,
    })
}
