use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Iterable,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::ticket::{BookingType, TicketStatus};
use crate::entities::{flight, seat, ticket, ticket_class};
use crate::error::{AppError, AppResult, StoreContext};
use crate::services::catalog::{find_flight_by_code, lock_flight_by_code};
use crate::services::parameters::{snapshot, ParametersRx};
use crate::utils::clock::SharedClock;
use crate::utils::time::deadline_passed;

// ============ Requests / views ============

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicketRequest {
    pub flight_code: String,
    pub seat_number: String,
    pub full_name: String,
    pub id_card: String,
    pub phone_number: String,
    pub email: String,
    pub booking_type: BookingType,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub id: Uuid,
    pub flight_code: String,
    pub departure_time: DateTime<Utc>,
    pub seat_number: String,
    pub class_name: String,
    pub full_name: String,
    pub id_card: String,
    pub phone_number: String,
    pub email: String,
    pub price: f64,
    pub booking_type: BookingType,
    pub ticket_status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one expiration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpirySweep {
    pub expired: u64,
    pub failed: u64,
}

// ============ Transition table ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// ACTIVE -> CANCELLED, gated by the cancellation window.
    Cancel,
    /// CANCELLED/EXPIRED -> ACTIVE; the seat must still be free.
    Reactivate,
    Plain,
}

fn plan_transition(from: TicketStatus, to: TicketStatus) -> AppResult<Transition> {
    use crate::entities::ticket::TicketStatus::*;

    match (from, to) {
        (Cancelled, Cancelled) => Err(AppError::BadRequest(
            "ticket is already cancelled".to_string(),
        )),
        (Used, Cancelled) => Err(AppError::BadRequest(
            "cannot cancel a used ticket".to_string(),
        )),
        (a, b) if a == b => Err(AppError::BadRequest(format!(
            "ticket is already {}",
            a.as_str()
        ))),
        (Active, Cancelled) => Ok(Transition::Cancel),
        (Active, Used) | (Active, Expired) | (Cancelled, Refunded) => Ok(Transition::Plain),
        (Cancelled, Active) | (Expired, Active) => Ok(Transition::Reactivate),
        (a, b) => Err(AppError::BadRequest(format!(
            "cannot change ticket status from {} to {}",
            a.as_str(),
            b.as_str()
        ))),
    }
}

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

// ============ Engine ============

#[derive(Clone)]
pub struct BookingEngine {
    db: DatabaseConnection,
    clock: SharedClock,
    rules: ParametersRx,
}

impl BookingEngine {
    pub fn new(db: DatabaseConnection, clock: SharedClock, rules: ParametersRx) -> Self {
        Self { db, clock, rules }
    }

    pub async fn create(&self, request: CreateTicketRequest) -> AppResult<TicketView> {
        require("flight code", &request.flight_code)?;
        require("seat number", &request.seat_number)?;
        require("full name", &request.full_name)?;
        require("id card", &request.id_card)?;

        let rules = snapshot(&self.rules);
        let now = self.clock.now();
        let txn = self.db.begin().await.context("failed to begin transaction")?;

        let flight = lock_flight_by_code(&txn, &request.flight_code, LockType::Share).await?;
        if flight.departure_time <= now {
            return Err(AppError::BadRequest(format!(
                "flight {} has already departed",
                flight.flight_code
            )));
        }

        let (seat, class) = seat::Entity::find()
            .filter(seat::Column::PlaneId.eq(flight.plane_id))
            .filter(seat::Column::SeatNumber.eq(request.seat_number.as_str()))
            .find_also_related(ticket_class::Entity)
            .one(&txn)
            .await
            .context("failed to load seat")?
            .ok_or_else(|| AppError::not_found("seat", &request.seat_number))?;
        let class = class.ok_or_else(|| {
            AppError::internal(format!("seat {} has no ticket class", seat.seat_number))
        })?;

        if request.booking_type == BookingType::PlaceOrder
            && deadline_passed(now, flight.departure_time, rules.latest_ticket_purchase_time)
        {
            return Err(AppError::BadRequest(format!(
                "place orders for {} close {} day(s) before departure",
                flight.flight_code, rules.latest_ticket_purchase_time
            )));
        }

        ensure_seat_free(&txn, &flight, &seat, None).await?;

        let created = ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            flight_id: Set(flight.id),
            seat_id: Set(seat.id),
            full_name: Set(request.full_name.trim().to_string()),
            id_card: Set(request.id_card.trim().to_string()),
            phone_number: Set(request.phone_number),
            email: Set(request.email),
            price: Set(flight.base_price * class.price_multiplier),
            booking_type: Set(request.booking_type),
            ticket_status: Set(TicketStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .or_conflict("failed to insert ticket", || seat_taken(&flight, &seat))?;
        txn.commit().await.context("failed to commit ticket")?;

        tracing::info!(
            ticket_id = %created.id,
            flight_code = %flight.flight_code,
            seat = %seat.seat_number,
            booking_type = ?created.booking_type,
            "Ticket created"
        );
        Ok(view(created, &flight, &seat, &class))
    }

    pub async fn convert_place_order(&self, id: Uuid) -> AppResult<TicketView> {
        let rules = snapshot(&self.rules);
        let now = self.clock.now();
        let txn = self.db.begin().await.context("failed to begin transaction")?;

        let ticket = find_ticket(&txn, id).await?;
        if ticket.booking_type != BookingType::PlaceOrder {
            return Err(AppError::BadRequest(format!(
                "ticket {} is not a place order",
                id
            )));
        }
        let (flight, seat, class) = ticket_context(&txn, &ticket).await?;

        if deadline_passed(now, flight.departure_time, rules.latest_ticket_purchase_time) {
            return Err(AppError::BadRequest(format!(
                "purchase window for {} closed {} day(s) before departure",
                flight.flight_code, rules.latest_ticket_purchase_time
            )));
        }
        match ticket.ticket_status {
            TicketStatus::Active => {}
            TicketStatus::Cancelled | TicketStatus::Expired => {
                ensure_seat_free(&txn, &flight, &seat, Some(ticket.id)).await?;
            }
            other => {
                return Err(AppError::BadRequest(format!(
                    "cannot convert a {} place order",
                    other.as_str()
                )));
            }
        }

        let mut active: ticket::ActiveModel = ticket.into();
        active.booking_type = Set(BookingType::Ticket);
        active.ticket_status = Set(TicketStatus::Active);
        active.updated_at = Set(now);
        let converted = active
            .update(&txn)
            .await
            .or_conflict("failed to convert place order", || seat_taken(&flight, &seat))?;
        txn.commit().await.context("failed to commit conversion")?;

        tracing::info!(ticket_id = %converted.id, "Place order converted to ticket");
        Ok(view(converted, &flight, &seat, &class))
    }

    pub async fn update_status(&self, id: Uuid, target: TicketStatus) -> AppResult<TicketView> {
        let rules = snapshot(&self.rules);
        let now = self.clock.now();
        let txn = self.db.begin().await.context("failed to begin transaction")?;

        let ticket = find_ticket(&txn, id).await?;
        let transition = plan_transition(ticket.ticket_status, target)?;
        let (flight, seat, class) = ticket_context(&txn, &ticket).await?;

        match transition {
            Transition::Cancel => {
                if deadline_passed(now, flight.departure_time, rules.ticket_cancellation_time) {
                    return Err(AppError::BadRequest(format!(
                        "tickets for {} can only be cancelled up to {} day(s) before departure",
                        flight.flight_code, rules.ticket_cancellation_time
                    )));
                }
            }
            Transition::Reactivate => {
                if flight.departure_time <= now {
                    return Err(AppError::BadRequest(format!(
                        "flight {} has already departed",
                        flight.flight_code
                    )));
                }
                if ticket.booking_type == BookingType::PlaceOrder
                    && deadline_passed(now, flight.departure_time, rules.latest_ticket_purchase_time)
                {
                    return Err(AppError::BadRequest(format!(
                        "place orders for {} close {} day(s) before departure",
                        flight.flight_code, rules.latest_ticket_purchase_time
                    )));
                }
                ensure_seat_free(&txn, &flight, &seat, Some(ticket.id)).await?;
            }
            Transition::Plain => {}
        }

        let from = ticket.ticket_status;
        let mut active: ticket::ActiveModel = ticket.into();
        active.ticket_status = Set(target);
        active.updated_at = Set(now);
        let updated = active
            .update(&txn)
            .await
            .or_conflict("failed to update ticket status", || seat_taken(&flight, &seat))?;
        txn.commit().await.context("failed to commit status change")?;

        tracing::info!(
            ticket_id = %updated.id,
            from = from.as_str(),
            to = target.as_str(),
            "Ticket status changed"
        );
        Ok(view(updated, &flight, &seat, &class))
    }

    /// Expires every place order on the flight, whatever its status. Returns the affected count.
    pub async fn cancel_place_orders(&self, flight_code: &str) -> AppResult<u64> {
        let now = self.clock.now();
        let txn = self.db.begin().await.context("failed to begin transaction")?;
        let flight = find_flight_by_code(&txn, flight_code).await?;

        let result = ticket::Entity::update_many()
            .col_expr(ticket::Column::TicketStatus, Expr::value(TicketStatus::Expired))
            .col_expr(ticket::Column::UpdatedAt, Expr::value(now))
            .filter(ticket::Column::FlightId.eq(flight.id))
            .filter(ticket::Column::BookingType.eq(BookingType::PlaceOrder))
            .exec(&txn)
            .await
            .context("failed to expire place orders")?;
        txn.commit().await.context("failed to commit place order cancellation")?;

        tracing::info!(
            flight_code = %flight.flight_code,
            expired = result.rows_affected,
            "Place orders cancelled"
        );
        Ok(result.rows_affected)
    }

    /// Expires ACTIVE place orders whose flight departs within `[now, now + lookahead]`.
    /// Each ticket is updated on its own; one failure does not stop the rest.
    pub async fn expire_due_place_orders(
        &self,
        now: DateTime<Utc>,
        lookahead: Duration,
    ) -> AppResult<ExpirySweep> {
        let due = ticket::Entity::find()
            .join(
                sea_orm::JoinType::InnerJoin,
                ticket::Relation::Flight.def(),
            )
            .filter(ticket::Column::BookingType.eq(BookingType::PlaceOrder))
            .filter(ticket::Column::TicketStatus.eq(TicketStatus::Active))
            .filter(flight::Column::DepartureTime.between(now, now + lookahead))
            .order_by_asc(ticket::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("failed to find due place orders")?;

        let mut sweep = ExpirySweep::default();
        for ticket in due {
            let outcome = ticket::Entity::update_many()
                .col_expr(ticket::Column::TicketStatus, Expr::value(TicketStatus::Expired))
                .col_expr(ticket::Column::UpdatedAt, Expr::value(now))
                .filter(ticket::Column::Id.eq(ticket.id))
                .filter(ticket::Column::BookingType.eq(BookingType::PlaceOrder))
                .filter(ticket::Column::TicketStatus.eq(TicketStatus::Active))
                .exec(&self.db)
                .await;

            match outcome {
                Ok(res) if res.rows_affected > 0 => {
                    sweep.expired += res.rows_affected;
                    tracing::debug!(ticket_id = %ticket.id, "Place order expired");
                }
                Ok(_) => {
                    tracing::debug!(ticket_id = %ticket.id, "Place order changed before expiry, skipped");
                }
                Err(err) => {
                    sweep.failed += 1;
                    tracing::warn!(ticket_id = %ticket.id, error = %err, "Failed to expire place order");
                }
            }
        }

        Ok(sweep)
    }

    /// Administrative hard delete.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = ticket::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .context("failed to delete ticket")?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("ticket", id));
        }
        tracing::info!(ticket_id = %id, "Ticket deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<TicketView> {
        let ticket = find_ticket(&self.db, id).await?;
        let (flight, seat, class) = ticket_context(&self.db, &ticket).await?;
        Ok(view(ticket, &flight, &seat, &class))
    }

    pub async fn list_all(&self) -> AppResult<Vec<TicketView>> {
        let tickets = ticket::Entity::find()
            .order_by_asc(ticket::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("failed to list tickets")?;
        views(&self.db, tickets).await
    }

    pub async fn list_for_flight(&self, flight_code: &str) -> AppResult<Vec<TicketView>> {
        let flight = find_flight_by_code(&self.db, flight_code).await?;
        let tickets = ticket::Entity::find()
            .filter(ticket::Column::FlightId.eq(flight.id))
            .order_by_asc(ticket::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("failed to list flight tickets")?;
        views(&self.db, tickets).await
    }

    pub fn statuses(&self) -> Vec<TicketStatus> {
        TicketStatus::iter().collect()
    }

    pub fn booking_types(&self) -> Vec<BookingType> {
        BookingType::iter().collect()
    }
}

// ============ Helpers ============

async fn find_ticket<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<ticket::Model> {
    ticket::Entity::find_by_id(id)
        .one(db)
        .await
        .context("failed to load ticket")?
        .ok_or_else(|| AppError::not_found("ticket", id))
}

/// Inside a transaction the flight row stays share-locked until commit.
async fn ticket_context<C: ConnectionTrait>(
    db: &C,
    ticket: &ticket::Model,
) -> AppResult<(flight::Model, seat::Model, ticket_class::Model)> {
    let flight = flight::Entity::find_by_id(ticket.flight_id)
        .lock_shared()
        .one(db)
        .await
        .context("failed to load ticket flight")?
        .ok_or_else(|| AppError::internal(format!("ticket {} lost its flight", ticket.id)))?;
    let (seat, class) = seat::Entity::find_by_id(ticket.seat_id)
        .find_also_related(ticket_class::Entity)
        .one(db)
        .await
        .context("failed to load ticket seat")?
        .ok_or_else(|| AppError::internal(format!("ticket {} lost its seat", ticket.id)))?;
    let class = class.ok_or_else(|| {
        AppError::internal(format!("seat {} has no ticket class", seat.seat_number))
    })?;
    Ok((flight, seat, class))
}

/// Fast-path holder check. The partial unique index is the authoritative guard.
async fn ensure_seat_free<C: ConnectionTrait>(
    db: &C,
    flight: &flight::Model,
    seat: &seat::Model,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut holders = ticket::Entity::find()
        .filter(ticket::Column::FlightId.eq(flight.id))
        .filter(ticket::Column::SeatId.eq(seat.id))
        .filter(ticket::Column::TicketStatus.is_in(TicketStatus::SEAT_HOLDING));
    if let Some(id) = except {
        holders = holders.filter(ticket::Column::Id.ne(id));
    }

    let taken = holders
        .count(db)
        .await
        .context("failed to check seat availability")?;
    if taken > 0 {
        return Err(AppError::Conflict(seat_taken(flight, seat)));
    }
    Ok(())
}

fn seat_taken(flight: &flight::Model, seat: &seat::Model) -> String {
    format!(
        "seat {} on flight {} is already booked",
        seat.seat_number, flight.flight_code
    )
}

fn view(
    ticket: ticket::Model,
    flight: &flight::Model,
    seat: &seat::Model,
    class: &ticket_class::Model,
) -> TicketView {
    TicketView {
        id: ticket.id,
        flight_code: flight.flight_code.clone(),
        departure_time: flight.departure_time,
        seat_number: seat.seat_number.clone(),
        class_name: class.class_name.clone(),
        full_name: ticket.full_name,
        id_card: ticket.id_card,
        phone_number: ticket.phone_number,
        email: ticket.email,
        price: ticket.price,
        booking_type: ticket.booking_type,
        ticket_status: ticket.ticket_status,
        created_at: ticket.created_at,
        updated_at: ticket.updated_at,
    }
}

async fn views<C: ConnectionTrait>(db: &C, tickets: Vec<ticket::Model>) -> AppResult<Vec<TicketView>> {
    if tickets.is_empty() {
        return Ok(Vec::new());
    }

    let flight_ids: Vec<i32> = tickets.iter().map(|t| t.flight_id).collect();
    let seat_ids: Vec<i32> = tickets.iter().map(|t| t.seat_id).collect();

    let flights: HashMap<i32, flight::Model> = flight::Entity::find()
        .filter(flight::Column::Id.is_in(flight_ids))
        .all(db)
        .await
        .context("failed to load ticket flights")?
        .into_iter()
        .map(|f| (f.id, f))
        .collect();
    let seats: HashMap<i32, (seat::Model, ticket_class::Model)> = seat::Entity::find()
        .filter(seat::Column::Id.is_in(seat_ids))
        .find_also_related(ticket_class::Entity)
        .all(db)
        .await
        .context("failed to load ticket seats")?
        .into_iter()
        .filter_map(|(s, c)| c.map(|c| (s.id, (s, c))))
        .collect();

    tickets
        .into_iter()
        .map(|t| -> AppResult<TicketView> {
            let flight = flights
                .get(&t.flight_id)
                .ok_or_else(|| AppError::internal(format!("ticket {} lost its flight", t.id)))?;
            let (seat, class) = seats
                .get(&t.seat_id)
                .ok_or_else(|| AppError::internal(format!("ticket {} lost its seat", t.id)))?;
            Ok(view(t, flight, seat, class))
        })
        .collect()
}
