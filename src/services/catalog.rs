use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::entities::ticket::TicketStatus;
use crate::entities::{airport, flight, intermediate_stop, plane, ticket};
use crate::error::{AppError, AppResult, StoreContext};
use crate::services::inventory::{self, SeatCounts, SeatMap};
use crate::services::parameters::{snapshot, Parameters, ParametersRx};
use crate::utils::clock::SharedClock;
use crate::utils::time::parse_departure;

pub const FLIGHT_CODE_PREFIX: &str = "RuaAirline";

pub fn format_flight_code(id: i32) -> String {
    format!("{}{:04}", FLIGHT_CODE_PREFIX, id)
}

// ============ Requests ============

#[derive(Debug, Clone, Deserialize)]
pub struct StopRequest {
    pub airport_code: String,
    pub stop_order: i32,
    /// Minutes on the ground.
    pub stop_duration: i32,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightRequest {
    pub plane_code: String,
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    /// `YYYY-MM-DD HH:MM:SS` in the service timezone, or RFC 3339.
    pub departure_time: String,
    pub duration: i32,
    pub base_price: f64,
    #[serde(default)]
    pub intermediate_stops: Vec<StopRequest>,
}

// ============ Views ============

#[derive(Debug, Clone, Serialize)]
pub struct AirportRef {
    pub airport_code: String,
    pub airport_name: String,
    pub city_name: String,
}

impl From<airport::Model> for AirportRef {
    fn from(a: airport::Model) -> Self {
        Self {
            airport_code: a.airport_code,
            airport_name: a.airport_name,
            city_name: a.city_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StopView {
    pub airport_code: String,
    pub airport_name: String,
    pub stop_order: i32,
    pub stop_duration: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightDetail {
    pub flight_code: String,
    pub plane_code: String,
    pub plane_name: String,
    pub departure_airport: AirportRef,
    pub arrival_airport: AirportRef,
    pub departure_time: DateTime<Utc>,
    pub duration: i32,
    pub base_price: f64,
    pub intermediate_stops: Vec<StopView>,
    #[serde(flatten)]
    pub seats: SeatCounts,
    pub seat_map: SeatMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub flight_code: String,
    pub plane_code: String,
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    pub departure_time: DateTime<Utc>,
    pub duration: i32,
    pub base_price: f64,
    pub stop_count: i64,
    #[serde(flatten)]
    pub seats: SeatCounts,
}

// ============ Validation ============

/// Checks every itinerary rule that needs no store access, in a fixed order.
pub fn validate_itinerary(request: &FlightRequest, rules: &Parameters) -> AppResult<()> {
    let required = [
        ("plane code", &request.plane_code),
        ("departure airport code", &request.departure_airport_code),
        ("arrival airport code", &request.arrival_airport_code),
    ];
    if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(AppError::BadRequest(format!("{} is required", name)));
    }
    if !request.base_price.is_finite() || request.base_price < 0.0 {
        return Err(AppError::BadRequest(
            "base price must be a non-negative number".to_string(),
        ));
    }

    if request.departure_airport_code == request.arrival_airport_code {
        return Err(AppError::BadRequest(
            "departure and arrival airports must be different".to_string(),
        ));
    }

    if request.duration < rules.min_flight_duration {
        return Err(AppError::BadRequest(format!(
            "flight duration must be at least {} minutes",
            rules.min_flight_duration
        )));
    }

    let stops = &request.intermediate_stops;
    if stops.len() as i64 > i64::from(rules.max_intermediate_stops) {
        return Err(AppError::BadRequest(format!(
            "a flight may have at most {} intermediate stops",
            rules.max_intermediate_stops
        )));
    }

    let mut seen_airports = HashSet::new();
    for stop in stops {
        if stop.airport_code.trim().is_empty() {
            return Err(AppError::BadRequest(
                "intermediate stop airport code is required".to_string(),
            ));
        }
        if stop.airport_code == request.departure_airport_code
            || stop.airport_code == request.arrival_airport_code
        {
            return Err(AppError::BadRequest(format!(
                "intermediate stop {} must differ from the departure and arrival airports",
                stop.airport_code
            )));
        }
        if !seen_airports.insert(stop.airport_code.as_str()) {
            return Err(AppError::BadRequest(format!(
                "airport {} appears more than once among intermediate stops",
                stop.airport_code
            )));
        }
    }

    for stop in stops {
        let range = rules.min_intermediate_stop_duration..=rules.max_intermediate_stop_duration;
        if !range.contains(&stop.stop_duration) {
            return Err(AppError::BadRequest(format!(
                "stop duration at {} must be between {} and {} minutes",
                stop.airport_code,
                rules.min_intermediate_stop_duration,
                rules.max_intermediate_stop_duration
            )));
        }
    }

    let mut seen_orders = HashSet::new();
    for stop in stops {
        if stop.stop_order <= 0 {
            return Err(AppError::BadRequest(format!(
                "stop order must be positive, got {}",
                stop.stop_order
            )));
        }
        if !seen_orders.insert(stop.stop_order) {
            return Err(AppError::BadRequest(format!(
                "stop order {} is used more than once",
                stop.stop_order
            )));
        }
    }

    Ok(())
}

// ============ Code generation ============

/// Serializes "read max id, use id + 1". Hold the lease for the whole create transaction.
#[derive(Clone, Default)]
pub struct FlightCodeGenerator {
    lock: Arc<Mutex<()>>,
}

pub struct CodeLease<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

impl FlightCodeGenerator {
    pub async fn acquire(&self) -> CodeLease<'_> {
        CodeLease(self.lock.lock().await)
    }

    pub async fn next<C: ConnectionTrait>(
        &self,
        _lease: &CodeLease<'_>,
        txn: &C,
    ) -> AppResult<(i32, String)> {
        let max_id = flight::Entity::find()
            .select_only()
            .column_as(flight::Column::Id.max(), "max_id")
            .into_tuple::<Option<i32>>()
            .one(txn)
            .await
            .context("failed to read the latest flight id")?
            .flatten()
            .unwrap_or(0);

        let id = max_id + 1;
        Ok((id, format_flight_code(id)))
    }
}

// ============ Catalog ============

struct ResolvedStop {
    airport_id: i32,
    stop_order: i32,
    stop_duration: i32,
    note: Option<String>,
}

struct ResolvedFlight {
    plane: plane::Model,
    departure_airport_id: i32,
    arrival_airport_id: i32,
    departure_time: DateTime<Utc>,
    stops: Vec<ResolvedStop>,
}

#[derive(Clone)]
pub struct FlightCatalog {
    db: DatabaseConnection,
    clock: SharedClock,
    rules: ParametersRx,
    tz: Tz,
    codes: FlightCodeGenerator,
}

impl FlightCatalog {
    pub fn new(db: DatabaseConnection, clock: SharedClock, rules: ParametersRx, tz: Tz) -> Self {
        Self {
            db,
            clock,
            rules,
            tz,
            codes: FlightCodeGenerator::default(),
        }
    }

    pub async fn create(&self, request: FlightRequest) -> AppResult<FlightDetail> {
        let rules = snapshot(&self.rules);
        validate_itinerary(&request, &rules)?;
        let resolved = self.resolve(&request).await?;

        let lease = self.codes.acquire().await;
        let txn = self.db.begin().await.context("failed to begin transaction")?;
        let (id, code) = self.codes.next(&lease, &txn).await?;

        let created = flight::ActiveModel {
            id: Set(id),
            flight_code: Set(code.clone()),
            plane_id: Set(resolved.plane.id),
            departure_airport_id: Set(resolved.departure_airport_id),
            arrival_airport_id: Set(resolved.arrival_airport_id),
            departure_time: Set(resolved.departure_time),
            duration: Set(request.duration),
            base_price: Set(request.base_price),
            created_at: Set(self.clock.now()),
        }
        .insert(&txn)
        .await
        .or_conflict("failed to insert flight", || {
            format!("flight code {} is already taken", code)
        })?;

        insert_stops(&txn, created.id, resolved.stops).await?;
        txn.commit().await.context("failed to commit flight")?;
        drop(lease);

        tracing::info!(flight_code = %created.flight_code, "Flight created");
        self.detail(&created).await
    }

    pub async fn update(&self, code: &str, request: FlightRequest) -> AppResult<FlightDetail> {
        let rules = snapshot(&self.rules);
        validate_itinerary(&request, &rules)?;
        let resolved = self.resolve(&request).await?;

        let txn = self.db.begin().await.context("failed to begin transaction")?;
        let existing = lock_flight_by_code(&txn, code, LockType::Update).await?;

        if resolved.plane.id != existing.plane_id {
            let holders = ticket::Entity::find()
                .filter(ticket::Column::FlightId.eq(existing.id))
                .filter(ticket::Column::TicketStatus.is_in(TicketStatus::SEAT_HOLDING))
                .count(&txn)
                .await
                .context("failed to count flight tickets")?;
            if holders > 0 {
                return Err(AppError::BadRequest(format!(
                    "flight {} already has booked seats and cannot change plane",
                    existing.flight_code
                )));
            }
        }

        let mut active: flight::ActiveModel = existing.into();
        active.plane_id = Set(resolved.plane.id);
        active.departure_airport_id = Set(resolved.departure_airport_id);
        active.arrival_airport_id = Set(resolved.arrival_airport_id);
        active.departure_time = Set(resolved.departure_time);
        active.duration = Set(request.duration);
        active.base_price = Set(request.base_price);
        let updated = active
            .update(&txn)
            .await
            .context("failed to update flight")?;

        intermediate_stop::Entity::delete_many()
            .filter(intermediate_stop::Column::FlightId.eq(updated.id))
            .exec(&txn)
            .await
            .context("failed to clear intermediate stops")?;
        insert_stops(&txn, updated.id, resolved.stops).await?;
        txn.commit().await.context("failed to commit flight update")?;

        tracing::info!(flight_code = %updated.flight_code, "Flight updated");
        self.detail(&updated).await
    }

    /// Holds the flight row exclusively; bookings share-lock the same row.
    pub async fn delete(&self, code: &str) -> AppResult<()> {
        let txn = self.db.begin().await.context("failed to begin transaction")?;
        let existing = lock_flight_by_code(&txn, code, LockType::Update).await?;

        let active = ticket::Entity::find()
            .filter(ticket::Column::FlightId.eq(existing.id))
            .filter(ticket::Column::TicketStatus.eq(TicketStatus::Active))
            .count(&txn)
            .await
            .context("failed to count active tickets")?;
        if active > 0 {
            return Err(AppError::BadRequest(format!(
                "flight {} has {} active tickets and cannot be deleted",
                existing.flight_code, active
            )));
        }

        intermediate_stop::Entity::delete_many()
            .filter(intermediate_stop::Column::FlightId.eq(existing.id))
            .exec(&txn)
            .await
            .context("failed to delete intermediate stops")?;
        ticket::Entity::delete_many()
            .filter(ticket::Column::FlightId.eq(existing.id))
            .exec(&txn)
            .await
            .context("failed to delete historical tickets")?;
        flight::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await
            .context("failed to delete flight")?;
        txn.commit().await.context("failed to commit flight deletion")?;

        tracing::info!(flight_code = %existing.flight_code, "Flight deleted");
        Ok(())
    }

    pub async fn get_by_code(&self, code: &str) -> AppResult<FlightDetail> {
        let flight = self.find_by_code(code).await?;
        self.detail(&flight).await
    }

    /// Catalog browsing view ordered by departure; seat counts come from two grouped queries.
    pub async fn list(&self) -> AppResult<Vec<FlightSummary>> {
        let flights = flight::Entity::find()
            .order_by_asc(flight::Column::DepartureTime)
            .order_by_asc(flight::Column::Id)
            .all(&self.db)
            .await
            .context("failed to list flights")?;
        if flights.is_empty() {
            return Ok(Vec::new());
        }

        let counts = inventory::seat_counts_batch(&self.db, &flights).await?;
        let flight_ids: Vec<i32> = flights.iter().map(|f| f.id).collect();

        let stop_counts: HashMap<i32, i64> = intermediate_stop::Entity::find()
            .select_only()
            .column(intermediate_stop::Column::FlightId)
            .column_as(intermediate_stop::Column::Id.count(), "stops")
            .filter(intermediate_stop::Column::FlightId.is_in(flight_ids))
            .group_by(intermediate_stop::Column::FlightId)
            .into_tuple::<(i32, i64)>()
            .all(&self.db)
            .await
            .context("failed to count intermediate stops")?
            .into_iter()
            .collect();

        let airports: HashMap<i32, String> = airport::Entity::find()
            .all(&self.db)
            .await
            .context("failed to load airports")?
            .into_iter()
            .map(|a| (a.id, a.airport_code))
            .collect();
        let planes: HashMap<i32, String> = plane::Entity::find()
            .all(&self.db)
            .await
            .context("failed to load planes")?
            .into_iter()
            .map(|p| (p.id, p.plane_code))
            .collect();

        flights
            .into_iter()
            .map(|f| -> AppResult<FlightSummary> {
                let seats = counts.get(&f.id).copied().ok_or_else(|| {
                    AppError::internal(format!("missing seat counts for {}", f.flight_code))
                })?;
                Ok(FlightSummary {
                    plane_code: lookup(&planes, f.plane_id, "plane")?,
                    departure_airport_code: lookup(&airports, f.departure_airport_id, "airport")?,
                    arrival_airport_code: lookup(&airports, f.arrival_airport_id, "airport")?,
                    stop_count: stop_counts.get(&f.id).copied().unwrap_or(0),
                    flight_code: f.flight_code,
                    departure_time: f.departure_time,
                    duration: f.duration,
                    base_price: f.base_price,
                    seats,
                })
            })
            .collect()
    }

    async fn find_by_code(&self, code: &str) -> AppResult<flight::Model> {
        find_flight_by_code(&self.db, code).await
    }

    async fn resolve(&self, request: &FlightRequest) -> AppResult<ResolvedFlight> {
        let plane = plane::Entity::find()
            .filter(plane::Column::PlaneCode.eq(request.plane_code.as_str()))
            .one(&self.db)
            .await
            .context("failed to load plane")?
            .ok_or_else(|| AppError::not_found("plane", &request.plane_code))?;

        let departure = airport_by_code(&self.db, &request.departure_airport_code).await?;
        let arrival = airport_by_code(&self.db, &request.arrival_airport_code).await?;

        let mut stops = Vec::with_capacity(request.intermediate_stops.len());
        for stop in &request.intermediate_stops {
            let airport = airport_by_code(&self.db, &stop.airport_code).await?;
            stops.push(ResolvedStop {
                airport_id: airport.id,
                stop_order: stop.stop_order,
                stop_duration: stop.stop_duration,
                note: stop.note.clone(),
            });
        }

        let departure_time = parse_departure(&request.departure_time, self.tz)?;
        if departure_time <= self.clock.now() {
            return Err(AppError::BadRequest(format!(
                "departure time {} is not in the future",
                request.departure_time
            )));
        }

        Ok(ResolvedFlight {
            plane,
            departure_airport_id: departure.id,
            arrival_airport_id: arrival.id,
            departure_time,
            stops,
        })
    }

    async fn detail(&self, flight: &flight::Model) -> AppResult<FlightDetail> {
        let plane = plane::Entity::find_by_id(flight.plane_id)
            .one(&self.db)
            .await
            .context("failed to load plane")?
            .ok_or_else(|| AppError::internal(format!("flight {} lost its plane", flight.flight_code)))?;
        let departure = airport_by_id(&self.db, flight.departure_airport_id).await?;
        let arrival = airport_by_id(&self.db, flight.arrival_airport_id).await?;

        let intermediate_stops = intermediate_stop::Entity::find()
            .filter(intermediate_stop::Column::FlightId.eq(flight.id))
            .find_also_related(airport::Entity)
            .order_by_asc(intermediate_stop::Column::StopOrder)
            .all(&self.db)
            .await
            .context("failed to load intermediate stops")?
            .into_iter()
            .map(|(stop, airport)| -> AppResult<StopView> {
                let airport = airport.ok_or_else(|| {
                    AppError::internal(format!("stop {} references a missing airport", stop.id))
                })?;
                Ok(StopView {
                    airport_code: airport.airport_code,
                    airport_name: airport.airport_name,
                    stop_order: stop.stop_order,
                    stop_duration: stop.stop_duration,
                    note: stop.note,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let seats = inventory::seat_counts(&self.db, flight).await?;
        let seat_map = inventory::seat_map(&self.db, flight).await?;

        Ok(FlightDetail {
            flight_code: flight.flight_code.clone(),
            plane_code: plane.plane_code,
            plane_name: plane.plane_name,
            departure_airport: departure.into(),
            arrival_airport: arrival.into(),
            departure_time: flight.departure_time,
            duration: flight.duration,
            base_price: flight.base_price,
            intermediate_stops,
            seats,
            seat_map,
        })
    }
}

pub(crate) async fn find_flight_by_code<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> AppResult<flight::Model> {
    flight_by_code(code)?
        .one(db)
        .await
        .context("failed to load flight")?
        .ok_or_else(|| AppError::not_found("flight", code))
}

/// Like `find_flight_by_code`, holding a row lock until the transaction ends.
pub(crate) async fn lock_flight_by_code<C: ConnectionTrait>(
    db: &C,
    code: &str,
    lock: LockType,
) -> AppResult<flight::Model> {
    flight_by_code(code)?
        .lock(lock)
        .one(db)
        .await
        .context("failed to lock flight")?
        .ok_or_else(|| AppError::not_found("flight", code))
}

fn flight_by_code(code: &str) -> AppResult<Select<flight::Entity>> {
    if code.trim().is_empty() {
        return Err(AppError::BadRequest("flight code is required".to_string()));
    }
    Ok(flight::Entity::find().filter(flight::Column::FlightCode.eq(code)))
}

async fn airport_by_code<C: ConnectionTrait>(db: &C, code: &str) -> AppResult<airport::Model> {
    airport::Entity::find()
        .filter(airport::Column::AirportCode.eq(code))
        .one(db)
        .await
        .context("failed to load airport")?
        .ok_or_else(|| AppError::not_found("airport", code))
}

async fn airport_by_id<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<airport::Model> {
    airport::Entity::find_by_id(id)
        .one(db)
        .await
        .context("failed to load airport")?
        .ok_or_else(|| AppError::internal(format!("airport {} referenced but missing", id)))
}

async fn insert_stops<C: ConnectionTrait>(
    txn: &C,
    flight_id: i32,
    stops: Vec<ResolvedStop>,
) -> AppResult<()> {
    if stops.is_empty() {
        return Ok(());
    }
    let rows = stops.into_iter().map(|s| intermediate_stop::ActiveModel {
        flight_id: Set(flight_id),
        airport_id: Set(s.airport_id),
        stop_order: Set(s.stop_order),
        stop_duration: Set(s.stop_duration),
        note: Set(s.note),
        ..Default::default()
    });
    intermediate_stop::Entity::insert_many(rows)
        .exec(txn)
        .await
        .context("failed to insert intermediate stops")?;
    Ok(())
}

fn lookup(map: &HashMap<i32, String>, id: i32, entity: &str) -> AppResult<String> {
    map.get(&id)
        .cloned()
        .ok_or_else(|| AppError::internal(format!("{} {} referenced but missing", entity, id)))
}
