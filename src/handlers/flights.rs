use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::error::AppResult;
use crate::services::booking::TicketView;
use crate::services::catalog::{FlightDetail, FlightRequest, FlightSummary};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PlaceOrdersCancelled {
    pub flight_code: String,
    pub expired: u64,
}

/// List all flights
pub async fn list_flights(State(state): State<AppState>) -> AppResult<Json<Vec<FlightSummary>>> {
    Ok(Json(state.catalog.list().await?))
}

/// Flight details with seat breakdown
pub async fn get_flight(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<FlightDetail>> {
    Ok(Json(state.catalog.get_by_code(&code).await?))
}

pub async fn create_flight(
    State(state): State<AppState>,
    Json(payload): Json<FlightRequest>,
) -> AppResult<(StatusCode, Json<FlightDetail>)> {
    let flight = state.catalog.create(payload).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

pub async fn update_flight(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<FlightRequest>,
) -> AppResult<Json<FlightDetail>> {
    Ok(Json(state.catalog.update(&code, payload).await?))
}

pub async fn delete_flight(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<StatusCode> {
    state.catalog.delete(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tickets booked on a flight
pub async fn flight_tickets(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Vec<TicketView>>> {
    Ok(Json(state.booking.list_for_flight(&code).await?))
}

/// Expire every place order on a flight (e.g. the flight was cancelled)
pub async fn cancel_place_orders(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<PlaceOrdersCancelled>> {
    let expired = state.booking.cancel_place_orders(&code).await?;
    Ok(Json(PlaceOrdersCancelled {
        flight_code: code,
        expired,
    }))
}
