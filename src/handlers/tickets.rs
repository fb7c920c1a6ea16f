use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::ticket::{BookingType, TicketStatus};
use crate::error::AppResult;
use crate::services::booking::{CreateTicketRequest, TicketView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub ticket_status: TicketStatus,
}

pub async fn list_tickets(State(state): State<AppState>) -> AppResult<Json<Vec<TicketView>>> {
    Ok(Json(state.booking.list_all().await?))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TicketView>> {
    Ok(Json(state.booking.get(id).await?))
}

/// Book a seat, either as a confirmed ticket or a place order
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(payload): Json<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<TicketView>)> {
    let ticket = state.booking.create(payload).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn convert_place_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TicketView>> {
    Ok(Json(state.booking.convert_place_order(id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<TicketView>> {
    Ok(Json(state.booking.update_status(id, payload.ticket_status).await?))
}

/// Administrative hard delete
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.booking.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_statuses(State(state): State<AppState>) -> Json<Vec<TicketStatus>> {
    Json(state.booking.statuses())
}

pub async fn list_booking_types(State(state): State<AppState>) -> Json<Vec<BookingType>> {
    Json(state.booking.booking_types())
}
