use axum::{
    extract::{Path, State},
    Json,
};

use crate::entities::{airport, ticket_class};
use crate::error::AppResult;
use crate::services::reference::{PlaneDetail, PlaneSummary};
use crate::AppState;

pub async fn list_airports(State(state): State<AppState>) -> AppResult<Json<Vec<airport::Model>>> {
    Ok(Json(state.reference.airports().await?))
}

pub async fn get_airport(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<airport::Model>> {
    Ok(Json(state.reference.airport(&code).await?))
}

pub async fn list_planes(State(state): State<AppState>) -> AppResult<Json<Vec<PlaneSummary>>> {
    Ok(Json(state.reference.planes().await?))
}

/// Plane with its seat layout
pub async fn get_plane(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<PlaneDetail>> {
    Ok(Json(state.reference.plane(&code).await?))
}

pub async fn list_ticket_classes(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ticket_class::Model>>> {
    Ok(Json(state.reference.ticket_classes().await?))
}
