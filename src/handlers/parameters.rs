use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::parameters::{Parameters, UpdateParametersRequest};
use crate::AppState;

pub async fn get_parameters(State(state): State<AppState>) -> Json<Parameters> {
    Json(state.parameters.current().as_ref().clone())
}

/// Update business rules; takes effect for every operation started afterwards
pub async fn update_parameters(
    State(state): State<AppState>,
    Json(payload): Json<UpdateParametersRequest>,
) -> AppResult<Json<Parameters>> {
    Ok(Json(state.parameters.update(payload).await?))
}
