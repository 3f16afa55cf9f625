use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use veyra_booking::{CreateHold, HoldReceipt};
use veyra_core::booking::Booking;
use veyra_core::hold::SeatHold;

use crate::error::AppError;
use crate::middleware::auth::{passenger_auth_middleware, Passenger};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/holds", post(create_hold))
        .route("/v1/holds/{id}", get(get_hold).delete(release_hold))
        .route("/v1/holds/{id}/convert", post(convert_hold))
        .layer(axum::middleware::from_fn_with_state(
            state,
            passenger_auth_middleware,
        ))
}

/// POST /v1/holds
/// Take a temporary seat reservation on a session.
async fn create_hold(
    State(state): State<AppState>,
    Extension(Passenger(passenger_id)): Extension<Passenger>,
    Json(req): Json<CreateHold>,
) -> Result<Json<HoldReceipt>, AppError> {
    let receipt = state.holds.create_hold(passenger_id, req).await?;
    Ok(Json(receipt))
}

/// GET /v1/holds/{id}
async fn get_hold(
    State(state): State<AppState>,
    Extension(Passenger(passenger_id)): Extension<Passenger>,
    Path(hold_id): Path<Uuid>,
) -> Result<Json<SeatHold>, AppError> {
    let hold = state
        .holds
        .hold(hold_id)
        .await?
        .filter(|h| h.passenger_id == passenger_id)
        .ok_or_else(|| AppError::NotFoundError("Hold not found or expired".into()))?;

    Ok(Json(hold))
}

/// DELETE /v1/holds/{id}
/// Idempotent release; a hold that is already gone still returns success.
async fn release_hold(
    State(state): State<AppState>,
    Extension(Passenger(_passenger_id)): Extension<Passenger>,
    Path(hold_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.holds.release_hold(hold_id).await?;
    Ok(Json(json!({ "message": "Hold released successfully" })))
}

/// POST /v1/holds/{id}/convert
/// Convert a still-valid hold into a confirmed booking.
async fn convert_hold(
    State(state): State<AppState>,
    Extension(Passenger(passenger_id)): Extension<Passenger>,
    Path(hold_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .holds
        .convert_hold_to_booking(hold_id, passenger_id)
        .await?;
    Ok(Json(booking))
}
