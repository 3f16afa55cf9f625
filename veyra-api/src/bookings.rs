use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use veyra_core::booking::{Booking, BookingStatus};

use crate::error::AppError;
use crate::middleware::auth::{passenger_auth_middleware, Passenger};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(booking_history))
        .route("/v1/bookings/{id}", get(get_booking).delete(cancel_booking))
        .layer(axum::middleware::from_fn_with_state(
            state,
            passenger_auth_middleware,
        ))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    status: Option<BookingStatus>,
}

/// GET /v1/bookings?status=CONFIRMED
async fn booking_history(
    State(state): State<AppState>,
    Extension(Passenger(passenger_id)): Extension<Passenger>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state
        .holds
        .passenger_bookings(passenger_id, query.status)
        .await?;
    Ok(Json(bookings))
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Extension(Passenger(_passenger_id)): Extension<Passenger>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.holds.booking(booking_id).await?;
    Ok(Json(booking))
}

/// DELETE /v1/bookings/{id}
/// Cancelling a confirmed booking returns its seats to the session.
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(Passenger(passenger_id)): Extension<Passenger>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.holds.cancel_booking(booking_id, passenger_id).await?;
    Ok(Json(booking))
}
