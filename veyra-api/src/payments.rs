use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use veyra_booking::ProcessPayment;
use veyra_core::booking::{Payment, PaymentRecord};

use crate::error::AppError;
use crate::middleware::auth::{
    admin_auth_middleware, passenger_auth_middleware, Admin, Passenger,
};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let passenger = Router::new()
        .route("/v1/payments", post(process_payment).get(list_payments))
        .route("/v1/payments/{id}", get(get_payment))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            passenger_auth_middleware,
        ));

    let admin = Router::new()
        .route("/v1/payments/{id}/refund", post(refund_payment))
        .layer(axum::middleware::from_fn_with_state(
            state,
            admin_auth_middleware,
        ));

    passenger.merge(admin)
}

/// POST /v1/payments
/// Finalize a hold into a booking + payment, idempotent per key.
async fn process_payment(
    State(state): State<AppState>,
    Extension(Passenger(passenger_id)): Extension<Passenger>,
    Json(req): Json<ProcessPayment>,
) -> Result<Json<PaymentRecord>, AppError> {
    let record = state.payments.process_payment(passenger_id, req).await?;
    Ok(Json(record))
}

/// GET /v1/payments/{id}
async fn get_payment(
    State(state): State<AppState>,
    Extension(Passenger(_passenger_id)): Extension<Passenger>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.payments.payment(payment_id).await?;
    Ok(Json(payment))
}

/// GET /v1/payments
async fn list_payments(
    State(state): State<AppState>,
    Extension(Passenger(passenger_id)): Extension<Passenger>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = state.payments.passenger_payments(passenger_id).await?;
    Ok(Json(payments))
}

/// POST /v1/payments/{id}/refund
async fn refund_payment(
    State(state): State<AppState>,
    Extension(Admin(admin_id)): Extension<Admin>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.payments.refund_payment(payment_id, admin_id).await?;
    Ok(Json(payment))
}
