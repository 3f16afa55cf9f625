use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use veyra_booking::StartSession;
use veyra_core::session::Session;

use crate::error::AppError;
use crate::middleware::auth::{driver_auth_middleware, Driver};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let driver = Router::new()
        .route("/v1/sessions/start", post(start_session))
        .route("/v1/sessions/{id}/close", post(close_session))
        .route("/v1/sessions/{id}/cancel", post(cancel_session))
        .layer(axum::middleware::from_fn_with_state(
            state,
            driver_auth_middleware,
        ));

    // Discovery endpoints are public: passengers browse before they hold.
    let public = Router::new()
        .route("/v1/sessions", get(list_sessions))
        .route("/v1/sessions/{id}", get(get_session));

    driver.merge(public)
}

/// POST /v1/sessions/start
async fn start_session(
    State(state): State<AppState>,
    Extension(Driver(driver_id)): Extension<Driver>,
    Json(req): Json<StartSession>,
) -> Result<Json<Session>, AppError> {
    let session = state.sessions.start_session(driver_id, req).await?;
    Ok(Json(session))
}

/// POST /v1/sessions/{id}/close
async fn close_session(
    State(state): State<AppState>,
    Extension(Driver(driver_id)): Extension<Driver>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let session = state.sessions.close_session(session_id, driver_id).await?;
    Ok(Json(session))
}

/// POST /v1/sessions/{id}/cancel
async fn cancel_session(
    State(state): State<AppState>,
    Extension(Driver(driver_id)): Extension<Driver>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let session = state.sessions.cancel_session(session_id, driver_id).await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
struct SessionFilter {
    route_id: Option<Uuid>,
    station_id: Option<Uuid>,
}

/// GET /v1/sessions?route_id=&station_id=
async fn list_sessions(
    State(state): State<AppState>,
    Query(filter): Query<SessionFilter>,
) -> Result<Json<Vec<Session>>, AppError> {
    let sessions = state
        .sessions
        .active_sessions(filter.route_id, filter.station_id)
        .await?;
    Ok(Json(sessions))
}

/// GET /v1/sessions/{id}
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let session = state.sessions.session(session_id).await?;
    Ok(Json(session))
}
