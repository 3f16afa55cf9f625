use axum::{extract::State, routing::post, Extension, Json, Router};
use serde_json::json;

use crate::error::AppError;
use crate::middleware::auth::{admin_auth_middleware, Admin};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/holds/cleanup", post(cleanup_expired_holds))
        .layer(axum::middleware::from_fn_with_state(
            state,
            admin_auth_middleware,
        ))
}

/// POST /v1/admin/holds/cleanup
/// Manual expiry sweep; the background reaper runs the same reclaim.
async fn cleanup_expired_holds(
    State(state): State<AppState>,
    Extension(Admin(_admin_id)): Extension<Admin>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cleaned = state.reaper.reclaim_expired().await?;
    Ok(Json(json!({ "cleaned": cleaned })))
}
