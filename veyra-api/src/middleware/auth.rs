use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

// Token issuance lives with the identity service; this only consumes tokens.

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Authenticated passenger id, injected into request extensions.
#[derive(Debug, Clone, Copy)]
pub struct Passenger(pub Uuid);

#[derive(Debug, Clone, Copy)]
pub struct Driver(pub Uuid);

#[derive(Debug, Clone, Copy)]
pub struct Admin(pub Uuid);

fn decode_claims(state: &AppState, req: &Request) -> Result<Claims, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(token_data.claims)
}

fn subject_id(claims: &Claims) -> Result<Uuid, StatusCode> {
    Uuid::parse_str(&claims.sub).map_err(|_| StatusCode::UNAUTHORIZED)
}

pub async fn passenger_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decode_claims(&state, &req)?;

    if claims.role != "PASSENGER" {
        return Err(StatusCode::FORBIDDEN);
    }

    let passenger_id = subject_id(&claims)?;
    req.extensions_mut().insert(Passenger(passenger_id));

    Ok(next.run(req).await)
}

pub async fn driver_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decode_claims(&state, &req)?;

    if claims.role != "DRIVER" {
        return Err(StatusCode::FORBIDDEN);
    }

    let driver_id = subject_id(&claims)?;
    req.extensions_mut().insert(Driver(driver_id));

    Ok(next.run(req).await)
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decode_claims(&state, &req)?;

    if claims.role != "ADMIN" {
        return Err(StatusCode::FORBIDDEN);
    }

    let admin_id = subject_id(&claims)?;
    req.extensions_mut().insert(Admin(admin_id));

    Ok(next.run(req).await)
}
