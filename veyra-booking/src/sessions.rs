use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use veyra_core::ports::RealtimeGateway;
use veyra_core::repository::{RouteStore, SessionStore};
use veyra_core::session::{Session, SessionStatus};
use veyra_core::{Error, Result};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StartSession {
    pub route_id: Uuid,
    pub station_id: Uuid,
    pub total_seats: i32,
}

/// Driver-facing session lifecycle. Seat mutation during the session's life
/// belongs to the hold/payment engine; this only opens and ends runs.
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    routes: Arc<dyn RouteStore>,
    realtime: Arc<dyn RealtimeGateway>,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        routes: Arc<dyn RouteStore>,
        realtime: Arc<dyn RealtimeGateway>,
    ) -> Self {
        Self {
            sessions,
            routes,
            realtime,
        }
    }

    pub async fn start_session(&self, driver_id: Uuid, req: StartSession) -> Result<Session> {
        if req.total_seats < 1 {
            return Err(Error::Conflict("total_seats must be at least 1".into()));
        }

        if self
            .sessions
            .active_session_for_driver(driver_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "Driver already has an active session".into(),
            ));
        }

        let route = self
            .routes
            .route(req.route_id)
            .await?
            .filter(|r| r.is_active)
            .ok_or_else(|| Error::NotFound("Route not found or inactive".into()))?;

        self.routes
            .station(req.station_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| Error::NotFound("Station not found or inactive".into()))?;

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            driver_id,
            route_id: route.id,
            station_id: req.station_id,
            total_seats: req.total_seats,
            available_seats: req.total_seats,
            status: SessionStatus::Active,
            started_at: now,
            ended_at: None,
            updated_at: now,
        };

        self.sessions.create_session(&session).await?;
        self.realtime.session_updated(&session);

        Ok(session)
    }

    pub async fn close_session(&self, session_id: Uuid, driver_id: Uuid) -> Result<Session> {
        let session = self.require_owned(session_id, driver_id, "close").await?;

        if session.status.is_terminal() {
            return Err(Error::Conflict("Session already closed".into()));
        }

        let session = self
            .sessions
            .end_session(session_id, SessionStatus::Closed, false)
            .await?;
        self.realtime.session_updated(&session);

        Ok(session)
    }

    /// Only an ACTIVE session with no confirmed bookings can be cancelled;
    /// outstanding holds are dropped with it (the pool is gone either way).
    pub async fn cancel_session(&self, session_id: Uuid, driver_id: Uuid) -> Result<Session> {
        let session = self.require_owned(session_id, driver_id, "cancel").await?;

        if session.status != SessionStatus::Active {
            return Err(Error::Conflict("Can only cancel active sessions".into()));
        }

        if self.sessions.confirmed_booking_count(session_id).await? > 0 {
            return Err(Error::Conflict(
                "Cannot cancel session with confirmed bookings".into(),
            ));
        }

        let session = self
            .sessions
            .end_session(session_id, SessionStatus::Cancelled, true)
            .await?;
        self.realtime.session_updated(&session);

        Ok(session)
    }

    pub async fn session(&self, session_id: Uuid) -> Result<Session> {
        self.sessions
            .session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound("Session not found".into()))
    }

    pub async fn active_sessions(
        &self,
        route_id: Option<Uuid>,
        station_id: Option<Uuid>,
    ) -> Result<Vec<Session>> {
        self.sessions.active_sessions(route_id, station_id).await
    }

    async fn require_owned(
        &self,
        session_id: Uuid,
        driver_id: Uuid,
        verb: &str,
    ) -> Result<Session> {
        let session = self
            .sessions
            .session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound("Session not found".into()))?;

        if session.driver_id != driver_id {
            return Err(Error::Conflict(format!(
                "Not authorized to {} this session",
                verb
            )));
        }

        Ok(session)
    }
}
