use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veyra_shared::models::events::SessionSnapshot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Full,
    Closed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Full => "FULL",
            SessionStatus::Closed => "CLOSED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(SessionStatus::Active),
            "FULL" => Some(SessionStatus::Full),
            "CLOSED" => Some(SessionStatus::Closed),
            "CANCELLED" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }

    /// CLOSED and CANCELLED never transition out.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Closed | SessionStatus::Cancelled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A driver's bookable run: one seat pool, filled and drained under
/// concurrent holds and bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub route_id: Uuid,
    pub station_id: Uuid,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            driver_id: self.driver_id,
            route_id: self.route_id,
            station_id: self.station_id,
            total_seats: self.total_seats,
            available_seats: self.available_seats,
            status: self.status.to_string(),
            updated_at: self.updated_at,
        }
    }
}
