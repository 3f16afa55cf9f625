use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A temporary seat reservation. The hold owns its seat count as a liability
/// against the session until it is converted, released or reaped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatHold {
    pub id: Uuid,
    pub session_id: Uuid,
    pub passenger_id: Uuid,
    pub seats_count: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SeatHold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
