use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fare source for a session. Owned by the route catalog; the engine only
/// ever reads it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    /// Per-seat fare in minor units.
    pub base_fare: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}
