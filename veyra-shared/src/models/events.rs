use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Wire-friendly view of a session, pushed to realtime subscribers whenever
/// inventory changes.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub route_id: Uuid,
    pub station_id: Uuid,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatCountChange {
    pub session_id: Uuid,
    pub seats_count: i32,
    pub available_seats: i32,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentSettled {
    pub session_id: Uuid,
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub amount: i32,
}

/// Events fanned out on the session- and driver-scoped realtime channels.
/// The SSE event name comes from `name()`; the payload is the bare variant.
#[derive(Debug, serde::Serialize, Clone)]
#[serde(untagged)]
pub enum RealtimeEvent {
    SessionUpdated(SessionSnapshot),
    SeatBooked(SeatCountChange),
    SeatReleased(SeatCountChange),
    SessionFull { session_id: Uuid },
    PaymentSuccess(PaymentSettled),
}

impl RealtimeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::SessionUpdated(_) => "session.updated",
            RealtimeEvent::SeatBooked(_) => "seat.booked",
            RealtimeEvent::SeatReleased(_) => "seat.released",
            RealtimeEvent::SessionFull { .. } => "session.full",
            RealtimeEvent::PaymentSuccess(_) => "payment.success",
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            RealtimeEvent::SessionUpdated(snapshot) => snapshot.id,
            RealtimeEvent::SeatBooked(change) => change.session_id,
            RealtimeEvent::SeatReleased(change) => change.session_id,
            RealtimeEvent::SessionFull { session_id } => *session_id,
            RealtimeEvent::PaymentSuccess(settled) => settled.session_id,
        }
    }

    /// Only session snapshots carry enough context to route to a driver channel.
    pub fn driver_id(&self) -> Option<Uuid> {
        match self {
            RealtimeEvent::SessionUpdated(snapshot) => Some(snapshot.driver_id),
            _ => None,
        }
    }
}

// Broker payloads, one struct per topic.

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HoldCreatedEvent {
    pub hold_id: Uuid,
    pub session_id: Uuid,
    pub passenger_id: Uuid,
    pub seats_count: i32,
    pub expires_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HoldReleasedEvent {
    pub hold_id: Uuid,
    pub session_id: Uuid,
    pub seats_count: i32,
    pub released_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub session_id: Uuid,
    pub passenger_id: Uuid,
    pub seats_count: i32,
    pub confirmed_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentSucceededEvent {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub session_id: Uuid,
    pub total_amount: i32,
    pub settled_at: i64,
}
