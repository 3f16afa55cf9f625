use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::Payment;
use crate::hold::SeatHold;
use crate::session::Session;
use crate::Result;

/// Short-lived per-session mutual exclusion, set-if-absent with expiry.
/// Best effort: a crashed holder is reclaimed by the TTL, and acquisition
/// never blocks — contended callers get `false` and retry.
#[async_trait]
pub trait LockService: Send + Sync {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool>;

    async fn release(&self, key: &str) -> Result<()>;
}

/// What to do when the lock backend itself is unreachable. `Open` proceeds
/// on the storage transaction's conditional update alone; `Closed` rejects
/// new holds with a retryable Busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockFailurePolicy {
    Open,
    Closed,
}

impl Default for LockFailurePolicy {
    fn default() -> Self {
        LockFailurePolicy::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldCacheEntry {
    pub session_id: Uuid,
    pub seats_count: i32,
}

/// Fast-lookup mirror of the hold ledger. Never the source of truth: a hit
/// must be validated against the durable record, and absence means
/// "unknown", not "does not exist". All operations are best effort.
#[async_trait]
pub trait HoldCache: Send + Sync {
    async fn put(&self, hold: &SeatHold, ttl: Duration);

    async fn get(&self, hold_id: Uuid) -> Option<HoldCacheEntry>;

    async fn remove(&self, hold_id: Uuid);
}

/// At-most-once broker publish; callers fire and forget after commit.
#[async_trait]
pub trait EventProducer: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub actor_id: Uuid,
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
}

/// Best-effort audit trail; failures are logged, never surfaced.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditRecord);
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    BookingConfirmed,
    BookingCancelled,
    PaymentSuccess,
    PaymentFailed,
    SessionFull,
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingConfirmed => "BOOKING_CONFIRMED",
            NotificationKind::BookingCancelled => "BOOKING_CANCELLED",
            NotificationKind::PaymentSuccess => "PAYMENT_SUCCESS",
            NotificationKind::PaymentFailed => "PAYMENT_FAILED",
            NotificationKind::SessionFull => "SESSION_FULL",
            NotificationKind::General => "GENERAL",
        }
    }
}

/// Best-effort user notification; must never block or fail a booking flow.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: Uuid, kind: NotificationKind, payload: serde_json::Value);
}

/// Session- and driver-scoped fan-out of inventory changes. Implementations
/// are synchronous sends into a broadcast channel; dropped subscribers are
/// not an error.
pub trait RealtimeGateway: Send + Sync {
    fn session_updated(&self, session: &Session);

    fn seat_booked(&self, session: &Session, seats_count: i32);

    fn seat_released(&self, session: &Session, seats_count: i32);

    fn payment_success(&self, session_id: Uuid, payment: &Payment);
}
