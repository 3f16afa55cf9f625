use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, Payment, PaymentRecord};
use crate::hold::SeatHold;
use crate::route::{Route, Station};
use crate::session::{Session, SessionStatus};
use crate::Result;

/// Storage ports for the seat-inventory engine. Every method that mutates
/// state is one atomic storage transaction: all contained writes commit
/// together or none do, and `available_seats` is never read in one call and
/// written in another.

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<()>;

    async fn session(&self, id: Uuid) -> Result<Option<Session>>;

    async fn active_session_for_driver(&self, driver_id: Uuid) -> Result<Option<Session>>;

    async fn active_sessions(
        &self,
        route_id: Option<Uuid>,
        station_id: Option<Uuid>,
    ) -> Result<Vec<Session>>;

    async fn confirmed_booking_count(&self, session_id: Uuid) -> Result<i64>;

    /// Moves the session into a terminal status and stamps `ended_at`.
    /// Cancellation also drops any outstanding holds on the session.
    async fn end_session(
        &self,
        id: Uuid,
        status: SessionStatus,
        drop_holds: bool,
    ) -> Result<Session>;
}

#[async_trait]
pub trait HoldStore: Send + Sync {
    async fn hold(&self, id: Uuid) -> Result<Option<SeatHold>>;

    /// The guarded decrement. In one transaction: re-read the session, verify
    /// it is ACTIVE with enough seats and that the passenger has no other
    /// unexpired hold, insert the hold, and decrement `available_seats` with
    /// a conditional update (flipping to FULL at zero). The conditional
    /// update is the oversell backstop even when the advisory lock is gone.
    async fn reserve_seats(&self, hold: &SeatHold) -> Result<Session>;

    /// Deletes the hold and returns its seats to the session, FULL reverting
    /// to ACTIVE. `Ok(None)` when the hold no longer exists.
    async fn release_hold(&self, id: Uuid) -> Result<Option<(SeatHold, Session)>>;

    /// Deletes the hold (only while unexpired) and inserts a CONFIRMED
    /// booking in its place. Seats were already debited at hold time.
    async fn convert_hold(
        &self,
        id: Uuid,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Booking, Session)>;

    async fn expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<SeatHold>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn booking(&self, id: Uuid) -> Result<Option<Booking>>;

    async fn passenger_bookings(
        &self,
        passenger_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>>;

    /// Flips a CONFIRMED or PENDING booking to CANCELLED and restores its
    /// seats to the session in the same transaction.
    async fn cancel_booking(&self, id: Uuid) -> Result<(Booking, Session)>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn payment(&self, id: Uuid) -> Result<Option<Payment>>;

    async fn payment_by_idempotency_key(&self, key: &str)
        -> Result<Option<(Payment, Booking)>>;

    async fn passenger_payments(&self, passenger_id: Uuid) -> Result<Vec<Payment>>;

    /// The triple write: insert the booking and payment, delete the hold
    /// (only while unexpired), all in one transaction. A unique-key collision
    /// on the idempotency key returns the stored record with `replayed` set.
    async fn finalize_payment(
        &self,
        hold_id: Uuid,
        now: DateTime<Utc>,
        booking: &Booking,
        payment: &Payment,
    ) -> Result<PaymentRecord>;

    /// SUCCESS-only: marks the payment REFUNDED, the booking CANCELLED, and
    /// restores the booking's seats to the session.
    async fn refund_payment(&self, id: Uuid) -> Result<(Payment, Booking, Session)>;
}

#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn route(&self, id: Uuid) -> Result<Option<Route>>;

    async fn station(&self, id: Uuid) -> Result<Option<Station>>;
}
