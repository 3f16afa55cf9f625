use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use veyra_core::booking::{Booking, BookingStatus};
use veyra_core::hold::SeatHold;
use veyra_core::ports::{EventProducer, HoldCache, LockFailurePolicy, LockService, RealtimeGateway};
use veyra_core::repository::{BookingStore, HoldStore, RouteStore};
use veyra_core::session::Session;
use veyra_core::{Error, Result};
use veyra_shared::models::events::{BookingConfirmedEvent, HoldCreatedEvent, HoldReleasedEvent};

/// Knobs for the hold lifecycle, loaded from `business_rules` config.
#[derive(Debug, Clone)]
pub struct HoldPolicy {
    /// How long a hold owns its seats before the reaper may reclaim it.
    pub hold_ttl: Duration,
    /// Advisory lock TTL; only needs to outlive one storage transaction.
    pub lock_ttl: Duration,
    pub max_seats_per_hold: i32,
    /// Per-seat service fee in minor units.
    pub service_fee_per_seat: i32,
    pub lock_failure_policy: LockFailurePolicy,
}

impl Default for HoldPolicy {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::from_secs(300),
            lock_ttl: Duration::from_secs(10),
            max_seats_per_hold: 10,
            service_fee_per_seat: 100,
            lock_failure_policy: LockFailurePolicy::Open,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateHold {
    pub session_id: Uuid,
    pub seats_count: i32,
}

/// What the passenger gets back: the hold plus a fare quote for the payment
/// step.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HoldReceipt {
    pub hold_id: Uuid,
    pub session_id: Uuid,
    pub seats_count: i32,
    pub fare_per_seat: i32,
    pub service_fee: i32,
    pub total_amount: i32,
    pub expires_at: DateTime<Utc>,
    pub expires_in: u64,
}

/// Orchestrates the hold lifecycle against the inventory store, the advisory
/// lock and the hold cache. Creation is the only path serialized by the
/// lock; release and conversion rely on single-transaction atomicity.
pub struct HoldManager {
    holds: Arc<dyn HoldStore>,
    bookings: Arc<dyn BookingStore>,
    routes: Arc<dyn RouteStore>,
    locks: Arc<dyn LockService>,
    cache: Arc<dyn HoldCache>,
    events: Arc<dyn EventProducer>,
    realtime: Arc<dyn RealtimeGateway>,
    policy: HoldPolicy,
}

impl HoldManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        holds: Arc<dyn HoldStore>,
        bookings: Arc<dyn BookingStore>,
        routes: Arc<dyn RouteStore>,
        locks: Arc<dyn LockService>,
        cache: Arc<dyn HoldCache>,
        events: Arc<dyn EventProducer>,
        realtime: Arc<dyn RealtimeGateway>,
        policy: HoldPolicy,
    ) -> Self {
        Self {
            holds,
            bookings,
            routes,
            locks,
            cache,
            events,
            realtime,
            policy,
        }
    }

    /// Takes a temporary seat reservation on a session. Fails fast with
    /// `Busy` when another hold attempt owns the session lock.
    pub async fn create_hold(&self, passenger_id: Uuid, req: CreateHold) -> Result<HoldReceipt> {
        if req.seats_count < 1 || req.seats_count > self.policy.max_seats_per_hold {
            return Err(Error::Conflict(format!(
                "seats_count must be between 1 and {}",
                self.policy.max_seats_per_hold
            )));
        }

        let lock_key = format!("seat:lock:{}", req.session_id);
        if !self.acquire_session_lock(&lock_key).await? {
            return Err(Error::Busy("Session is busy, please try again".into()));
        }

        let result = self.create_hold_locked(passenger_id, &req).await;

        // Release must run on success and on every failure path; a leaked
        // lock would freeze the session until the TTL clears it.
        if let Err(err) = self.locks.release(&lock_key).await {
            warn!(key = %lock_key, error = %err, "failed to release session lock; TTL will reclaim it");
        }

        let (hold, session, fare_per_seat) = result?;

        self.cache.put(&hold, self.policy.hold_ttl).await;

        let event = HoldCreatedEvent {
            hold_id: hold.id,
            session_id: hold.session_id,
            passenger_id,
            seats_count: hold.seats_count,
            expires_at: hold.expires_at.timestamp(),
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = self
                .events
                .publish("holds.created", &hold.session_id.to_string(), &payload)
                .await;
        }
        self.realtime.session_updated(&session);

        Ok(HoldReceipt {
            hold_id: hold.id,
            session_id: hold.session_id,
            seats_count: hold.seats_count,
            fare_per_seat,
            service_fee: self.policy.service_fee_per_seat * hold.seats_count,
            total_amount: (fare_per_seat + self.policy.service_fee_per_seat) * hold.seats_count,
            expires_at: hold.expires_at,
            expires_in: self.policy.hold_ttl.as_secs(),
        })
    }

    async fn acquire_session_lock(&self, key: &str) -> Result<bool> {
        match self.locks.acquire(key, self.policy.lock_ttl).await {
            Ok(acquired) => Ok(acquired),
            Err(err) => match self.policy.lock_failure_policy {
                LockFailurePolicy::Open => {
                    // The storage transaction's conditional update is the
                    // real oversell guard; the lock only thins contention.
                    warn!(error = %err, "lock backend unavailable; proceeding on storage isolation alone");
                    Ok(true)
                }
                LockFailurePolicy::Closed => {
                    warn!(error = %err, "lock backend unavailable; rejecting hold (fail-closed)");
                    Err(Error::Busy(
                        "Reservation service is busy, please try again".into(),
                    ))
                }
            },
        }
    }

    async fn create_hold_locked(
        &self,
        passenger_id: Uuid,
        req: &CreateHold,
    ) -> Result<(SeatHold, Session, i32)> {
        let now = Utc::now();
        let hold = SeatHold {
            id: Uuid::new_v4(),
            session_id: req.session_id,
            passenger_id,
            seats_count: req.seats_count,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(self.policy.hold_ttl.as_secs() as i64),
        };

        let session = self.holds.reserve_seats(&hold).await?;

        let route = self
            .routes
            .route(session.route_id)
            .await?
            .ok_or_else(|| Error::NotFound("Route not found".into()))?;

        Ok((hold, session, route.base_fare))
    }

    /// Idempotent: releasing a hold that no longer exists is a no-op.
    pub async fn release_hold(&self, hold_id: Uuid) -> Result<Option<Session>> {
        let Some((hold, session)) = self.holds.release_hold(hold_id).await? else {
            return Ok(None);
        };

        self.cache.remove(hold_id).await;
        self.realtime.seat_released(&session, hold.seats_count);

        let event = HoldReleasedEvent {
            hold_id: hold.id,
            session_id: hold.session_id,
            seats_count: hold.seats_count,
            released_at: Utc::now().timestamp(),
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = self
                .events
                .publish("holds.released", &hold.session_id.to_string(), &payload)
                .await;
        }

        Ok(Some(session))
    }

    /// Converts a still-valid hold into a CONFIRMED booking. Seats were
    /// already debited at hold time, so no counter moves here.
    pub async fn convert_hold_to_booking(
        &self,
        hold_id: Uuid,
        passenger_id: Uuid,
    ) -> Result<Booking> {
        let hold = self
            .holds
            .hold(hold_id)
            .await?
            .ok_or_else(|| Error::NotFound("Hold not found or expired".into()))?;

        if hold.passenger_id != passenger_id {
            return Err(Error::Conflict("Hold does not belong to this user".into()));
        }

        if hold.is_expired(Utc::now()) {
            self.release_hold(hold_id).await?;
            return Err(Error::Conflict("Hold has expired".into()));
        }

        let (booking, session) = self
            .holds
            .convert_hold(hold_id, Uuid::new_v4(), Utc::now())
            .await?;

        self.cache.remove(hold_id).await;
        self.realtime.seat_booked(&session, booking.seats_count);

        let event = BookingConfirmedEvent {
            booking_id: booking.id,
            session_id: booking.session_id,
            passenger_id,
            seats_count: booking.seats_count,
            confirmed_at: Utc::now().timestamp(),
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = self
                .events
                .publish("bookings.confirmed", &booking.session_id.to_string(), &payload)
                .await;
        }

        Ok(booking)
    }

    /// Cancelling a confirmed booking gives its seats back to the pool.
    pub async fn cancel_booking(&self, booking_id: Uuid, passenger_id: Uuid) -> Result<Booking> {
        let booking = self
            .bookings
            .booking(booking_id)
            .await?
            .ok_or_else(|| Error::NotFound("Booking not found".into()))?;

        if booking.passenger_id != passenger_id {
            return Err(Error::Conflict("Booking does not belong to this user".into()));
        }

        // The store re-checks the status inside the transaction; this read
        // only produces the friendly ownership error above.
        let (booking, session) = self.bookings.cancel_booking(booking_id).await?;

        self.realtime.seat_released(&session, booking.seats_count);

        Ok(booking)
    }

    /// Cache-assisted lookup. The cache is a hint only: a hit is still
    /// validated against the ledger, and a stale mirror entry is evicted.
    pub async fn hold(&self, hold_id: Uuid) -> Result<Option<SeatHold>> {
        let cached = self.cache.get(hold_id).await;
        let hold = self.holds.hold(hold_id).await?;

        if cached.is_some() && hold.is_none() {
            self.cache.remove(hold_id).await;
        }

        Ok(hold)
    }

    pub async fn booking(&self, booking_id: Uuid) -> Result<Booking> {
        self.bookings
            .booking(booking_id)
            .await?
            .ok_or_else(|| Error::NotFound("Booking not found".into()))
    }

    pub async fn passenger_bookings(
        &self,
        passenger_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        self.bookings.passenger_bookings(passenger_id, status).await
    }
}
