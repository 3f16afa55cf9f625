//! In-memory fakes for the storage, lock, cache and side-effect ports.
//! `MemoryStore` mirrors the Postgres semantics exactly: every mutating
//! method takes the world lock once, so each call is one "transaction".

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use veyra_booking::{ExpiryReaper, HoldManager, HoldPolicy, PaymentFinalizer, SessionManager};
use veyra_core::booking::{Booking, BookingStatus, Payment, PaymentRecord, PaymentStatus};
use veyra_core::hold::SeatHold;
use veyra_core::ports::{
    AuditRecord, AuditSink, EventProducer, HoldCache, HoldCacheEntry, LockService,
    NotificationKind, NotificationSink, RealtimeGateway,
};
use veyra_core::repository::{BookingStore, HoldStore, PaymentStore, RouteStore, SessionStore};
use veyra_core::route::{Route, Station};
use veyra_core::session::{Session, SessionStatus};
use veyra_core::{Error, Result};

#[derive(Default)]
struct World {
    routes: HashMap<Uuid, Route>,
    stations: HashMap<Uuid, Station>,
    sessions: HashMap<Uuid, Session>,
    holds: HashMap<Uuid, SeatHold>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
}

impl World {
    fn restore_seats(&mut self, session_id: Uuid, seats: i32) -> Result<Session> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::Internal("missing session".into()))?;
        session.available_seats += seats;
        if session.status == SessionStatus::Full {
            session.status = SessionStatus::Active;
        }
        session.updated_at = Utc::now();
        Ok(session.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    world: Mutex<World>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_route(&self, base_fare: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.world.lock().unwrap().routes.insert(
            id,
            Route {
                id,
                origin: "Central".into(),
                destination: "Airport".into(),
                base_fare,
                is_active: true,
            },
        );
        id
    }

    pub fn seed_station(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.world.lock().unwrap().stations.insert(
            id,
            Station {
                id,
                name: "Bay 4".into(),
                is_active: true,
            },
        );
        id
    }

    pub fn seed_session(&self, route_id: Uuid, station_id: Uuid, total_seats: i32) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.world.lock().unwrap().sessions.insert(
            id,
            Session {
                id,
                driver_id: Uuid::new_v4(),
                route_id,
                station_id,
                total_seats,
                available_seats: total_seats,
                status: SessionStatus::Active,
                started_at: now,
                ended_at: None,
                updated_at: now,
            },
        );
        id
    }

    pub fn session_state(&self, id: Uuid) -> Session {
        self.world.lock().unwrap().sessions[&id].clone()
    }

    pub fn hold_count(&self, session_id: Uuid) -> usize {
        self.world
            .lock()
            .unwrap()
            .holds
            .values()
            .filter(|h| h.session_id == session_id)
            .count()
    }

    pub fn booking_count(&self, session_id: Uuid) -> usize {
        self.world
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.session_id == session_id)
            .count()
    }

    pub fn payment_count(&self) -> usize {
        self.world.lock().unwrap().payments.len()
    }

    /// Deletes the ledger row without touching seats or the cache, to
    /// simulate a mirror entry outliving the durable record.
    pub fn release_hold_raw(&self, hold_id: Uuid) {
        self.world.lock().unwrap().holds.remove(&hold_id);
    }

    /// Backdates a hold so the expiry paths can be exercised.
    pub fn expire_hold(&self, hold_id: Uuid) {
        let mut world = self.world.lock().unwrap();
        if let Some(hold) = world.holds.get_mut(&hold_id) {
            hold.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    pub fn set_session_status(&self, session_id: Uuid, status: SessionStatus) {
        let mut world = self.world.lock().unwrap();
        if let Some(session) = world.sessions.get_mut(&session_id) {
            session.status = status;
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        self.world
            .lock()
            .unwrap()
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn session(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.world.lock().unwrap().sessions.get(&id).cloned())
    }

    async fn active_session_for_driver(&self, driver_id: Uuid) -> Result<Option<Session>> {
        Ok(self
            .world
            .lock()
            .unwrap()
            .sessions
            .values()
            .find(|s| {
                s.driver_id == driver_id
                    && matches!(s.status, SessionStatus::Active | SessionStatus::Full)
            })
            .cloned())
    }

    async fn active_sessions(
        &self,
        route_id: Option<Uuid>,
        station_id: Option<Uuid>,
    ) -> Result<Vec<Session>> {
        Ok(self
            .world
            .lock()
            .unwrap()
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Active)
            .filter(|s| route_id.map_or(true, |r| s.route_id == r))
            .filter(|s| station_id.map_or(true, |st| s.station_id == st))
            .cloned()
            .collect())
    }

    async fn confirmed_booking_count(&self, session_id: Uuid) -> Result<i64> {
        Ok(self
            .world
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.session_id == session_id && b.status == BookingStatus::Confirmed)
            .count() as i64)
    }

    async fn end_session(
        &self,
        id: Uuid,
        status: SessionStatus,
        drop_holds: bool,
    ) -> Result<Session> {
        let mut world = self.world.lock().unwrap();
        let session = world
            .sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Session not found".into()))?;
        session.status = status;
        session.ended_at = Some(Utc::now());
        session.updated_at = Utc::now();
        let session = session.clone();

        if drop_holds {
            world.holds.retain(|_, h| h.session_id != id);
        }

        Ok(session)
    }
}

#[async_trait]
impl HoldStore for MemoryStore {
    async fn hold(&self, id: Uuid) -> Result<Option<SeatHold>> {
        Ok(self.world.lock().unwrap().holds.get(&id).cloned())
    }

    async fn reserve_seats(&self, hold: &SeatHold) -> Result<Session> {
        let mut world = self.world.lock().unwrap();

        let session = world
            .sessions
            .get(&hold.session_id)
            .ok_or_else(|| Error::NotFound("Session not found".into()))?;

        if session.status != SessionStatus::Active {
            return Err(Error::Conflict("Session is not active".into()));
        }
        if session.available_seats < hold.seats_count {
            return Err(Error::Conflict(format!(
                "Only {} seats available",
                session.available_seats
            )));
        }

        let duplicate = world.holds.values().any(|h| {
            h.session_id == hold.session_id
                && h.passenger_id == hold.passenger_id
                && h.expires_at > hold.created_at
        });
        if duplicate {
            return Err(Error::Conflict(
                "You already have a pending hold for this session".into(),
            ));
        }

        world.holds.insert(hold.id, hold.clone());

        let session = world.sessions.get_mut(&hold.session_id).unwrap();
        session.available_seats -= hold.seats_count;
        if session.available_seats == 0 {
            session.status = SessionStatus::Full;
        }
        session.updated_at = Utc::now();

        Ok(session.clone())
    }

    async fn release_hold(&self, id: Uuid) -> Result<Option<(SeatHold, Session)>> {
        let mut world = self.world.lock().unwrap();

        let Some(hold) = world.holds.remove(&id) else {
            return Ok(None);
        };

        let session = world.restore_seats(hold.session_id, hold.seats_count)?;
        Ok(Some((hold, session)))
    }

    async fn convert_hold(
        &self,
        id: Uuid,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Booking, Session)> {
        let mut world = self.world.lock().unwrap();

        let hold = match world.holds.get(&id) {
            Some(h) if h.expires_at > now => world.holds.remove(&id).unwrap(),
            Some(_) => return Err(Error::Conflict("Hold has expired".into())),
            None => return Err(Error::NotFound("Hold not found or expired".into())),
        };

        let booking = Booking {
            id: booking_id,
            session_id: hold.session_id,
            passenger_id: hold.passenger_id,
            seats_count: hold.seats_count,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        world.bookings.insert(booking.id, booking.clone());

        let session = world
            .sessions
            .get(&hold.session_id)
            .cloned()
            .ok_or_else(|| Error::Internal("missing session".into()))?;

        Ok((booking, session))
    }

    async fn expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<SeatHold>> {
        Ok(self
            .world
            .lock()
            .unwrap()
            .holds
            .values()
            .filter(|h| h.expires_at < now)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn booking(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.world.lock().unwrap().bookings.get(&id).cloned())
    }

    async fn passenger_bookings(
        &self,
        passenger_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        Ok(self
            .world
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.passenger_id == passenger_id)
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect())
    }

    async fn cancel_booking(&self, id: Uuid) -> Result<(Booking, Session)> {
        let mut world = self.world.lock().unwrap();

        let booking = world
            .bookings
            .get(&id)
            .ok_or_else(|| Error::NotFound("Booking not found".into()))?;

        if !matches!(
            booking.status,
            BookingStatus::Confirmed | BookingStatus::Pending
        ) {
            return Err(Error::Conflict("Cannot cancel this booking".into()));
        }

        let booking = world.bookings.get_mut(&id).unwrap();
        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        let booking = booking.clone();

        let session = world.restore_seats(booking.session_id, booking.seats_count)?;
        Ok((booking, session))
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn payment(&self, id: Uuid) -> Result<Option<Payment>> {
        Ok(self.world.lock().unwrap().payments.get(&id).cloned())
    }

    async fn payment_by_idempotency_key(&self, key: &str) -> Result<Option<(Payment, Booking)>> {
        let world = self.world.lock().unwrap();
        let Some(payment) = world
            .payments
            .values()
            .find(|p| p.idempotency_key == key)
            .cloned()
        else {
            return Ok(None);
        };
        let booking = world
            .bookings
            .get(&payment.booking_id)
            .cloned()
            .ok_or_else(|| Error::Internal("payment references a missing booking".into()))?;
        Ok(Some((payment, booking)))
    }

    async fn passenger_payments(&self, passenger_id: Uuid) -> Result<Vec<Payment>> {
        let world = self.world.lock().unwrap();
        Ok(world
            .payments
            .values()
            .filter(|p| {
                world
                    .bookings
                    .get(&p.booking_id)
                    .map_or(false, |b| b.passenger_id == passenger_id)
            })
            .cloned()
            .collect())
    }

    async fn finalize_payment(
        &self,
        hold_id: Uuid,
        now: DateTime<Utc>,
        booking: &Booking,
        payment: &Payment,
    ) -> Result<PaymentRecord> {
        let mut world = self.world.lock().unwrap();

        // Unique idempotency key, checked first like the database constraint.
        if let Some(existing) = world
            .payments
            .values()
            .find(|p| p.idempotency_key == payment.idempotency_key)
            .cloned()
        {
            let booking = world
                .bookings
                .get(&existing.booking_id)
                .cloned()
                .ok_or_else(|| Error::Internal("payment references a missing booking".into()))?;
            return Ok(PaymentRecord {
                payment: existing,
                booking,
                replayed: true,
            });
        }

        match world.holds.get(&hold_id) {
            Some(h) if h.expires_at > now => {
                world.holds.remove(&hold_id);
            }
            Some(_) => return Err(Error::Conflict("Hold has expired".into())),
            None => return Err(Error::NotFound("Hold not found or expired".into())),
        }

        world.bookings.insert(booking.id, booking.clone());
        world.payments.insert(payment.id, payment.clone());

        Ok(PaymentRecord {
            payment: payment.clone(),
            booking: booking.clone(),
            replayed: false,
        })
    }

    async fn refund_payment(&self, id: Uuid) -> Result<(Payment, Booking, Session)> {
        let mut world = self.world.lock().unwrap();

        let payment = world
            .payments
            .get(&id)
            .ok_or_else(|| Error::NotFound("Payment not found".into()))?;

        if payment.status != PaymentStatus::Success {
            return Err(Error::Conflict("Can only refund successful payments".into()));
        }

        let payment = world.payments.get_mut(&id).unwrap();
        payment.status = PaymentStatus::Refunded;
        payment.updated_at = Utc::now();
        let payment = payment.clone();

        let booking = world
            .bookings
            .get_mut(&payment.booking_id)
            .ok_or_else(|| Error::Internal("payment references a missing booking".into()))?;
        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        let booking = booking.clone();

        let session = world.restore_seats(booking.session_id, booking.seats_count)?;
        Ok((payment, booking, session))
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn route(&self, id: Uuid) -> Result<Option<Route>> {
        Ok(self.world.lock().unwrap().routes.get(&id).cloned())
    }

    async fn station(&self, id: Uuid) -> Result<Option<Station>> {
        Ok(self.world.lock().unwrap().stations.get(&id).cloned())
    }
}

/// Set-if-absent lock with TTL, same contract as the Redis SET NX EX.
#[derive(Default)]
pub struct MemoryLock {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Occupies a key so the next acquire sees contention.
    pub async fn hold_key(&self, key: &str, ttl: Duration) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), Instant::now() + ttl);
    }
}

#[async_trait]
impl LockService for MemoryLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries.retain(|_, expires| *expires > now);

        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), now + ttl);
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A lock backend that is down: every call errors.
pub struct FailingLock;

#[async_trait]
impl LockService for FailingLock {
    async fn acquire(&self, _key: &str, _ttl: Duration) -> Result<bool> {
        Err(Error::internal("lock backend unreachable"))
    }

    async fn release(&self, _key: &str) -> Result<()> {
        Err(Error::internal("lock backend unreachable"))
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<Uuid, HoldCacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, hold_id: Uuid) -> bool {
        self.entries.lock().unwrap().contains_key(&hold_id)
    }
}

#[async_trait]
impl HoldCache for MemoryCache {
    async fn put(&self, hold: &SeatHold, _ttl: Duration) {
        self.entries.lock().unwrap().insert(
            hold.id,
            HoldCacheEntry {
                session_id: hold.session_id,
                seats_count: hold.seats_count,
            },
        );
    }

    async fn get(&self, hold_id: Uuid) -> Option<HoldCacheEntry> {
        self.entries.lock().unwrap().get(&hold_id).cloned()
    }

    async fn remove(&self, hold_id: Uuid) {
        self.entries.lock().unwrap().remove(&hold_id);
    }
}

#[derive(Default)]
pub struct RecordingRealtime {
    events: Mutex<Vec<String>>,
}

impl RecordingRealtime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RealtimeGateway for RecordingRealtime {
    fn session_updated(&self, _session: &Session) {
        self.events.lock().unwrap().push("session.updated".into());
    }

    fn seat_booked(&self, session: &Session, _seats_count: i32) {
        let mut events = self.events.lock().unwrap();
        events.push("seat.booked".into());
        if session.status == SessionStatus::Full {
            events.push("session.full".into());
        }
    }

    fn seat_released(&self, _session: &Session, _seats_count: i32) {
        self.events.lock().unwrap().push("seat.released".into());
    }

    fn payment_success(&self, _session_id: Uuid, _payment: &Payment) {
        self.events.lock().unwrap().push("payment.success".into());
    }
}

#[derive(Default)]
pub struct RecordingProducer {
    topics: Mutex<Vec<String>>,
}

impl RecordingProducer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventProducer for RecordingProducer {
    async fn publish(&self, topic: &str, _key: &str, _payload: &str) -> Result<()> {
        self.topics.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    entries: Mutex<Vec<AuditRecord>>,
}

impl RecordingAudit {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.action.clone())
            .collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, entry: AuditRecord) {
        self.entries.lock().unwrap().push(entry);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    kinds: Mutex<Vec<NotificationKind>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.kinds.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, _user_id: Uuid, kind: NotificationKind, _payload: serde_json::Value) {
        self.kinds.lock().unwrap().push(kind);
    }
}

/// Everything wired together against the in-memory world.
pub struct TestEngine {
    pub store: Arc<MemoryStore>,
    pub lock: Arc<MemoryLock>,
    pub cache: Arc<MemoryCache>,
    pub realtime: Arc<RecordingRealtime>,
    pub producer: Arc<RecordingProducer>,
    pub audit: Arc<RecordingAudit>,
    pub notifier: Arc<RecordingNotifier>,
    pub holds: Arc<HoldManager>,
    pub payments: Arc<PaymentFinalizer>,
    pub sessions: Arc<SessionManager>,
    pub reaper: Arc<ExpiryReaper>,
}

pub fn engine() -> TestEngine {
    engine_with(HoldPolicy::default(), None)
}

pub fn engine_with(policy: HoldPolicy, lock_override: Option<Arc<dyn LockService>>) -> TestEngine {
    let store = MemoryStore::new();
    let lock = MemoryLock::new();
    let cache = MemoryCache::new();
    let realtime = RecordingRealtime::new();
    let producer = RecordingProducer::new();
    let audit = RecordingAudit::new();
    let notifier = RecordingNotifier::new();

    let lock_service: Arc<dyn LockService> = match lock_override {
        Some(service) => service,
        None => lock.clone(),
    };
    let service_fee_per_seat = policy.service_fee_per_seat;

    let holds = Arc::new(HoldManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
        lock_service,
        cache.clone(),
        producer.clone(),
        realtime.clone(),
        policy,
    ));

    let payments = Arc::new(PaymentFinalizer::new(
        holds.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cache.clone(),
        producer.clone(),
        realtime.clone(),
        audit.clone(),
        notifier.clone(),
        service_fee_per_seat,
    ));

    let sessions = Arc::new(SessionManager::new(
        store.clone(),
        store.clone(),
        realtime.clone(),
    ));

    let reaper = Arc::new(ExpiryReaper::new(
        holds.clone(),
        store.clone(),
        Duration::from_secs(60),
    ));

    TestEngine {
        store,
        lock,
        cache,
        realtime,
        producer,
        audit,
        notifier,
        holds,
        payments,
        sessions,
        reaper,
    }
}
