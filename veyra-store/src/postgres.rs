use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use veyra_core::booking::{Booking, BookingStatus, Payment, PaymentMethod, PaymentRecord, PaymentStatus};
use veyra_core::hold::SeatHold;
use veyra_core::repository::{BookingStore, HoldStore, PaymentStore, RouteStore, SessionStore};
use veyra_core::route::{Route, Station};
use veyra_core::session::{Session, SessionStatus};
use veyra_core::{Error, Result};

/// Source of truth for sessions, holds, bookings and payments. Every
/// mutating method is one transaction; seat counters are only ever touched
/// behind conditional UPDATEs so a lost advisory lock cannot oversell.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying.

const SESSION_COLUMNS: &str =
    "id, driver_id, route_id, station_id, total_seats, available_seats, status, started_at, ended_at, updated_at";

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    driver_id: Uuid,
    route_id: Uuid,
    station_id: Uuid,
    total_seats: i32,
    available_seats: i32,
    status: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Result<Session> {
        let status = SessionStatus::parse(&self.status)
            .ok_or_else(|| Error::Internal(format!("unknown session status {}", self.status)))?;
        Ok(Session {
            id: self.id,
            driver_id: self.driver_id,
            route_id: self.route_id,
            station_id: self.station_id,
            total_seats: self.total_seats,
            available_seats: self.available_seats,
            status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            updated_at: self.updated_at,
        })
    }
}

const HOLD_COLUMNS: &str = "id, session_id, passenger_id, seats_count, created_at, expires_at";

#[derive(sqlx::FromRow)]
struct HoldRow {
    id: Uuid,
    session_id: Uuid,
    passenger_id: Uuid,
    seats_count: i32,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl HoldRow {
    fn into_hold(self) -> SeatHold {
        SeatHold {
            id: self.id,
            session_id: self.session_id,
            passenger_id: self.passenger_id,
            seats_count: self.seats_count,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

const BOOKING_COLUMNS: &str =
    "id, session_id, passenger_id, seats_count, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    session_id: Uuid,
    passenger_id: Uuid,
    seats_count: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| Error::Internal(format!("unknown booking status {}", self.status)))?;
        Ok(Booking {
            id: self.id,
            session_id: self.session_id,
            passenger_id: self.passenger_id,
            seats_count: self.seats_count,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, booking_id, fare_amount, service_fee, total_amount, method, status, idempotency_key, gateway_reference, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    fare_amount: i32,
    service_fee: i32,
    total_amount: i32,
    method: String,
    status: String,
    idempotency_key: String,
    gateway_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment> {
        let method = PaymentMethod::parse(&self.method)
            .ok_or_else(|| Error::Internal(format!("unknown payment method {}", self.method)))?;
        let status = PaymentStatus::parse(&self.status)
            .ok_or_else(|| Error::Internal(format!("unknown payment status {}", self.status)))?;
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            fare_amount: self.fare_amount,
            service_fee: self.service_fee,
            total_amount: self.total_amount,
            method,
            status,
            idempotency_key: self.idempotency_key,
            gateway_reference: self.gateway_reference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    origin: String,
    destination: String,
    base_fare: i32,
    is_active: bool,
}

#[derive(sqlx::FromRow)]
struct StationRow {
    id: Uuid,
    name: String,
    is_active: bool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().and_then(|db| db.code()),
        Some(code) if code == "23505"
    )
}

/// Seats going back to the pool revive FULL sessions but never terminal
/// ones; refunds against CLOSED sessions still restore the counter.
const RESTORE_SEATS_SQL: &str = r#"
    UPDATE sessions
    SET available_seats = available_seats + $2,
        status = CASE WHEN status = 'FULL' THEN 'ACTIVE' ELSE status END,
        updated_at = NOW()
    WHERE id = $1
    RETURNING id, driver_id, route_id, station_id, total_seats, available_seats, status, started_at, ended_at, updated_at
"#;

#[async_trait]
impl SessionStore for PostgresStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, driver_id, route_id, station_id, total_seats, available_seats, status, started_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id)
        .bind(session.driver_id)
        .bind(session.route_id)
        .bind(session.station_id)
        .bind(session.total_seats)
        .bind(session.available_seats)
        .bind(session.status.as_str())
        .bind(session.started_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::internal)?;

        Ok(())
    }

    async fn session(&self, id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn active_session_for_driver(&self, driver_id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM sessions WHERE driver_id = $1 AND status IN ('ACTIVE', 'FULL') LIMIT 1",
            SESSION_COLUMNS
        ))
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn active_sessions(
        &self,
        route_id: Option<Uuid>,
        station_id: Option<Uuid>,
    ) -> Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {}
            FROM sessions
            WHERE status = 'ACTIVE'
              AND ($1::uuid IS NULL OR route_id = $1)
              AND ($2::uuid IS NULL OR station_id = $2)
            ORDER BY started_at DESC
            "#,
            SESSION_COLUMNS
        ))
        .bind(route_id)
        .bind(station_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::internal)?;

        rows.into_iter().map(SessionRow::into_session).collect()
    }

    async fn confirmed_booking_count(&self, session_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE session_id = $1 AND status = 'CONFIRMED'",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::internal)
    }

    async fn end_session(
        &self,
        id: Uuid,
        status: SessionStatus,
        drop_holds: bool,
    ) -> Result<Session> {
        let mut tx = self.pool.begin().await.map_err(Error::internal)?;

        let session = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            UPDATE sessions
            SET status = $2, ended_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::internal)?
        .ok_or_else(|| Error::NotFound("Session not found".into()))?
        .into_session()?;

        if drop_holds {
            sqlx::query("DELETE FROM seat_holds WHERE session_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(Error::internal)?;
        }

        tx.commit().await.map_err(Error::internal)?;

        Ok(session)
    }
}

#[async_trait]
impl HoldStore for PostgresStore {
    async fn hold(&self, id: Uuid) -> Result<Option<SeatHold>> {
        let row = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM seat_holds WHERE id = $1",
            HOLD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?;

        Ok(row.map(HoldRow::into_hold))
    }

    async fn reserve_seats(&self, hold: &SeatHold) -> Result<Session> {
        let mut tx = self.pool.begin().await.map_err(Error::internal)?;

        let session = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM sessions WHERE id = $1 FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(hold.session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::internal)?
        .ok_or_else(|| Error::NotFound("Session not found".into()))?
        .into_session()?;

        if session.status != SessionStatus::Active {
            return Err(Error::Conflict("Session is not active".into()));
        }

        if session.available_seats < hold.seats_count {
            return Err(Error::Conflict(format!(
                "Only {} seats available",
                session.available_seats
            )));
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM seat_holds WHERE session_id = $1 AND passenger_id = $2 AND expires_at > $3",
        )
        .bind(hold.session_id)
        .bind(hold.passenger_id)
        .bind(hold.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::internal)?;

        if existing > 0 {
            return Err(Error::Conflict(
                "You already have a pending hold for this session".into(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO seat_holds (id, session_id, passenger_id, seats_count, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(hold.id)
        .bind(hold.session_id)
        .bind(hold.passenger_id)
        .bind(hold.seats_count)
        .bind(hold.created_at)
        .bind(hold.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(Error::internal)?;

        // The conditional decrement is the real oversell guard: the row lock
        // plus the WHERE re-check hold even if the advisory lock vanished.
        let updated = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            UPDATE sessions
            SET available_seats = available_seats - $2,
                status = CASE WHEN available_seats - $2 = 0 THEN 'FULL' ELSE status END,
                updated_at = NOW()
            WHERE id = $1 AND status = 'ACTIVE' AND available_seats >= $2
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(hold.session_id)
        .bind(hold.seats_count)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::internal)?
        .ok_or_else(|| Error::Conflict("Seats were taken by a concurrent reservation".into()))?
        .into_session()?;

        tx.commit().await.map_err(Error::internal)?;

        Ok(updated)
    }

    async fn release_hold(&self, id: Uuid) -> Result<Option<(SeatHold, Session)>> {
        let mut tx = self.pool.begin().await.map_err(Error::internal)?;

        let Some(row) = sqlx::query_as::<_, HoldRow>(&format!(
            "DELETE FROM seat_holds WHERE id = $1 RETURNING {}",
            HOLD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::internal)?
        else {
            return Ok(None);
        };
        let hold = row.into_hold();

        let session = sqlx::query_as::<_, SessionRow>(RESTORE_SEATS_SQL)
            .bind(hold.session_id)
            .bind(hold.seats_count)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::internal)?
            .ok_or_else(|| Error::Internal("hold references a missing session".into()))?
            .into_session()?;

        tx.commit().await.map_err(Error::internal)?;

        Ok(Some((hold, session)))
    }

    async fn convert_hold(
        &self,
        id: Uuid,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Booking, Session)> {
        let mut tx = self.pool.begin().await.map_err(Error::internal)?;

        let hold = delete_live_hold(&mut tx, id, now).await?;

        let booking = Booking {
            id: booking_id,
            session_id: hold.session_id,
            passenger_id: hold.passenger_id,
            seats_count: hold.seats_count,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        insert_booking(&mut tx, &booking).await?;

        let session = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(hold.session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::internal)?
        .ok_or_else(|| Error::Internal("hold references a missing session".into()))?
        .into_session()?;

        tx.commit().await.map_err(Error::internal)?;

        Ok((booking, session))
    }

    async fn expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<SeatHold>> {
        let rows = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM seat_holds WHERE expires_at < $1 ORDER BY expires_at",
            HOLD_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::internal)?;

        Ok(rows.into_iter().map(HoldRow::into_hold).collect())
    }
}

/// Deletes a hold only while it is unexpired, distinguishing "expired" from
/// "gone" for the caller.
async fn delete_live_hold(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<SeatHold> {
    let deleted = sqlx::query_as::<_, HoldRow>(&format!(
        "DELETE FROM seat_holds WHERE id = $1 AND expires_at > $2 RETURNING {}",
        HOLD_COLUMNS
    ))
    .bind(id)
    .bind(now)
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::internal)?;

    if let Some(row) = deleted {
        return Ok(row.into_hold());
    }

    let still_there = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM seat_holds WHERE id = $1")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::internal)?;

    if still_there > 0 {
        Err(Error::Conflict("Hold has expired".into()))
    } else {
        Err(Error::NotFound("Hold not found or expired".into()))
    }
}

async fn insert_booking(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    booking: &Booking,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bookings (id, session_id, passenger_id, seats_count, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(booking.id)
    .bind(booking.session_id)
    .bind(booking.passenger_id)
    .bind(booking.seats_count)
    .bind(booking.status.as_str())
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(Error::internal)?;

    Ok(())
}

#[async_trait]
impl BookingStore for PostgresStore {
    async fn booking(&self, id: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn passenger_bookings(
        &self,
        passenger_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {}
            FROM bookings
            WHERE passenger_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            BOOKING_COLUMNS
        ))
        .bind(passenger_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::internal)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn cancel_booking(&self, id: Uuid) -> Result<(Booking, Session)> {
        let mut tx = self.pool.begin().await.map_err(Error::internal)?;

        let booking = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::internal)?
        .ok_or_else(|| Error::NotFound("Booking not found".into()))?
        .into_booking()?;

        if !matches!(
            booking.status,
            BookingStatus::Confirmed | BookingStatus::Pending
        ) {
            return Err(Error::Conflict("Cannot cancel this booking".into()));
        }

        let booking = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'CANCELLED', updated_at = NOW() WHERE id = $1 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::internal)?
        .into_booking()?;

        let session = sqlx::query_as::<_, SessionRow>(RESTORE_SEATS_SQL)
            .bind(booking.session_id)
            .bind(booking.seats_count)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::internal)?
            .ok_or_else(|| Error::Internal("booking references a missing session".into()))?
            .into_session()?;

        tx.commit().await.map_err(Error::internal)?;

        Ok((booking, session))
    }
}

#[async_trait]
impl PaymentStore for PostgresStore {
    async fn payment(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn payment_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<(Payment, Booking)>> {
        let Some(row) = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE idempotency_key = $1",
            PAYMENT_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?
        else {
            return Ok(None);
        };
        let payment = row.into_payment()?;

        let booking = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(payment.booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?
        .ok_or_else(|| Error::Internal("payment references a missing booking".into()))?
        .into_booking()?;

        Ok(Some((payment, booking)))
    }

    async fn passenger_payments(&self, passenger_id: Uuid) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT p.id, p.booking_id, p.fare_amount, p.service_fee, p.total_amount, p.method, p.status, p.idempotency_key, p.gateway_reference, p.created_at, p.updated_at
            FROM payments p
            JOIN bookings b ON b.id = p.booking_id
            WHERE b.passenger_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(passenger_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::internal)?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn finalize_payment(
        &self,
        hold_id: Uuid,
        now: DateTime<Utc>,
        booking: &Booking,
        payment: &Payment,
    ) -> Result<PaymentRecord> {
        let mut tx = self.pool.begin().await.map_err(Error::internal)?;

        if let Err(err) = delete_live_hold(&mut tx, hold_id, now).await {
            drop(tx);
            // A same-key rival may have consumed the hold already; its
            // stored record is the canonical outcome for this key.
            if matches!(err, Error::NotFound(_)) {
                if let Some((payment, booking)) = self
                    .payment_by_idempotency_key(&payment.idempotency_key)
                    .await?
                {
                    return Ok(PaymentRecord {
                        payment,
                        booking,
                        replayed: true,
                    });
                }
            }
            return Err(err);
        }
        insert_booking(&mut tx, booking).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, fare_amount, service_fee, total_amount, method, status, idempotency_key, gateway_reference, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.fare_amount)
        .bind(payment.service_fee)
        .bind(payment.total_amount)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.idempotency_key)
        .bind(&payment.gateway_reference)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                // Lost a same-key race: roll back and hand over the winner's
                // record so the caller sees the original result.
                drop(tx);
                if let Some((payment, booking)) = self
                    .payment_by_idempotency_key(&payment.idempotency_key)
                    .await?
                {
                    return Ok(PaymentRecord {
                        payment,
                        booking,
                        replayed: true,
                    });
                }
            }
            return Err(Error::internal(err));
        }

        tx.commit().await.map_err(Error::internal)?;

        Ok(PaymentRecord {
            payment: payment.clone(),
            booking: booking.clone(),
            replayed: false,
        })
    }

    async fn refund_payment(&self, id: Uuid) -> Result<(Payment, Booking, Session)> {
        let mut tx = self.pool.begin().await.map_err(Error::internal)?;

        let payment = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE id = $1 FOR UPDATE",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::internal)?
        .ok_or_else(|| Error::NotFound("Payment not found".into()))?
        .into_payment()?;

        if payment.status != PaymentStatus::Success {
            return Err(Error::Conflict(
                "Can only refund successful payments".into(),
            ));
        }

        let payment = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments SET status = 'REFUNDED', updated_at = NOW() WHERE id = $1 RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::internal)?
        .into_payment()?;

        let booking = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'CANCELLED', updated_at = NOW() WHERE id = $1 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(payment.booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::internal)?
        .ok_or_else(|| Error::Internal("payment references a missing booking".into()))?
        .into_booking()?;

        let session = sqlx::query_as::<_, SessionRow>(RESTORE_SEATS_SQL)
            .bind(booking.session_id)
            .bind(booking.seats_count)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::internal)?
            .ok_or_else(|| Error::Internal("booking references a missing session".into()))?
            .into_session()?;

        tx.commit().await.map_err(Error::internal)?;

        Ok((payment, booking, session))
    }
}

#[async_trait]
impl RouteStore for PostgresStore {
    async fn route(&self, id: Uuid) -> Result<Option<Route>> {
        let row = sqlx::query_as::<_, RouteRow>(
            "SELECT id, origin, destination, base_fare, is_active FROM routes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?;

        Ok(row.map(|r| Route {
            id: r.id,
            origin: r.origin,
            destination: r.destination,
            base_fare: r.base_fare,
            is_active: r.is_active,
        }))
    }

    async fn station(&self, id: Uuid) -> Result<Option<Station>> {
        let row = sqlx::query_as::<_, StationRow>(
            "SELECT id, name, is_active FROM stations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::internal)?;

        Ok(row.map(|s| Station {
            id: s.id,
            name: s.name,
            is_active: s.is_active,
        }))
    }
}
