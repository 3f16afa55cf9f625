use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use veyra_core::booking::{
    Booking, BookingStatus, Payment, PaymentMethod, PaymentRecord, PaymentStatus,
};
use veyra_core::ports::{
    AuditRecord, AuditSink, EventProducer, HoldCache, NotificationKind, NotificationSink,
    RealtimeGateway,
};
use veyra_core::repository::{HoldStore, PaymentStore, RouteStore, SessionStore};
use veyra_core::{Error, Result};
use veyra_shared::models::events::PaymentSucceededEvent;

use crate::holds::HoldManager;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProcessPayment {
    pub hold_id: Uuid,
    pub idempotency_key: String,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub gateway_reference: Option<String>,
}

/// Converts a still-valid hold into a booking + payment pair, exactly once
/// per idempotency key. The seat counter never moves here: the hold already
/// paid for the seats at creation time.
pub struct PaymentFinalizer {
    holds: Arc<HoldManager>,
    hold_store: Arc<dyn HoldStore>,
    sessions: Arc<dyn SessionStore>,
    payments: Arc<dyn PaymentStore>,
    routes: Arc<dyn RouteStore>,
    cache: Arc<dyn HoldCache>,
    events: Arc<dyn EventProducer>,
    realtime: Arc<dyn RealtimeGateway>,
    audit: Arc<dyn AuditSink>,
    notifications: Arc<dyn NotificationSink>,
    service_fee_per_seat: i32,
}

impl PaymentFinalizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        holds: Arc<HoldManager>,
        hold_store: Arc<dyn HoldStore>,
        sessions: Arc<dyn SessionStore>,
        payments: Arc<dyn PaymentStore>,
        routes: Arc<dyn RouteStore>,
        cache: Arc<dyn HoldCache>,
        events: Arc<dyn EventProducer>,
        realtime: Arc<dyn RealtimeGateway>,
        audit: Arc<dyn AuditSink>,
        notifications: Arc<dyn NotificationSink>,
        service_fee_per_seat: i32,
    ) -> Self {
        Self {
            holds,
            hold_store,
            sessions,
            payments,
            routes,
            cache,
            events,
            realtime,
            audit,
            notifications,
            service_fee_per_seat,
        }
    }

    pub async fn process_payment(
        &self,
        passenger_id: Uuid,
        req: ProcessPayment,
    ) -> Result<PaymentRecord> {
        // Idempotency gate: a replayed key returns the stored outcome and
        // re-runs nothing.
        if let Some((payment, booking)) = self
            .payments
            .payment_by_idempotency_key(&req.idempotency_key)
            .await?
        {
            return Ok(PaymentRecord {
                payment,
                booking,
                replayed: true,
            });
        }

        let hold = self
            .hold_store
            .hold(req.hold_id)
            .await?
            .ok_or_else(|| Error::NotFound("Hold not found or expired".into()))?;

        if hold.passenger_id != passenger_id {
            return Err(Error::Conflict("Hold does not belong to this user".into()));
        }

        if hold.is_expired(Utc::now()) {
            self.holds.release_hold(req.hold_id).await?;
            return Err(Error::Conflict("Hold has expired".into()));
        }

        let session = self
            .sessions
            .session(hold.session_id)
            .await?
            .ok_or_else(|| Error::NotFound("Session not found".into()))?;
        let route = self
            .routes
            .route(session.route_id)
            .await?
            .ok_or_else(|| Error::NotFound("Route not found".into()))?;

        let fare_amount = route.base_fare * hold.seats_count;
        let service_fee = self.service_fee_per_seat * hold.seats_count;
        let total_amount = fare_amount + service_fee;

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            session_id: hold.session_id,
            passenger_id,
            seats_count: hold.seats_count,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            fare_amount,
            service_fee,
            total_amount,
            method: req.method.unwrap_or(PaymentMethod::Cash),
            status: PaymentStatus::Success,
            idempotency_key: req.idempotency_key.clone(),
            gateway_reference: req.gateway_reference.clone(),
            created_at: now,
            updated_at: now,
        };

        let record = self
            .payments
            .finalize_payment(hold.id, now, &booking, &payment)
            .await?;

        self.cache.remove(hold.id).await;

        if record.replayed {
            // Lost a same-key race; the winner already ran the side effects.
            return Ok(record);
        }

        self.audit
            .record(AuditRecord {
                actor_id: passenger_id,
                action: "PAYMENT_SUCCESS".into(),
                entity: "Payment".into(),
                entity_id: record.payment.id.to_string(),
                before: None,
                after: Some(serde_json::json!({
                    "bookingId": record.payment.booking_id,
                    "totalAmount": record.payment.total_amount,
                    "method": record.payment.method,
                })),
            })
            .await;

        self.notifications
            .notify(
                passenger_id,
                NotificationKind::PaymentSuccess,
                serde_json::json!({
                    "paymentId": record.payment.id,
                    "bookingId": record.payment.booking_id,
                    "amount": record.payment.total_amount,
                }),
            )
            .await;

        self.realtime
            .payment_success(record.booking.session_id, &record.payment);

        let event = PaymentSucceededEvent {
            payment_id: record.payment.id,
            booking_id: record.payment.booking_id,
            session_id: record.booking.session_id,
            total_amount: record.payment.total_amount,
            settled_at: now.timestamp(),
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = self
                .events
                .publish(
                    "payments.succeeded",
                    &record.booking.session_id.to_string(),
                    &payload,
                )
                .await;
        }

        Ok(record)
    }

    /// Reverses a successful payment: payment REFUNDED, booking CANCELLED,
    /// seats back on the session.
    pub async fn refund_payment(&self, payment_id: Uuid, actor_id: Uuid) -> Result<Payment> {
        let (payment, booking, session) = self.payments.refund_payment(payment_id).await?;

        self.realtime.seat_released(&session, booking.seats_count);

        self.audit
            .record(AuditRecord {
                actor_id,
                action: "PAYMENT_REFUNDED".into(),
                entity: "Payment".into(),
                entity_id: payment.id.to_string(),
                before: Some(serde_json::json!({ "status": PaymentStatus::Success })),
                after: Some(serde_json::json!({ "status": PaymentStatus::Refunded })),
            })
            .await;

        Ok(payment)
    }

    pub async fn payment(&self, payment_id: Uuid) -> Result<Payment> {
        self.payments
            .payment(payment_id)
            .await?
            .ok_or_else(|| Error::NotFound("Payment not found".into()))
    }

    pub async fn passenger_payments(&self, passenger_id: Uuid) -> Result<Vec<Payment>> {
        self.payments.passenger_payments(passenger_id).await
    }
}
