use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use veyra_core::booking::Payment;
use veyra_core::ports::RealtimeGateway;
use veyra_core::session::{Session, SessionStatus};
use veyra_shared::models::events::{PaymentSettled, RealtimeEvent, SeatCountChange};

use crate::state::AppState;

/// In-process fan-out over a broadcast channel; SSE handlers subscribe and
/// filter per session or driver. Sends to a channel with no subscribers are
/// fine, that is just an empty room.
pub struct BroadcastRealtime {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl BroadcastRealtime {
    pub fn new(tx: broadcast::Sender<RealtimeEvent>) -> Self {
        Self { tx }
    }
}

impl RealtimeGateway for BroadcastRealtime {
    fn session_updated(&self, session: &Session) {
        let _ = self.tx.send(RealtimeEvent::SessionUpdated(session.snapshot()));
    }

    fn seat_booked(&self, session: &Session, seats_count: i32) {
        let _ = self.tx.send(RealtimeEvent::SeatBooked(SeatCountChange {
            session_id: session.id,
            seats_count,
            available_seats: session.available_seats,
        }));

        if session.status == SessionStatus::Full {
            let _ = self.tx.send(RealtimeEvent::SessionFull {
                session_id: session.id,
            });
        }
    }

    fn seat_released(&self, session: &Session, seats_count: i32) {
        let _ = self.tx.send(RealtimeEvent::SeatReleased(SeatCountChange {
            session_id: session.id,
            seats_count,
            available_seats: session.available_seats,
        }));
    }

    fn payment_success(&self, session_id: Uuid, payment: &Payment) {
        let _ = self.tx.send(RealtimeEvent::PaymentSuccess(PaymentSettled {
            session_id,
            payment_id: payment.id,
            booking_id: payment.booking_id,
            amount: payment.total_amount,
        }));
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/sessions/{id}/stream", get(session_stream))
        .route("/v1/drivers/{id}/stream", get(driver_stream))
}

fn sse_event(event: &RealtimeEvent) -> Option<Result<Event, Infallible>> {
    let data = serde_json::to_string(event).ok()?;
    Some(Ok(Event::default().event(event.name()).data(data)))
}

/// GET /v1/sessions/{id}/stream
async fn session_stream(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.realtime_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.session_id() == session_id => sse_event(&event),
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /v1/drivers/{id}/stream
async fn driver_stream(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.realtime_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.driver_id() == Some(driver_id) => sse_event(&event),
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
