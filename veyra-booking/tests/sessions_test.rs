mod support;

use uuid::Uuid;
use veyra_booking::{CreateHold, StartSession};
use veyra_core::session::SessionStatus;
use veyra_core::Error;

use support::engine;

#[tokio::test]
async fn start_session_opens_a_full_pool() {
    let eng = engine();
    let route = eng.store.seed_route(500);
    let station = eng.store.seed_station();
    let driver = Uuid::new_v4();

    let session = eng
        .sessions
        .start_session(
            driver,
            StartSession {
                route_id: route,
                station_id: station,
                total_seats: 14,
            },
        )
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.available_seats, 14);
    assert_eq!(session.total_seats, 14);

    // One active session per driver.
    let err = eng
        .sessions
        .start_session(
            driver,
            StartSession {
                route_id: route,
                station_id: station,
                total_seats: 14,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(msg) if msg == "Driver already has an active session"));
}

#[tokio::test]
async fn start_session_requires_live_route_and_station() {
    let eng = engine();
    let route = eng.store.seed_route(500);
    let station = eng.store.seed_station();

    let err = eng
        .sessions
        .start_session(
            Uuid::new_v4(),
            StartSession {
                route_id: Uuid::new_v4(),
                station_id: station,
                total_seats: 10,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(msg) if msg == "Route not found or inactive"));

    let err = eng
        .sessions
        .start_session(
            Uuid::new_v4(),
            StartSession {
                route_id: route,
                station_id: Uuid::new_v4(),
                total_seats: 10,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(msg) if msg == "Station not found or inactive"));
}

#[tokio::test]
async fn close_session_is_owner_only_and_terminal() {
    let eng = engine();
    let route = eng.store.seed_route(500);
    let station = eng.store.seed_station();
    let driver = Uuid::new_v4();

    let session = eng
        .sessions
        .start_session(
            driver,
            StartSession {
                route_id: route,
                station_id: station,
                total_seats: 10,
            },
        )
        .await
        .unwrap();

    let err = eng
        .sessions
        .close_session(session.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let closed = eng.sessions.close_session(session.id, driver).await.unwrap();
    assert_eq!(closed.status, SessionStatus::Closed);
    assert!(closed.ended_at.is_some());

    let err = eng
        .sessions
        .close_session(session.id, driver)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(msg) if msg == "Session already closed"));
}

#[tokio::test]
async fn cancel_session_refuses_confirmed_bookings_and_drops_holds() {
    let eng = engine();
    let route = eng.store.seed_route(500);
    let station = eng.store.seed_station();
    let driver = Uuid::new_v4();

    let session = eng
        .sessions
        .start_session(
            driver,
            StartSession {
                route_id: route,
                station_id: station,
                total_seats: 10,
            },
        )
        .await
        .unwrap();

    // A confirmed booking pins the session open.
    let passenger = Uuid::new_v4();
    let receipt = eng
        .holds
        .create_hold(
            passenger,
            CreateHold {
                session_id: session.id,
                seats_count: 2,
            },
        )
        .await
        .unwrap();
    let booking = eng
        .holds
        .convert_hold_to_booking(receipt.hold_id, passenger)
        .await
        .unwrap();

    let err = eng
        .sessions
        .cancel_session(session.id, driver)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(msg) if msg == "Cannot cancel session with confirmed bookings"));

    // With the booking gone, cancellation drops the remaining holds too.
    eng.holds.cancel_booking(booking.id, passenger).await.unwrap();
    eng.holds
        .create_hold(
            Uuid::new_v4(),
            CreateHold {
                session_id: session.id,
                seats_count: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(eng.store.hold_count(session.id), 1);

    let cancelled = eng
        .sessions
        .cancel_session(session.id, driver)
        .await
        .unwrap();
    assert_eq!(cancelled.status, SessionStatus::Cancelled);
    assert_eq!(eng.store.hold_count(session.id), 0);

    // Terminal sessions take no new holds.
    let err = eng
        .holds
        .create_hold(
            Uuid::new_v4(),
            CreateHold {
                session_id: session.id,
                seats_count: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(msg) if msg == "Session is not active"));
}

#[tokio::test]
async fn active_session_listing_filters_by_route_and_station() {
    let eng = engine();
    let route_a = eng.store.seed_route(500);
    let route_b = eng.store.seed_route(700);
    let station = eng.store.seed_station();

    let a = eng.store.seed_session(route_a, station, 10);
    let _b = eng.store.seed_session(route_b, station, 10);

    let all = eng.sessions.active_sessions(None, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let only_a = eng
        .sessions
        .active_sessions(Some(route_a), None)
        .await
        .unwrap();
    assert_eq!(only_a.len(), 1);
    assert_eq!(only_a[0].id, a);

    let none = eng
        .sessions
        .active_sessions(Some(Uuid::new_v4()), None)
        .await
        .unwrap();
    assert!(none.is_empty());
}
