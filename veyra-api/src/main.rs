use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use veyra_api::state::{AppState, AuthConfig};
use veyra_api::{app, realtime::BroadcastRealtime};
use veyra_booking::{ExpiryReaper, HoldManager, HoldPolicy, PaymentFinalizer, SessionManager};
use veyra_store::{
    DbClient, KafkaProducer, PostgresAuditSink, PostgresNotificationSink, PostgresStore,
    RedisClient, RedisHoldCache, RedisLockService,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veyra_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = veyra_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Veyra API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let redis = RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");
    let redis_arc = Arc::new(redis.clone());

    let kafka = Arc::new(
        KafkaProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer"),
    );

    let store = Arc::new(PostgresStore::new(db.pool.clone()));
    let locks = Arc::new(RedisLockService::new(redis.clone()));
    let cache = Arc::new(RedisHoldCache::new(redis));
    let audit = Arc::new(PostgresAuditSink::new(db.pool.clone()));
    let notifications = Arc::new(PostgresNotificationSink::new(db.pool.clone()));

    let (realtime_tx, _) = tokio::sync::broadcast::channel(256);
    let realtime = Arc::new(BroadcastRealtime::new(realtime_tx.clone()));

    let rules = &config.business_rules;
    let policy = HoldPolicy {
        hold_ttl: Duration::from_secs(rules.hold_ttl_seconds),
        lock_ttl: Duration::from_secs(rules.lock_ttl_seconds),
        max_seats_per_hold: rules.max_seats_per_hold,
        service_fee_per_seat: rules.service_fee_per_seat,
        lock_failure_policy: rules.lock_failure_policy,
    };

    let holds = Arc::new(HoldManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
        locks,
        cache.clone(),
        kafka.clone(),
        realtime.clone(),
        policy,
    ));

    let payments = Arc::new(PaymentFinalizer::new(
        holds.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cache,
        kafka,
        realtime.clone(),
        audit,
        notifications,
        rules.service_fee_per_seat,
    ));

    let sessions = Arc::new(SessionManager::new(store.clone(), store.clone(), realtime));

    let reaper = Arc::new(ExpiryReaper::new(
        holds.clone(),
        store,
        Duration::from_secs(rules.reaper_interval_seconds),
    ));
    tokio::spawn(reaper.clone().run());

    let app_state = AppState {
        redis: redis_arc,
        holds,
        payments,
        sessions,
        reaper,
        realtime_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
