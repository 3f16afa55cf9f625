pub mod app_config;
pub mod audit;
pub mod database;
pub mod events;
pub mod postgres;
pub mod redis_repo;

pub use audit::{PostgresAuditSink, PostgresNotificationSink};
pub use database::DbClient;
pub use events::KafkaProducer;
pub use postgres::PostgresStore;
pub use redis_repo::{RedisClient, RedisHoldCache, RedisLockService};
