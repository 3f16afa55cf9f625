use serde::Deserialize;
use std::env;
use veyra_core::ports::LockFailurePolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_seconds: u64,
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
    #[serde(default = "default_max_seats")]
    pub max_seats_per_hold: i32,
    /// Per-seat service fee in minor units.
    pub service_fee_per_seat: i32,
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_seconds: u64,
    /// What `createHold` does when the lock backend is unreachable; see
    /// `LockFailurePolicy`.
    #[serde(default)]
    pub lock_failure_policy: LockFailurePolicy,
}

fn default_hold_ttl() -> u64 {
    300
}

fn default_lock_ttl() -> u64 {
    10
}

fn default_max_seats() -> i32 {
    10
}

fn default_reaper_interval() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment file is optional; development is the default.
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in.
            .add_source(config::File::with_name("config/local").required(false))
            // `VEYRA__BUSINESS_RULES__HOLD_TTL_SECONDS=60` style overrides.
            .add_source(config::Environment::with_prefix("VEYRA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
