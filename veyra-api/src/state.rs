use std::sync::Arc;

use tokio::sync::broadcast;
use veyra_booking::{ExpiryReaper, HoldManager, PaymentFinalizer, SessionManager};
use veyra_shared::models::events::RealtimeEvent;
use veyra_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub redis: Arc<RedisClient>,
    pub holds: Arc<HoldManager>,
    pub payments: Arc<PaymentFinalizer>,
    pub sessions: Arc<SessionManager>,
    pub reaper: Arc<ExpiryReaper>,
    pub realtime_tx: broadcast::Sender<RealtimeEvent>,
    pub auth: AuthConfig,
}
