use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use veyra_core::repository::HoldStore;
use veyra_core::Result;

use crate::holds::HoldManager;

/// Periodic sweep returning expired holds to inventory. Releasing is
/// idempotent at the storage layer, so the reaper is safe to run
/// concurrently with itself and with live hold traffic.
pub struct ExpiryReaper {
    holds: Arc<HoldManager>,
    store: Arc<dyn HoldStore>,
    interval: Duration,
}

impl ExpiryReaper {
    pub fn new(holds: Arc<HoldManager>, store: Arc<dyn HoldStore>, interval: Duration) -> Self {
        Self {
            holds,
            store,
            interval,
        }
    }

    /// Releases every hold past its expiry; returns how many this sweep
    /// actually reclaimed. Holds another sweep got to first count as zero.
    pub async fn reclaim_expired(&self) -> Result<u64> {
        let expired = self.store.expired_holds(Utc::now()).await?;

        let mut cleaned = 0u64;
        for hold in expired {
            match self.holds.release_hold(hold.id).await {
                Ok(Some(_)) => cleaned += 1,
                Ok(None) => {}
                Err(err) => {
                    warn!(hold_id = %hold.id, error = %err, "failed to reclaim expired hold");
                }
            }
        }

        Ok(cleaned)
    }

    /// Long-running sweep loop; spawn from main.
    pub async fn run(self: Arc<Self>) {
        info!(interval_secs = self.interval.as_secs(), "expiry reaper started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.reclaim_expired().await {
                Ok(0) => {}
                Ok(reclaimed) => info!(reclaimed, "expiry sweep reclaimed holds"),
                Err(err) => error!(error = %err, "expiry sweep failed"),
            }
        }
    }
}
