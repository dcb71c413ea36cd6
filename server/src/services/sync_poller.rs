use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::sync_poll_interval;
use crate::state::AppState;

/// Periodic `sync_details(false)`. The startup sync is done by `main`, so the first tick waits a full period.
pub async fn run(state: AppState) {
    let period = sync_poll_interval();
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        poll_once(&state).await;
    }
}

async fn poll_once(state: &AppState) {
    if state.coordinator.is_syncing() {
        debug!("sync already in flight; skipping poll");
        return;
    }

    let result = state.coordinator.sync_details(false).await;
    state.observability.record_sync(result.is_ok());
    if let Err(e) = result {
        warn!(error = %e, "periodic dispatch sync failed");
    }
}
