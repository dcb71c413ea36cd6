use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::manifest_refresh_interval;
use crate::state::AppState;

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(manifest_refresh_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; startup already synced the manifest.
    interval.tick().await;

    loop {
        interval.tick().await;
        refresh(&state).await;
    }
}

async fn refresh(state: &AppState) {
    let result = state.coordinator.sync_manifest(None).await;
    state.observability.record_manifest_sync(result.is_ok());
    match result {
        Ok(0) => {}
        Ok(count) => info!(entries = count, "manifest refreshed"),
        Err(e) => warn!(error = %e, "manifest refresh failed"),
    }
}
