//! Snapshot broadcast loop.
//!
//! Publishes the latest sector picture to subscribers on a fixed cadence.
//! The snapshot is a plain value; whatever transport carries it to clients
//! lives outside this crate.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use crate::state::AppState;

pub async fn run_broadcast_loop(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(Duration::from_secs(state.config.broadcast_interval_secs));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Broadcast loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = state.publish_snapshot();
                tracing::trace!(
                    "Published snapshot: {} aircraft, {} alert(s)",
                    snapshot.aircraft.len(),
                    snapshot.alerts.len()
                );
            }
        }
    }
}
