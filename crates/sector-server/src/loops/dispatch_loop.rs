//! Transmission dispatch loop.
//!
//! Drains the dispatch queue at a fast cadence. The dispatcher holds the
//! queue lock only to pop; the acknowledgment wait suspends this loop without
//! blocking enqueues from the surveillance loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use crate::dispatch::Dispatcher;

const LOOP_INTERVAL_SECS: u64 = 1;

pub async fn run_dispatch_loop(dispatcher: Arc<Dispatcher>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(Duration::from_secs(LOOP_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Dispatch loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                // One transmission per pass; an in-flight send is never
                // aborted by shutdown, only the next iteration is skipped.
                dispatcher.drive_next().await;
            }
        }
    }
}
