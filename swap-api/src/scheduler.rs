//! Periodic batch optimization

use std::sync::Arc;
use std::time::Duration;
use swap_core::SwapError;
use swap_services::BatchOptimizer;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Run the optimizer every `period`, first run one period after startup
pub fn spawn_batch_scheduler(optimizer: Arc<BatchOptimizer>, period: Duration) -> JoinHandle<()> {
    info!("Batch scheduler running every {}s", period.as_secs());

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            let job = Arc::clone(&optimizer);
            match tokio::task::spawn_blocking(move || job.run()).await {
                Ok(Ok(stats)) => info!(
                    "Scheduled batch finished: {} users, {} two-way, {} three-way",
                    stats.users_processed, stats.two_way_opportunities, stats.three_way_cycles
                ),
                Ok(Err(SwapError::BatchInProgress)) => {
                    warn!("Skipping scheduled batch, a run is already in progress")
                }
                Ok(Err(e)) => error!("Scheduled batch failed: {}", e),
                Err(e) => error!("Scheduled batch task panicked: {}", e),
            }
        }
    })
}
