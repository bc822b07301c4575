//! Periodic tick that requeues jobs whose backoff has elapsed. Single
//! loop, ticks never overlap; if a tick runs long the next one starts
//! immediately after (fixed delay, not fixed rate).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::coordinator::QueueCoordinator;
use crate::job::now_local;

pub async fn run(coordinator: Arc<QueueCoordinator>, interval: Duration) {
    loop {
        match coordinator.process_retries(now_local()).await {
            Ok(0) => {}
            Ok(n) => debug!("retry scheduler requeued {n} job(s)"),
            Err(e) => error!("retry scheduler tick failed: {e}"),
        }
        tokio::time::sleep(interval).await;
    }
}
