//! Explicit application context threaded through CLI commands. No
//! process-wide mutable statics - one `App` is built per invocation (or
//! once at daemon startup) from a `Config` and a data-file path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::coordinator::QueueCoordinator;
use crate::dead_letter::DeadLetterManager;
use crate::error::Result;
use crate::job_store::JobStore;
use crate::pending_channel::PendingChannel;
use crate::worker_pool::WorkerPool;

pub struct App {
    pub config: Config,
    pub store: Arc<JobStore>,
    pub coordinator: Arc<QueueCoordinator>,
    pub dlq: DeadLetterManager,
    pub pool: Arc<WorkerPool>,
}

impl App {
    pub fn new(config: Config, data_path: PathBuf) -> Result<Self> {
        let store = Arc::new(JobStore::load(&data_path)?);
        let channel = Arc::new(PendingChannel::new());
        let coordinator = Arc::new(QueueCoordinator::new(
            store.clone(),
            channel,
            config.backoff_base,
        ));
        let dlq = DeadLetterManager::new(store.clone(), coordinator.clone());
        let pool = Arc::new(WorkerPool::new(
            coordinator.clone(),
            Duration::from_secs(config.job_timeout_seconds),
            Duration::from_secs(config.retry_check_interval_seconds),
        ));

        Ok(Self {
            config,
            store,
            coordinator,
            dlq,
            pool,
        })
    }
}
