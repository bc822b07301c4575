//! Owns N workers plus the periodic retry tick. Graceful shutdown: once
//! `stop()` returns, no new job will transition to PROCESSING, and every
//! worker either finished its current job or was forcibly terminated
//! after the grace window.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::coordinator::QueueCoordinator;
use crate::executor::JobExecutor;
use crate::job::JobState;
use crate::{retry_scheduler, worker};

const STOP_GRACE_WORKERS: Duration = Duration::from_secs(30);
const STOP_GRACE_TICKER: Duration = Duration::from_secs(5);

struct WorkerHandle {
    id: String,
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub id: String,
    pub running: bool,
    pub shutdown_requested: bool,
}

pub struct WorkerPool {
    coordinator: Arc<QueueCoordinator>,
    executor: Arc<JobExecutor>,
    job_timeout: Duration,
    retry_interval: Duration,
    running: AtomicBool,
    next_worker_id: AtomicUsize,
    workers: tokio::sync::Mutex<Vec<WorkerHandle>>,
    ticker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(
        coordinator: Arc<QueueCoordinator>,
        job_timeout: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            executor: Arc::new(JobExecutor::new()),
            job_timeout,
            retry_interval,
            running: AtomicBool::new(false),
            next_worker_id: AtomicUsize::new(0),
            workers: tokio::sync::Mutex::new(Vec::new()),
            ticker: tokio::sync::Mutex::new(None),
        }
    }

    /// Idempotent-by-flag: a second `start` while already running is a
    /// no-op with a warning.
    pub async fn start(&self, n: u32) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("worker pool already running, ignoring start({n})");
            return;
        }

        info!("starting worker pool with {n} worker(s)");
        self.offer_persisted_pending().await;
        self.spawn_workers(n).await;

        let coordinator = self.coordinator.clone();
        let interval = self.retry_interval;
        let ticker = tokio::spawn(async move {
            retry_scheduler::run(coordinator, interval).await;
        });
        *self.ticker.lock().await = Some(ticker);
    }

    /// A CLI invocation that enqueues (or crash-recovery reconciliation on
    /// load) builds its own short-lived `PendingChannel`, which never
    /// reaches whatever later process runs `worker start`. Re-offer every
    /// PENDING record already durable in the Store so it actually gets
    /// picked up by this pool rather than sitting on disk forever.
    async fn offer_persisted_pending(&self) {
        let pending = self.coordinator.store().list_by_state(JobState::Pending);
        if pending.is_empty() {
            return;
        }
        info!("offering {} persisted pending job(s) to the pool", pending.len());
        for job in pending {
            self.coordinator.channel().offer(job.snapshot()).await;
        }
    }

    /// Only valid while running; shares the Channel with existing workers.
    pub async fn add_workers(&self, k: u32) {
        if !self.running.load(Ordering::SeqCst) {
            warn!("add_workers called while pool is not running, ignoring");
            return;
        }
        self.spawn_workers(k).await;
    }

    async fn spawn_workers(&self, n: u32) {
        let mut workers = self.workers.lock().await;
        for _ in 0..n {
            let id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);
            let worker_id = format!("worker-{id}");
            let shutdown = Arc::new(AtomicBool::new(false));
            let shutdown_clone = shutdown.clone();
            let coordinator = self.coordinator.clone();
            let executor = self.executor.clone();
            let job_timeout = self.job_timeout;
            let label = worker_id.clone();

            let handle = tokio::spawn(async move {
                worker::run(&label, coordinator, executor, job_timeout, shutdown_clone).await;
            });

            workers.push(WorkerHandle {
                id: worker_id,
                shutdown,
                handle,
            });
        }
    }

    /// Signals shutdown to all workers and the ticker, then waits up to a
    /// single shared 30s budget for every worker (not 30s per worker) and
    /// 5s for the ticker. Forces termination on timeout.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let entries: Vec<WorkerHandle> = {
            let mut workers = self.workers.lock().await;
            for w in workers.iter() {
                w.shutdown.store(true, Ordering::Relaxed);
            }
            workers.drain(..).collect()
        };

        let abort_handles: Vec<(String, tokio::task::AbortHandle)> = entries
            .iter()
            .map(|w| (w.id.clone(), w.handle.abort_handle()))
            .collect();

        let join_all = async {
            for w in entries {
                match w.handle.await {
                    Ok(()) => {}
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!("worker '{}' task panicked: {e}", w.id),
                }
            }
        };

        if tokio::time::timeout(STOP_GRACE_WORKERS, join_all)
            .await
            .is_err()
        {
            warn!(
                "worker pool did not fully stop within the {}s grace window, forcing termination",
                STOP_GRACE_WORKERS.as_secs()
            );
            for (id, handle) in abort_handles {
                if !handle.is_finished() {
                    warn!("forcing termination of worker '{id}'");
                }
                handle.abort();
            }
        }

        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.abort();
            let _ = tokio::time::timeout(STOP_GRACE_TICKER, ticker).await;
        }

        info!("worker pool stopped");
    }

    pub async fn status(&self) -> Vec<WorkerStatus> {
        self.workers
            .lock()
            .await
            .iter()
            .map(|w| WorkerStatus {
                id: w.id.clone(),
                running: self.running.load(Ordering::SeqCst),
                shutdown_requested: w.shutdown.load(Ordering::Relaxed),
            })
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
