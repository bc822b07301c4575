//! A single worker: pulls from the Pending Channel, invokes the Executor,
//! reports the outcome to the Coordinator. Workers are interchangeable and
//! stateless beyond their human-readable id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::coordinator::QueueCoordinator;
use crate::executor::{ExecutionOutcome, JobExecutor};

const DEQUEUE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs until `shutdown` is observed true between iterations. In-flight
/// execution is never interrupted by shutdown - it runs to its own
/// `job_timeout` or natural completion.
pub async fn run(
    worker_id: &str,
    coordinator: Arc<QueueCoordinator>,
    executor: Arc<JobExecutor>,
    job_timeout: Duration,
    shutdown: Arc<AtomicBool>,
) {
    info!("worker '{worker_id}' starting");
    while !shutdown.load(Ordering::Relaxed) {
        let snapshot = match coordinator.dequeue(DEQUEUE_POLL_INTERVAL).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => continue,
            Err(e) => {
                warn!("worker '{worker_id}' dequeue error: {e}");
                continue;
            }
        };

        debug!(
            "worker '{worker_id}' claimed job {} ({})",
            snapshot.id, snapshot.command
        );

        let outcome = executor.execute(&snapshot.command, job_timeout).await;

        let report = match outcome {
            ExecutionOutcome::Success { .. } => coordinator.complete(snapshot.id).await,
            ExecutionOutcome::Failure { reason } => coordinator.fail(snapshot.id, reason).await,
        };

        if let Err(e) = report {
            error!(
                "worker '{worker_id}' failed to record outcome for job {}: {e}",
                snapshot.id
            );
        }
    }
    info!("worker '{worker_id}' shut down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;
    use crate::job_store::JobStore;
    use crate::pending_channel::PendingChannel;
    use uuid::Uuid;

    fn temp_path() -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("durablequeue-worker-test-{}.json", Uuid::new_v4()));
        p
    }

    #[tokio::test]
    async fn worker_processes_one_job_then_stops() {
        let path = temp_path();
        let store = Arc::new(JobStore::load(&path).unwrap());
        let channel = Arc::new(PendingChannel::new());
        let coordinator = Arc::new(QueueCoordinator::new(store.clone(), channel, 2));
        let job = coordinator.enqueue("echo hi".to_string(), 3).await.unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let coordinator_clone = coordinator.clone();
        let executor = Arc::new(JobExecutor::new());

        let handle = tokio::spawn(async move {
            run(
                "test-worker",
                coordinator_clone,
                executor,
                Duration::from_secs(5),
                shutdown_clone,
            )
            .await;
        });

        // Wait for the job to complete, then signal shutdown.
        for _ in 0..50 {
            if store.get(job.id).unwrap().state == JobState::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        shutdown.store(true, Ordering::Relaxed);
        let _ = tokio::time::timeout(Duration::from_secs(6), handle).await;

        assert_eq!(store.get(job.id).unwrap().state, JobState::Completed);
        let _ = std::fs::remove_file(&path);
    }
}
