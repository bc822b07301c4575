//! The state-machine owner. Every lifecycle transition passes through
//! exactly one method here, so the Store and the Channel never disagree.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{QueueError, Result};
use crate::job::{now_local, Job, JobSnapshot, JobState};
use crate::job_store::JobStore;
use crate::pending_channel::PendingChannel;

/// Maximum retry delay, fixed policy regardless of `backoff_base`.
const MAX_BACKOFF_SECONDS: i64 = 3600;

pub struct QueueCoordinator {
    store: Arc<JobStore>,
    channel: Arc<PendingChannel>,
    backoff_base: u64,
}

impl QueueCoordinator {
    pub fn new(store: Arc<JobStore>, channel: Arc<PendingChannel>, backoff_base: u64) -> Self {
        Self {
            store,
            channel,
            backoff_base,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Creates a job in PENDING and offers it to the channel.
    pub async fn enqueue(&self, command: String, max_retries: u32) -> Result<Job> {
        if command.trim().is_empty() {
            return Err(QueueError::Validation(
                "command must not be empty".to_string(),
            ));
        }
        let job = Job::new(command, max_retries);
        self.store.put(job.clone())?;
        self.channel.offer(job.snapshot()).await;
        Ok(job)
    }

    /// Blocks up to `timeout` for a pending job, atomically transitioning
    /// it to PROCESSING in the store as it leaves the channel.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<JobSnapshot>> {
        let Some(snapshot) = self.channel.recv_timeout(timeout).await else {
            return Ok(None);
        };

        let Some(mut job) = self.store.get(snapshot.id) else {
            // Job was deleted between being offered and being claimed.
            warn!("dequeued job {} no longer exists in the store", snapshot.id);
            return Ok(None);
        };
        job.state = JobState::Processing;
        job.updated_at = now_local();
        self.store.put(job)?;

        Ok(Some(snapshot))
    }

    /// Precondition: the job was PROCESSING.
    pub async fn complete(&self, job_id: Uuid) -> Result<()> {
        let mut job = self.store.get(job_id).ok_or(QueueError::NotFound(job_id))?;
        if job.state != JobState::Processing {
            error!(
                "complete() called for job {} in state {:?}, expected Processing",
                job_id, job.state
            );
            return Err(QueueError::InvalidTransition(job_id));
        }
        job.state = JobState::Completed;
        job.error_message = None;
        job.next_retry_at = None;
        job.updated_at = now_local();
        self.store.put(job)
    }

    /// Precondition: the job was PROCESSING. Moves to FAILED with a
    /// scheduled retry, or to DEAD if the retry budget is exhausted.
    pub async fn fail(&self, job_id: Uuid, reason: String) -> Result<()> {
        let mut job = self.store.get(job_id).ok_or(QueueError::NotFound(job_id))?;
        if job.state != JobState::Processing {
            error!(
                "fail() called for job {} in state {:?}, expected Processing",
                job_id, job.state
            );
            return Err(QueueError::InvalidTransition(job_id));
        }

        let attempt = job.attempts + 1;
        job.attempts = attempt;
        job.error_message = Some(reason);
        job.updated_at = now_local();

        if attempt < job.max_retries {
            job.state = JobState::Failed;
            job.next_retry_at = Some(job.updated_at + retry_delay(self.backoff_base, attempt));
        } else {
            job.state = JobState::Dead;
            job.next_retry_at = None;
        }

        self.store.put(job)
    }

    /// Moves every FAILED job whose `next_retry_at` has elapsed back to
    /// PENDING and re-offers it. Returns the count requeued. Jobs are
    /// offered in the Store's iteration order - no strict fairness beyond
    /// "eligible jobs are eventually offered".
    pub async fn process_retries(&self, now: NaiveDateTime) -> Result<usize> {
        let ready = self.store.list_ready_for_retry(now);
        let mut requeued = 0;
        for mut job in ready {
            job.state = JobState::Pending;
            job.next_retry_at = None;
            job.updated_at = now;
            let snapshot = job.snapshot();
            self.store.put(job)?;
            self.channel.offer(snapshot).await;
            requeued += 1;
        }
        Ok(requeued)
    }

    /// Creates a *new* record (fresh id) with the same command and
    /// `max_retries` in PENDING. The original DEAD record is untouched -
    /// this preserves the audit trail of the failed attempt.
    pub async fn retry_dead(&self, id: Uuid) -> Result<Option<Job>> {
        let Some(original) = self.store.get(id) else {
            return Ok(None);
        };
        if original.state != JobState::Dead {
            return Ok(None);
        }

        let fresh = Job::new(original.command.clone(), original.max_retries);
        self.store.put(fresh.clone())?;
        self.channel.offer(fresh.snapshot()).await;
        Ok(Some(fresh))
    }

    /// Removes a record from the store. Best-effort removal from the
    /// pending channel - a job already handed to a worker is accepted as
    /// unrecoverable here.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self.store.delete(id)?;
        if removed {
            self.channel.remove(id).await;
        }
        Ok(removed)
    }

    pub fn channel(&self) -> &Arc<PendingChannel> {
        &self.channel
    }
}

/// `delay_seconds = min(backoff_base^attempt, 3600)`.
fn retry_delay(backoff_base: u64, attempt: u32) -> chrono::Duration {
    let seconds = backoff_base
        .checked_pow(attempt)
        .map_or(MAX_BACKOFF_SECONDS, |v| {
            i64::try_from(v).unwrap_or(MAX_BACKOFF_SECONDS).min(MAX_BACKOFF_SECONDS)
        });
    chrono::Duration::seconds(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_coordinator() -> (QueueCoordinator, PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("durablequeue-coord-test-{}.json", Uuid::new_v4()));
        let store = Arc::new(JobStore::load(&path).unwrap());
        let channel = Arc::new(PendingChannel::new());
        (QueueCoordinator::new(store, channel, 2), path)
    }

    #[tokio::test]
    async fn enqueue_rejects_empty_command() {
        let (coord, path) = temp_coordinator();
        let result = coord.enqueue("   ".to_string(), 3).await;
        assert!(matches!(result, Err(QueueError::Validation(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn full_success_lifecycle() {
        let (coord, path) = temp_coordinator();
        let job = coord.enqueue("echo hi".to_string(), 3).await.unwrap();

        let snapshot = coord
            .dequeue(Duration::from_millis(50))
            .await
            .unwrap()
            .expect("job should be available");
        assert_eq!(snapshot.id, job.id);
        assert_eq!(coord.store().get(job.id).unwrap().state, JobState::Processing);

        coord.complete(job.id).await.unwrap();
        let stored = coord.store().get(job.id).unwrap();
        assert_eq!(stored.state, JobState::Completed);
        assert!(stored.error_message.is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn max_retries_zero_dies_on_first_failure() {
        let (coord, path) = temp_coordinator();
        let job = Job::new("false".to_string(), 0);
        coord.store().put(job.clone()).unwrap();
        let mut processing = job.clone();
        processing.state = JobState::Processing;
        coord.store().put(processing).unwrap();

        coord.fail(job.id, "boom".to_string()).await.unwrap();
        let stored = coord.store().get(job.id).unwrap();
        assert_eq!(stored.state, JobState::Dead);
        assert_eq!(stored.attempts, 1);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn failure_within_budget_schedules_retry() {
        let (coord, path) = temp_coordinator();
        let job = Job::new("false".to_string(), 3);
        coord.store().put(job.clone()).unwrap();
        let mut processing = job.clone();
        processing.state = JobState::Processing;
        coord.store().put(processing).unwrap();

        coord.fail(job.id, "boom".to_string()).await.unwrap();
        let stored = coord.store().get(job.id).unwrap();
        assert_eq!(stored.state, JobState::Failed);
        assert_eq!(stored.attempts, 1);
        let next = stored.next_retry_at.unwrap();
        // backoff_base = 2, attempt = 1 => 2 seconds
        let delta = (next - stored.updated_at).num_seconds();
        assert_eq!(delta, 2);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn retry_dead_creates_new_id_and_keeps_original() {
        let (coord, path) = temp_coordinator();
        let mut dead = Job::new("echo hi".to_string(), 1);
        dead.state = JobState::Dead;
        dead.attempts = 1;
        coord.store().put(dead.clone()).unwrap();

        let fresh = coord.retry_dead(dead.id).await.unwrap().expect("should retry");
        assert_ne!(fresh.id, dead.id);
        assert_eq!(fresh.state, JobState::Pending);
        assert_eq!(fresh.command, dead.command);

        let original = coord.store().get(dead.id).unwrap();
        assert_eq!(original.state, JobState::Dead);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn process_retries_moves_due_jobs_back_to_pending() {
        let (coord, path) = temp_coordinator();
        let now = now_local();
        let mut due = Job::new("false".to_string(), 3);
        due.state = JobState::Failed;
        due.attempts = 1;
        due.next_retry_at = Some(now - chrono::Duration::seconds(1));
        coord.store().put(due.clone()).unwrap();

        let count = coord.process_retries(now).await.unwrap();
        assert_eq!(count, 1);
        let stored = coord.store().get(due.id).unwrap();
        assert_eq!(stored.state, JobState::Pending);
        assert!(stored.next_retry_at.is_none());

        let snapshot = coord
            .dequeue(Duration::from_millis(50))
            .await
            .unwrap()
            .expect("requeued job should be offered");
        assert_eq!(snapshot.id, due.id);
        let _ = std::fs::remove_file(&path);
    }
}
