//! FIFO hand-off between producers (enqueue, retry scheduler) and worker
//! consumers. Not itself durable — the Store is the durable reflection;
//! this just holds live references to ready-to-run jobs.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::job::JobSnapshot;

pub struct PendingChannel {
    queue: Mutex<VecDeque<JobSnapshot>>,
    notify: Notify,
}

impl PendingChannel {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Offer a job to the channel. FIFO within a single producer;
    /// interleaving of producers is unspecified.
    pub async fn offer(&self, job: JobSnapshot) {
        self.queue.lock().await.push_back(job);
        self.notify.notify_one();
    }

    /// Block up to `timeout` for a job to become available. Returns
    /// `None` if nothing arrived before the timeout elapsed.
    pub async fn recv_timeout(&self, timeout: Duration) -> Option<JobSnapshot> {
        loop {
            {
                let mut queue = self.queue.lock().await;
                if let Some(job) = queue.pop_front() {
                    return Some(job);
                }
            }
            if tokio::time::timeout(timeout, self.notify.notified())
                .await
                .is_err()
            {
                return None;
            }
            // Notified (or spuriously woken) - loop back and re-check the queue.
        }
    }

    /// Best-effort removal of a job by id. A job already handed off to a
    /// worker cannot be recalled from here.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut queue = self.queue.lock().await;
        let before = queue.len();
        queue.retain(|job| job.id != id);
        queue.len() != before
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

impl Default for PendingChannel {
    fn default() -> Self {
        Self::new()
    }
}
