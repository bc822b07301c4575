//! Thin operator-facing layer over the Store and Coordinator for jobs in
//! the terminal DEAD state.

use std::sync::Arc;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::coordinator::QueueCoordinator;
use crate::error::Result;
use crate::job::{Job, JobState};
use crate::job_store::JobStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterStats {
    pub count: usize,
    pub oldest_updated_at: Option<NaiveDateTime>,
    pub newest_updated_at: Option<NaiveDateTime>,
    pub timeout_count: usize,
}

pub struct DeadLetterManager {
    store: Arc<JobStore>,
    coordinator: Arc<QueueCoordinator>,
}

impl DeadLetterManager {
    pub fn new(store: Arc<JobStore>, coordinator: Arc<QueueCoordinator>) -> Self {
        Self { store, coordinator }
    }

    fn all_dead(&self) -> Vec<Job> {
        self.store.list_by_state(JobState::Dead)
    }

    pub fn list(&self, offset: usize, limit: usize) -> Vec<Job> {
        let mut dead = self.all_dead();
        dead.sort_by_key(|j| j.updated_at);
        dead.into_iter().skip(offset).take(limit).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.store.get(id).filter(|j| j.state == JobState::Dead)
    }

    pub fn filter_by_error_substring(&self, needle: &str) -> Vec<Job> {
        let needle = needle.to_lowercase();
        self.all_dead()
            .into_iter()
            .filter(|j| {
                j.error_message
                    .as_deref()
                    .is_some_and(|m| m.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn filter_by_time_range(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Job> {
        self.all_dead()
            .into_iter()
            .filter(|j| j.updated_at >= from && j.updated_at <= to)
            .collect()
    }

    pub async fn retry(&self, id: Uuid) -> Result<bool> {
        Ok(self.coordinator.retry_dead(id).await?.is_some())
    }

    pub async fn retry_all(&self) -> Result<usize> {
        let ids: Vec<Uuid> = self.all_dead().into_iter().map(|j| j.id).collect();
        self.retry_many(&ids).await
    }

    pub async fn retry_many(&self, ids: &[Uuid]) -> Result<usize> {
        let mut retried = 0;
        for id in ids {
            if self.coordinator.retry_dead(*id).await?.is_some() {
                retried += 1;
            }
        }
        Ok(retried)
    }

    pub fn delete(&self, id: Uuid) -> Result<bool> {
        self.store.delete(id)
    }

    pub fn delete_many(&self, ids: &[Uuid]) -> Result<usize> {
        self.store.delete_many(ids)
    }

    pub fn clear_all(&self) -> Result<usize> {
        self.store.delete_by_state(JobState::Dead)
    }

    pub fn clear_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = crate::job::now_local() - chrono::Duration::days(days);
        let ids: Vec<Uuid> = self
            .all_dead()
            .into_iter()
            .filter(|j| j.updated_at < cutoff)
            .map(|j| j.id)
            .collect();
        self.store.delete_many(&ids)
    }

    pub fn statistics(&self) -> DeadLetterStats {
        let dead = self.all_dead();
        let oldest = dead.iter().map(|j| j.updated_at).min();
        let newest = dead.iter().map(|j| j.updated_at).max();
        let timeout_count = dead
            .iter()
            .filter(|j| j.error_message.as_deref().is_some_and(is_timeout_message))
            .count();

        DeadLetterStats {
            count: dead.len(),
            oldest_updated_at: oldest,
            newest_updated_at: newest,
            timeout_count,
        }
    }
}

/// The executor's actual timeout reason reads "Job timed out after N
/// seconds" (`executor.rs`), not the literal word "timeout" - match both
/// spellings so real timeouts are counted.
fn is_timeout_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("timeout") || message.contains("timed out")
}
