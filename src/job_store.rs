//! The durable source of truth: id -> `Job`, snapshotted to disk on every
//! mutation via write-tmp-then-rename.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::NaiveDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{QueueError, Result};
use crate::job::{Job, JobState};

struct StoreState {
    jobs: HashMap<Uuid, Job>,
    by_state: HashMap<JobState, HashSet<Uuid>>,
}

impl StoreState {
    fn empty() -> Self {
        let mut by_state = HashMap::new();
        for state in JobState::ALL {
            by_state.insert(state, HashSet::new());
        }
        Self {
            jobs: HashMap::new(),
            by_state,
        }
    }

    fn index(&mut self, job: &Job) {
        self.by_state.entry(job.state).or_default().insert(job.id);
    }

    fn unindex(&mut self, id: Uuid, state: JobState) {
        if let Some(set) = self.by_state.get_mut(&state) {
            set.remove(&id);
        }
    }

    fn insert(&mut self, job: Job) {
        if let Some(old) = self.jobs.get(&job.id) {
            self.unindex(job.id, old.state);
        }
        self.index(&job);
        self.jobs.insert(job.id, job);
    }

    fn remove(&mut self, id: Uuid) -> Option<Job> {
        let job = self.jobs.remove(&id)?;
        self.unindex(id, job.state);
        Some(job)
    }
}

/// Thread-safe, disk-backed job map. A single RW lock guards both the
/// in-memory map and the on-disk snapshot; writers serialize, readers run
/// concurrently when no writer holds the lock.
pub struct JobStore {
    data_file: PathBuf,
    state: RwLock<StoreState>,
}

impl JobStore {
    /// Loads the store from `data_file`, creating an empty store if the
    /// file is absent or empty. A non-empty, malformed file is a fatal
    /// startup error — the operator must intervene.
    ///
    /// Any job left in PROCESSING by a prior crashed run is reset to
    /// PENDING (§9: at-least-once over strict exactly-once recovery).
    pub fn load(data_file: impl AsRef<Path>) -> Result<Self> {
        let data_file = data_file.as_ref().to_path_buf();
        let mut state = Self::read_from_disk(&data_file)?;

        let reconciled = Self::reconcile_processing(&mut state);
        let store = Self {
            data_file,
            state: RwLock::new(state),
        };
        if reconciled > 0 {
            warn!(
                "reconciled {} job(s) stuck in processing on startup",
                reconciled
            );
            store.write_snapshot_locked(&store.state.read().unwrap())?;
        }
        Ok(store)
    }

    fn read_from_disk(path: &Path) -> Result<StoreState> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreState::empty()),
            Err(e) => return Err(QueueError::Io(e)),
        };
        if contents.trim().is_empty() {
            return Ok(StoreState::empty());
        }

        let jobs: Vec<Job> = serde_json::from_str(&contents).map_err(|e| {
            QueueError::Storage(format!(
                "malformed job store at {}: {e}",
                path.display()
            ))
        })?;

        let mut state = StoreState::empty();
        for job in jobs {
            state.insert(job);
        }
        Ok(state)
    }

    fn reconcile_processing(state: &mut StoreState) -> usize {
        let stuck: Vec<Uuid> = state
            .by_state
            .get(&JobState::Processing)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect();
        for id in &stuck {
            if let Some(job) = state.jobs.get(id).cloned() {
                let mut job = job;
                job.state = JobState::Pending;
                job.updated_at = crate::job::now_local();
                state.insert(job);
            }
        }
        stuck.len()
    }

    /// Upsert by id; durable once this returns `Ok`.
    pub fn put(&self, job: Job) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.insert(job);
        self.write_snapshot_locked(&state)
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.state.read().unwrap().jobs.get(&id).cloned()
    }

    /// Snapshot of all records in the given state. Order is unspecified
    /// but stable within this call.
    pub fn list_by_state(&self, s: JobState) -> Vec<Job> {
        let state = self.state.read().unwrap();
        state
            .by_state
            .get(&s)
            .into_iter()
            .flatten()
            .filter_map(|id| state.jobs.get(id).cloned())
            .collect()
    }

    /// FAILED records with `attempts < max_retries` and `next_retry_at <= now`.
    pub fn list_ready_for_retry(&self, now: NaiveDateTime) -> Vec<Job> {
        let state = self.state.read().unwrap();
        state
            .by_state
            .get(&JobState::Failed)
            .into_iter()
            .flatten()
            .filter_map(|id| state.jobs.get(id))
            .filter(|job| {
                job.attempts < job.max_retries
                    && job.next_retry_at.is_none_or(|t| t <= now)
            })
            .cloned()
            .collect()
    }

    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().unwrap();
        let removed = state.remove(id).is_some();
        if removed {
            self.write_snapshot_locked(&state)?;
        }
        Ok(removed)
    }

    /// Bulk delete; one snapshot write for the whole batch.
    pub fn delete_by_state(&self, s: JobState) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let ids: Vec<Uuid> = state.by_state.get(&s).cloned().unwrap_or_default().into_iter().collect();
        for id in &ids {
            state.remove(*id);
        }
        if !ids.is_empty() {
            self.write_snapshot_locked(&state)?;
        }
        Ok(ids.len())
    }

    pub fn delete_many(&self, ids: &[Uuid]) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let mut count = 0;
        for id in ids {
            if state.remove(*id).is_some() {
                count += 1;
            }
        }
        if count > 0 {
            self.write_snapshot_locked(&state)?;
        }
        Ok(count)
    }

    pub fn statistics(&self) -> HashMap<JobState, usize> {
        let state = self.state.read().unwrap();
        JobState::ALL
            .into_iter()
            .map(|s| (s, state.by_state.get(&s).map_or(0, HashSet::len)))
            .collect()
    }

    pub fn all(&self) -> Vec<Job> {
        self.state.read().unwrap().jobs.values().cloned().collect()
    }

    fn write_snapshot_locked(&self, state: &StoreState) -> Result<()> {
        let mut jobs: Vec<&Job> = state.jobs.values().collect();
        jobs.sort_by_key(|j| j.created_at);

        let tmp_path = self.data_file.with_extension("json.tmp");
        let serialized = serde_json::to_string_pretty(&jobs)?;
        fs::write(&tmp_path, serialized)?;
        fs::rename(&tmp_path, &self.data_file)?;
        debug!(
            "wrote job store snapshot ({} record(s)) to {}",
            jobs.len(),
            self.data_file.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("durablequeue-store-test-{}.json", Uuid::new_v4()));
        p
    }

    #[test]
    fn absent_file_is_empty_store() {
        let path = temp_path();
        let store = JobStore::load(&path).unwrap();
        assert_eq!(store.all().len(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn put_then_get_round_trips() {
        let path = temp_path();
        let store = JobStore::load(&path).unwrap();
        let job = Job::new("echo hi".to_string(), 3);
        store.put(job.clone()).unwrap();
        assert_eq!(store.get(job.id).unwrap(), job);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn reopen_from_disk_preserves_records() {
        let path = temp_path();
        let job = {
            let store = JobStore::load(&path).unwrap();
            let job = Job::new("echo hi".to_string(), 3);
            store.put(job.clone()).unwrap();
            job
        };
        let reopened = JobStore::load(&path).unwrap();
        assert_eq!(reopened.get(job.id).unwrap(), job);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn list_ready_for_retry_respects_budget_and_time() {
        let path = temp_path();
        let store = JobStore::load(&path).unwrap();
        let now = crate::job::now_local();

        let mut ready = Job::new("false".to_string(), 3);
        ready.state = JobState::Failed;
        ready.attempts = 1;
        ready.next_retry_at = Some(now - Duration::seconds(1));
        store.put(ready.clone()).unwrap();

        let mut not_yet = Job::new("false".to_string(), 3);
        not_yet.state = JobState::Failed;
        not_yet.attempts = 1;
        not_yet.next_retry_at = Some(now + Duration::seconds(60));
        store.put(not_yet).unwrap();

        let mut exhausted = Job::new("false".to_string(), 3);
        exhausted.state = JobState::Failed;
        exhausted.attempts = 3;
        exhausted.next_retry_at = Some(now - Duration::seconds(1));
        store.put(exhausted).unwrap();

        let due = store.list_ready_for_retry(now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, ready.id);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn processing_jobs_reset_to_pending_on_load() {
        let path = temp_path();
        let id = {
            let store = JobStore::load(&path).unwrap();
            let mut job = Job::new("echo hi".to_string(), 3);
            job.state = JobState::Processing;
            store.put(job.clone()).unwrap();
            job.id
        };

        let reopened = JobStore::load(&path).unwrap();
        assert_eq!(reopened.get(id).unwrap().state, JobState::Pending);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_non_empty_file_is_fatal() {
        let path = temp_path();
        fs::write(&path, "{ not valid json").unwrap();
        let result = JobStore::load(&path);
        assert!(result.is_err());
        let _ = fs::remove_file(&path);
    }
}
