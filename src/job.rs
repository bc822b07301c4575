//! The `Job` entity and its closed state set.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five states a job can occupy. Closed set — no subtype polymorphism,
/// state-dependent fields (`error_message`, `next_retry_at`) are nullable
/// on the flat record so the on-disk JSON shape stays simple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Dead,
}

impl JobState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Dead)
    }

    pub const ALL: [JobState; 5] = [
        JobState::Pending,
        JobState::Processing,
        JobState::Completed,
        JobState::Failed,
        JobState::Dead,
    ];
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Dead => "dead",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "dead" => Ok(Self::Dead),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

/// A single shell-command job and its full lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub command: String,
    pub state: JobState,
    pub attempts: u32,
    pub max_retries: u32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub error_message: Option<String>,
    pub next_retry_at: Option<NaiveDateTime>,
}

impl Job {
    /// Creates a fresh job in PENDING with a new random id.
    pub fn new(command: String, max_retries: u32) -> Self {
        let now = now_local();
        Self {
            id: Uuid::new_v4(),
            command,
            state: JobState::Pending,
            attempts: 0,
            max_retries,
            created_at: now,
            updated_at: now,
            error_message: None,
            next_retry_at: None,
        }
    }

    /// The value that crosses the Coordinator -> Channel -> Worker boundary.
    /// Only what's needed to identify and execute the job; the authoritative
    /// mutable record stays in the Store.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            command: self.command.clone(),
            max_retries: self.max_retries,
            attempts: self.attempts,
        }
    }
}

/// Lightweight, owned copy of a pending job sufficient to execute it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub command: String,
    pub max_retries: u32,
    pub attempts: u32,
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_pending_with_zero_attempts() {
        let job = Job::new("echo hi".to_string(), 3);
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.attempts, 0);
        assert!(job.error_message.is_none());
        assert!(job.next_retry_at.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn state_serializes_lowercase() {
        let s = serde_json::to_string(&JobState::Dead).unwrap();
        assert_eq!(s, "\"dead\"");
    }

    #[test]
    fn snapshot_carries_identifying_fields_only() {
        let job = Job::new("ls".to_string(), 5);
        let snap = job.snapshot();
        assert_eq!(snap.id, job.id);
        assert_eq!(snap.command, job.command);
        assert_eq!(snap.max_retries, job.max_retries);
        assert_eq!(snap.attempts, job.attempts);
    }
}
