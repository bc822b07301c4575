use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the job-lifecycle engine.
///
/// Domain failures (a job failing or dying) are never represented here —
/// they are recorded on the `Job` record itself. This enum only carries
/// infrastructural and caller-side failures.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error("job {0} is not in the expected state for this operation")]
    InvalidTransition(Uuid),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;
