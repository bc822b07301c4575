//! `config.json` - typed defaults, load-or-create, and the handful of
//! mutations the `config` CLI subcommand needs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{QueueError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base: u64,
    #[serde(default = "default_worker_count")]
    pub worker_count: u32,
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_job_timeout_seconds")]
    pub job_timeout_seconds: u64,
    #[serde(default = "default_retry_check_interval_seconds")]
    pub retry_check_interval_seconds: u64,
}

const fn default_max_retries() -> u32 {
    3
}
const fn default_backoff_base() -> u64 {
    2
}
const fn default_worker_count() -> u32 {
    3
}
fn default_data_file() -> String {
    "jobs.json".to_string()
}
const fn default_job_timeout_seconds() -> u64 {
    300
}
const fn default_retry_check_interval_seconds() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base: default_backoff_base(),
            worker_count: default_worker_count(),
            data_file: default_data_file(),
            job_timeout_seconds: default_job_timeout_seconds(),
            retry_check_interval_seconds: default_retry_check_interval_seconds(),
        }
    }
}

impl Config {
    /// Reads `path`; a missing file is created with defaults and returned.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Self = serde_json::from_str(&contents)
                    .map_err(|e| QueueError::Storage(format!("malformed config: {e}")))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                info!("no config at {} - writing defaults", path.display());
                config.save(path)?;
                Ok(config)
            }
            Err(e) => Err(QueueError::Io(e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Sets a single field by its JSON key name, parsing `value` against
    /// the target field's type. Unknown keys are a validation error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "max_retries" => self.max_retries = parse_field(key, value)?,
            "backoff_base" => self.backoff_base = parse_field(key, value)?,
            "worker_count" => self.worker_count = parse_field(key, value)?,
            "data_file" => self.data_file = value.to_string(),
            "job_timeout_seconds" => self.job_timeout_seconds = parse_field(key, value)?,
            "retry_check_interval_seconds" => {
                self.retry_check_interval_seconds = parse_field(key, value)?
            }
            other => {
                return Err(QueueError::Validation(format!(
                    "unknown configuration key: {other}"
                )))
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "max_retries" => Ok(self.max_retries.to_string()),
            "backoff_base" => Ok(self.backoff_base.to_string()),
            "worker_count" => Ok(self.worker_count.to_string()),
            "data_file" => Ok(self.data_file.clone()),
            "job_timeout_seconds" => Ok(self.job_timeout_seconds.to_string()),
            "retry_check_interval_seconds" => Ok(self.retry_check_interval_seconds.to_string()),
            other => Err(QueueError::Validation(format!(
                "unknown configuration key: {other}"
            ))),
        }
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| QueueError::Validation(format!("invalid value for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("durablequeue-config-test-{}.json", uuid::Uuid::new_v4()));
        p
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = temp_path();
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut config = Config::default();
        config.set("max_retries", "7").unwrap();
        assert_eq!(config.get("max_retries").unwrap(), "7");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut config = Config::default();
        let result = config.set("not_a_real_key", "1");
        assert!(matches!(result, Err(QueueError::Validation(_))));
    }

    #[test]
    fn set_rejects_non_numeric_value_for_integer_field() {
        let mut config = Config::default();
        let result = config.set("worker_count", "not-a-number");
        assert!(matches!(result, Err(QueueError::Validation(_))));
    }
}
