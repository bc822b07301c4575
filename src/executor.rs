//! Runs a single job's command via the host shell under a wall-clock
//! timeout, merging stdout/stderr for logging purposes only (never
//! persisted in the job record).

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug)]
pub enum ExecutionOutcome {
    Success { output: String },
    Failure { reason: String },
}

/// Stateless; safe to share across workers.
#[derive(Debug, Clone, Default)]
pub struct JobExecutor;

impl JobExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, command: &str, job_timeout: Duration) -> ExecutionOutcome {
        let mut cmd = shell_command(command);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionOutcome::Failure {
                    reason: format!("Failed to start process: {e}"),
                }
            }
        };

        let mut stdout = child.stdout.take().expect("stdout was piped");
        let mut stderr = child.stderr.take().expect("stderr was piped");
        let stdout_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        match timeout(job_timeout, child.wait()).await {
            Err(_elapsed) => {
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                ExecutionOutcome::Failure {
                    reason: format!(
                        "Job timed out after {} seconds",
                        job_timeout.as_secs()
                    ),
                }
            }
            Ok(Err(e)) => ExecutionOutcome::Failure {
                reason: format!("Job execution interrupted: {e}"),
            },
            Ok(Ok(status)) => {
                let stdout_buf = stdout_task.await.unwrap_or_default();
                let stderr_buf = stderr_task.await.unwrap_or_default();
                let mut merged = stdout_buf;
                merged.push_str(&stderr_buf);

                if status.success() {
                    debug!("command completed: {command}");
                    ExecutionOutcome::Success { output: merged }
                } else {
                    let code = status.code().unwrap_or(-1);
                    ExecutionOutcome::Failure {
                        reason: format!("Command failed with exit code {code}"),
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/c").arg(command);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_success() {
        let executor = JobExecutor::new();
        let outcome = executor
            .execute("echo hello", Duration::from_secs(5))
            .await;
        match outcome {
            ExecutionOutcome::Success { output } => assert!(output.contains("hello")),
            ExecutionOutcome::Failure { reason } => panic!("expected success, got {reason}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_reports_code_in_reason() {
        let executor = JobExecutor::new();
        let outcome = executor.execute("exit 7", Duration::from_secs(5)).await;
        match outcome {
            ExecutionOutcome::Failure { reason } => {
                assert!(reason.contains("exit code 7"), "{reason}");
            }
            ExecutionOutcome::Success { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let executor = JobExecutor::new();
        let outcome = executor
            .execute("sleep 5", Duration::from_millis(200))
            .await;
        match outcome {
            ExecutionOutcome::Failure { reason } => assert!(reason.contains("timed out")),
            ExecutionOutcome::Success { .. } => panic!("expected timeout failure"),
        }
    }
}
