//! services/api/src/adapters/code_runner.rs
//!
//! Runs code-challenge submissions through an external interpreter.
//! Implements the `CodeRunner` port from the `core` crate.
//!
//! Each run gets its own temp file, a wall-clock timeout, an output cap and a
//! slot from a shared semaphore. This bounds resource use; it does not isolate
//! the submission from the host.

use crate::config::RunnerConfig;
use async_trait::async_trait;
use career_quest_core::domain::RunOutput;
use career_quest_core::ports::{CodeRunner, PortError, PortResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

pub struct ProcessCodeRunner {
    config: RunnerConfig,
    permits: Arc<Semaphore>,
}

impl ProcessCodeRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent));
        Self { config, permits }
    }

    fn scratch_path(&self) -> PathBuf {
        self.config.temp_dir.join(format!(
            "user_code_{}.{}",
            Uuid::new_v4().simple(),
            self.config.file_extension
        ))
    }

    async fn execute(&self, path: &Path) -> PortResult<RunOutput> {
        let mut child = Command::new(&self.config.interpreter)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PortError::Unexpected(format!(
                    "Failed to start interpreter '{}': {}",
                    self.config.interpreter, e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PortError::Unexpected("Interpreter stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PortError::Unexpected("Interpreter stderr was not captured".to_string()))?;

        let limit = self.config.max_output_bytes;
        let collect = async {
            let (out, err) = tokio::join!(read_capped(stdout, limit), read_capped(stderr, limit));
            let status = child.wait().await;
            (out, err, status)
        };

        match tokio::time::timeout(self.config.timeout, collect).await {
            Ok((out, err, status)) => {
                let (mut combined, out_truncated) =
                    out.map_err(|e| PortError::Unexpected(e.to_string()))?;
                let (err_bytes, err_truncated) =
                    err.map_err(|e| PortError::Unexpected(e.to_string()))?;
                let status = status.map_err(|e| PortError::Unexpected(e.to_string()))?;

                combined.extend_from_slice(&err_bytes);
                let mut truncated = out_truncated || err_truncated;
                if combined.len() > limit {
                    combined.truncate(limit);
                    truncated = true;
                }
                info!(exit_status = %status, bytes = combined.len(), truncated, "Submission finished");

                Ok(RunOutput {
                    output: String::from_utf8_lossy(&combined).into_owned(),
                    timed_out: false,
                    truncated,
                })
            }
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "Submission timed out, killing interpreter");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed-out interpreter: {}", e);
                }
                Ok(RunOutput {
                    output: String::new(),
                    timed_out: true,
                    truncated: false,
                })
            }
        }
    }
}

/// Reads a stream to the end, keeping at most `limit` bytes.
///
/// Anything past the limit is drained and dropped so the child never blocks on a full pipe.
async fn read_capped<R>(mut reader: R, limit: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        if n > room {
            truncated = true;
        }
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok((kept, truncated))
}

#[async_trait]
impl CodeRunner for ProcessCodeRunner {
    async fn run(&self, code: &str) -> PortResult<RunOutput> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PortError::Unexpected(format!("Runner is shut down: {}", e)))?;

        tokio::fs::create_dir_all(&self.config.temp_dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to prepare temp dir: {}", e)))?;
        let path = self.scratch_path();
        tokio::fs::write(&path, code)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write submission: {}", e)))?;

        let result = self.execute(&path).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove submission file {}: {}", path.display(), e);
        }
        result
    }
}
