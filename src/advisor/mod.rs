pub mod prompts;

use crate::config::Config;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("failed to start advisory process `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("advisory process I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("advisory process exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("advisory request timed out after {seconds}s. Please try again.")]
    TimedOut { seconds: u64 },
    #[error("advisory process returned no text")]
    EmptyResponse,
}

/// Turns a prompt into advisory text. Implementations are not retried.
#[async_trait]
pub trait AdvisoryGenerator: Send + Sync {
    fn model(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError>;
}

/// Runs a local model CLI (`ollama run <model>` by default) with the prompt on
/// stdin and the advisory text on stdout.
#[derive(Debug, Clone)]
pub struct CommandAdvisor {
    program: String,
    args: Vec<String>,
    model: String,
    timeout: Duration,
}

impl CommandAdvisor {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.advisory_program.clone(),
            config.advisory_args.clone(),
            config.advisory_model.clone(),
            config.advisory_timeout(),
        )
    }

    async fn run(&self, prompt: &str) -> Result<String, AdvisoryError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AdvisoryError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin from its own task so a chatty child cannot fill the
        // stdout pipe while we are still writing the prompt.
        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = prompt.to_string();
            tokio::spawn(async move {
                stdin.write_all(prompt.as_bytes()).await?;
                stdin.shutdown().await
            })
        });

        let output = child.wait_with_output().await?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!(error = %error, "failed to write prompt to advisory process"),
                Err(error) => warn!(error = %error, "advisory prompt writer task failed"),
            }
        }

        if !output.status.success() {
            return Err(AdvisoryError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(AdvisoryError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl AdvisoryGenerator for CommandAdvisor {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
        info!(program = %self.program, model = %self.model, "requesting advisory text");

        // Dropping the timed-out future drops the child, which kills it.
        match tokio::time::timeout(self.timeout, self.run(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(seconds = self.timeout.as_secs(), "advisory process timed out");
                Err(AdvisoryError::TimedOut {
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}
