//! Executor abstraction for agent invocation.
//!
//! The [`Executor`] trait decouples the pipeline from the agent backend
//! (the Gemini API or any prompt-on-stdin CLI). Tests use scripted executors
//! that return predetermined outputs without network or processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::agents::{ModelSlot, Stage};
use crate::io::config::{BackendKind, CrewConfig, Credentials};
use crate::io::gemini::GeminiExecutor;
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::PromptPack;

/// Parameters for one agent call.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Stage being executed, for logging and scripted test backends.
    pub stage: Stage,
    /// Model slot of the agent.
    pub model_slot: ModelSlot,
    /// Concrete model name resolved from config.
    pub model: String,
    /// Rendered persona and task prompt.
    pub prompt: PromptPack,
    /// Maximum time to wait for the answer.
    pub timeout: Duration,
    /// Discard output beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Abstraction over agent execution backends.
pub trait Executor {
    /// Run the agent and return its raw text answer.
    fn exec(&self, request: &ExecRequest) -> Result<String>;
}

/// Executor that pipes the prompt into a configured command and reads stdout.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    argv: Vec<String>,
}

impl CommandExecutor {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() || argv[0].trim().is_empty() {
            return Err(anyhow!("command executor needs a program"));
        }
        Ok(Self { argv })
    }
}

impl Executor for CommandExecutor {
    #[instrument(skip_all, fields(stage = request.stage.as_str(), program = %self.argv[0], timeout_secs = request.timeout.as_secs()))]
    fn exec(&self, request: &ExecRequest) -> Result<String> {
        info!(model = %request.model, "starting agent command");

        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]).env("CREW_MODEL", &request.model);

        let prompt = request.prompt.combined();
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
        )
        .with_context(|| format!("run {}", self.argv[0]))?;

        if output.timed_out {
            warn!(
                timeout_secs = request.timeout.as_secs(),
                "agent command timed out"
            );
            return Err(anyhow!(
                "{} timed out after {:?}",
                self.argv[0],
                request.timeout
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "agent command failed");
            return Err(anyhow!(
                "{} failed with status {:?}: {}",
                self.argv[0],
                output.status.code(),
                output.stderr_tail(5)
            ));
        }

        let text = output.stdout_text();
        debug!(bytes = text.len(), "agent command completed");
        Ok(text)
    }
}

/// Build the backend selected in `cfg`.
///
/// The Gemini backend needs credentials; the command backend ignores them.
pub fn build_executor(
    cfg: &CrewConfig,
    credentials: Option<Credentials>,
) -> Result<Box<dyn Executor + Send + Sync>> {
    match cfg.backend {
        BackendKind::Gemini => {
            let credentials =
                credentials.ok_or_else(|| anyhow!("gemini backend requires API credentials"))?;
            let executor = GeminiExecutor::new(&cfg.gemini.base_url, credentials)?;
            Ok(Box::new(executor))
        }
        BackendKind::Command => Ok(Box::new(CommandExecutor::new(cfg.command.argv.clone())?)),
    }
}

/// Build the configured backend, reading credentials from the environment when it needs them.
pub fn executor_from_env(cfg: &CrewConfig) -> Result<Box<dyn Executor + Send + Sync>> {
    let credentials = match cfg.backend {
        BackendKind::Gemini => Some(Credentials::from_env(cfg)?),
        BackendKind::Command => None,
    };
    build_executor(cfg, credentials)
}
