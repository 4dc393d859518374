use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use thiserror::Error;
use tracing::error;

use crate::job::CommandSpec;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("exited with status {0}")]
    NonZeroExit(std::process::ExitStatus),
}

/// The command-execution subsystem boundary (spec §1/§6): process spawn,
/// output capture, and retry are out of scope for the reconciler and
/// consumed only through this trait.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, spec: &CommandSpec) -> Result<(), ExecError>;
}

/// Minimal concrete executor so the binary has something to run; real
/// deployments are expected to supply a richer one (output capture,
/// retry policy) behind the same trait.
pub struct ProcessExecutor;

#[async_trait::async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, spec: &CommandSpec) -> Result<(), ExecError> {
        let status = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .envs(&spec.env)
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(ExecError::NonZeroExit(status))
        }
    }
}

/// `RunWithRecovery` (spec §6): a panic or error inside execution must
/// never terminate the caller. Grounded on the teacher's defensive
/// `tokio::spawn(run_subagent_task(...))` pattern in
/// `crates/agent/src/runtime.rs`, which logs a spawned task's failure
/// rather than letting it propagate.
pub async fn run_with_recovery(label: &str, spec: &CommandSpec, executor: &dyn Executor) {
    match AssertUnwindSafe(executor.execute(spec)).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(label, error = %e, "command execution failed"),
        Err(_) => error!(label, "command execution panicked"),
    }
}
