pub mod orchestrator;
pub mod process;
pub mod stubs;

pub use orchestrator::SandboxFailure;
pub use process::ProcessSandbox;

use std::path::PathBuf;

use uuid::Uuid;

use crate::domain::{CompilationLimits, ExecutionLimits, ExecutionResult};

/// An isolated execution scope, exclusively owned by one submission run.
/// Concurrent runs never share a working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SandboxContext {
    pub id: Uuid,
    pub workdir: PathBuf,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to provision sandbox: {msg}")]
    Provision { msg: String },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error("compilation failed:\n{log}")]
    CompilationFailed { log: String },
    #[error("compilation exceeded {limit_ms}ms")]
    TimedOut { limit_ms: u64 },
    #[error("sandbox failure during compilation: {msg}")]
    Internal { msg: String },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RunError {
    #[error("sandbox failure during execution: {msg}")]
    Internal { msg: String },
}

/// The runtime boundary for sandboxed execution. The engine treats this as
/// an abstract capability so the concrete isolation mechanism is swappable
/// without touching driver generation or evaluation.
///
/// User-code outcomes (non-zero exits, signals, limit breaches) are data in
/// the returned `ExecutionResult`; the error types here are reserved for
/// failures of the sandbox itself.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Sandbox: std::fmt::Debug + Send + Sync {
    async fn provision(&self) -> Result<SandboxContext, SandboxError>;

    async fn compile(
        &self,
        ctx: &SandboxContext,
        source: &str,
        limits: &CompilationLimits,
    ) -> Result<(), CompileError>;

    async fn execute(
        &self,
        ctx: &SandboxContext,
        limits: &ExecutionLimits,
    ) -> Result<ExecutionResult, RunError>;

    /// Forcibly terminates whatever the context is currently running.
    async fn terminate(&self, ctx: &SandboxContext);

    /// Releases everything the context holds. Called on every exit path.
    async fn destroy(&self, ctx: SandboxContext);
}
