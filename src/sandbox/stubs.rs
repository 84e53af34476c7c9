use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::{CompilationLimits, ExecutionLimits, ExecutionResult};
use crate::sandbox::{CompileError, RunError, Sandbox, SandboxContext, SandboxError};

/// Canned sandbox for wiring tests: fixed compile/execute outcomes behind a
/// configurable delay, no real processes or filesystem state.
#[derive(Debug, Clone)]
pub struct SandboxStub {
    compile_result: Result<(), CompileError>,
    execute_result: Result<ExecutionResult, RunError>,
    delay: Duration,
}

impl SandboxStub {
    pub fn new(
        compile_result: Result<(), CompileError>,
        execute_result: Result<ExecutionResult, RunError>,
        delay: Duration,
    ) -> Self {
        Self {
            compile_result,
            execute_result,
            delay,
        }
    }
}

#[async_trait::async_trait]
impl Sandbox for SandboxStub {
    #[tracing::instrument]
    async fn provision(&self) -> Result<SandboxContext, SandboxError> {
        Ok(SandboxContext {
            id: Uuid::new_v4(),
            workdir: PathBuf::from("/dev/null"),
        })
    }

    #[tracing::instrument(skip(source))]
    async fn compile(
        &self,
        _ctx: &SandboxContext,
        source: &str,
        _limits: &CompilationLimits,
    ) -> Result<(), CompileError> {
        tracing::debug!("Stub compiling {} bytes", source.len());
        tokio::time::sleep(self.delay).await;
        self.compile_result.clone()
    }

    #[tracing::instrument]
    async fn execute(
        &self,
        _ctx: &SandboxContext,
        limits: &ExecutionLimits,
    ) -> Result<ExecutionResult, RunError> {
        tracing::debug!("Stub executing with limits {:?}", limits);
        tokio::time::sleep(self.delay).await;
        self.execute_result.clone()
    }

    async fn terminate(&self, _ctx: &SandboxContext) {}

    async fn destroy(&self, _ctx: SandboxContext) {}
}
