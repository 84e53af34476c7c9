use std::sync::Arc;

use tokio::sync::mpsc::Sender;
use tokio::sync::watch;

use crate::constants::TASK_TX_ERR;
use crate::domain::{ExecutionResult, Submission, SubmissionState};
use crate::sandbox::{CompileError, RunError, Sandbox, SandboxContext};

/// Why a sandbox run produced no `ExecutionResult`. Compile and infra
/// failures short-circuit evaluation; cancellation aggregates like an infra
/// failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SandboxFailure {
    #[error("compilation failed:\n{log}")]
    Compile { log: String },
    #[error("sandbox infrastructure failure: {msg}")]
    Infra { msg: String },
    #[error("cancelled")]
    Cancelled,
}

/// Drives one submission through the sandbox lifecycle:
/// provision, compile, execute, capture, tear down.
///
/// Teardown runs on every exit path once a context exists, including
/// cancellation and failures in the middle states. State snapshots are
/// streamed to `res_tx` as the run progresses; the caller holds the
/// receiver for the whole run.
#[tracing::instrument(skip(sandbox, source, res_tx, cancel))]
pub async fn run(
    sandbox: &Arc<dyn Sandbox>,
    source: &str,
    submission: &Submission,
    res_tx: &Sender<Submission>,
    mut cancel: watch::Receiver<bool>,
) -> Result<ExecutionResult, SandboxFailure> {
    if *cancel.borrow() {
        return Err(SandboxFailure::Cancelled);
    }

    res_tx
        .send(submission.change_state(SubmissionState::Provisioning))
        .await
        .expect(TASK_TX_ERR);

    let ctx = tokio::select! {
        res = sandbox.provision() => res.map_err(|e| SandboxFailure::Infra { msg: e.to_string() })?,
        _ = cancelled(&mut cancel) => return Err(SandboxFailure::Cancelled),
    };

    let outcome = drive(sandbox, &ctx, source, submission, res_tx, &mut cancel).await;

    if matches!(outcome, Err(SandboxFailure::Cancelled)) {
        sandbox.terminate(&ctx).await;
    }
    sandbox.destroy(ctx).await;

    outcome
}

async fn drive(
    sandbox: &Arc<dyn Sandbox>,
    ctx: &SandboxContext,
    source: &str,
    submission: &Submission,
    res_tx: &Sender<Submission>,
    cancel: &mut watch::Receiver<bool>,
) -> Result<ExecutionResult, SandboxFailure> {
    res_tx
        .send(submission.change_state(SubmissionState::Compiling))
        .await
        .expect(TASK_TX_ERR);

    tracing::debug!("Start compiling");
    let compiled = tokio::select! {
        res = sandbox.compile(ctx, source, &submission.compilation_limits) => res,
        _ = cancelled(cancel) => return Err(SandboxFailure::Cancelled),
    };
    tracing::debug!("Compilation result: {:?}", compiled);

    match compiled {
        Ok(()) => {}
        Err(CompileError::CompilationFailed { log }) => {
            return Err(SandboxFailure::Compile { log });
        }
        Err(CompileError::TimedOut { limit_ms }) => {
            return Err(SandboxFailure::Compile {
                log: format!("compilation exceeded {limit_ms}ms"),
            });
        }
        Err(CompileError::Internal { msg }) => {
            tracing::error!("Internal error during compilation: {}", msg);
            return Err(SandboxFailure::Infra { msg });
        }
    }

    res_tx
        .send(submission.change_state(SubmissionState::Running))
        .await
        .expect(TASK_TX_ERR);

    let result = tokio::select! {
        res = sandbox.execute(ctx, &submission.execution_limits) => res,
        _ = cancelled(cancel) => return Err(SandboxFailure::Cancelled),
    };

    match result {
        Ok(result) => Ok(result),
        Err(RunError::Internal { msg }) => {
            tracing::error!("Internal error during execution: {}", msg);
            Err(SandboxFailure::Infra { msg })
        }
    }
}

/// Resolves once cancellation is requested; never resolves if the sender
/// side is dropped without cancelling.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
