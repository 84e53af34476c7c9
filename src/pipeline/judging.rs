use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use uuid::Uuid;

use crate::constants::TASK_TX_ERR;
use crate::domain::{Submission, SubmissionState};
use crate::sandbox::{Sandbox, orchestrator};
use crate::{driver, evaluator};

/// Spawns the judging loop: submissions arrive on `judge_rx`, every state
/// transition (ending in `Done` with the report) is streamed to `res_tx`.
///
/// Each submission is judged on its own task; the semaphore is the counting
/// admission gate bounding how many sandboxes run at once. The cancellation
/// registry maps in-flight submission ids to their cancel switches.
#[tracing::instrument(skip(res_tx, judge_rx))]
pub fn handle_judging(
    res_tx: Sender<Submission>,
    mut judge_rx: Receiver<Submission>,
    sandbox: Arc<dyn Sandbox>,
    gate: Arc<Semaphore>,
    cancellations: Arc<DashMap<Uuid, watch::Sender<bool>>>,
) {
    tokio::spawn(async move {
        while let Some(submission) = judge_rx.recv().await {
            let res_tx = res_tx.clone();
            let sandbox = sandbox.clone();
            let gate = gate.clone();
            let cancellations = cancellations.clone();

            tokio::spawn(async move {
                process_submission(submission, res_tx, sandbox, gate, cancellations).await;
            });
        }
    });
}

async fn process_submission(
    submission: Submission,
    res_tx: Sender<Submission>,
    sandbox: Arc<dyn Sandbox>,
    gate: Arc<Semaphore>,
    cancellations: Arc<DashMap<Uuid, watch::Sender<bool>>>,
) {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    cancellations.insert(submission.id, cancel_tx);

    let Ok(_permit) = gate.acquire_owned().await else {
        // Gate closed: the engine is shutting down.
        cancellations.remove(&submission.id);
        return;
    };

    tracing::debug!("Start judging submission {}", submission.id);
    let source = driver::generate(&submission.signature, &submission.body, &submission.test_cases);

    let outcome = orchestrator::run(&sandbox, &source, &submission, &res_tx, cancel_rx).await;

    let report = match outcome {
        Ok(result) => evaluator::report(&result, &submission.signature, &submission.test_cases),
        Err(failure) => evaluator::failure_report(&failure, &submission.test_cases),
    };

    tracing::info!(
        "Submission {} finished: {:?}",
        submission.id,
        report.overall
    );
    let done = submission.change_state(SubmissionState::Done { report });
    res_tx.send(done).await.expect(TASK_TX_ERR);

    cancellations.remove(&submission.id);
}
