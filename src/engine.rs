use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{Sender, channel};
use tokio::sync::watch;
use uuid::Uuid;

use crate::constants::JUDGE_TX_ERR;
use crate::domain::{Submission, SubmissionReport, SubmissionState};
use crate::evaluator;
use crate::pipeline::handle_judging;
use crate::sandbox::{Sandbox, SandboxFailure};

/// Facade over the judging pipeline. Holds the sandbox capability, the
/// bounded admission gate shared by all concurrent runs, and the registry
/// of in-flight cancellation switches.
#[derive(Clone, Debug)]
pub struct JudgeEngine {
    sandbox: Arc<dyn Sandbox>,
    gate: Arc<Semaphore>,
    cancellations: Arc<DashMap<Uuid, watch::Sender<bool>>>,
}

impl JudgeEngine {
    pub fn new(sandbox: Arc<dyn Sandbox>, max_concurrent: usize) -> Self {
        Self {
            sandbox,
            gate: Arc::new(Semaphore::new(max_concurrent)),
            cancellations: Arc::new(DashMap::new()),
        }
    }

    /// Judges one submission to completion and returns its report. Never
    /// hangs: the sandbox watchdog bounds time-to-verdict.
    #[tracing::instrument(skip(self, submission), fields(submission_id = %submission.id))]
    pub async fn judge(&self, submission: Submission) -> SubmissionReport {
        let cases = submission.test_cases.clone();
        let (res_tx, mut res_rx) = channel(32);
        self.submit(submission, res_tx).await;

        while let Some(update) = res_rx.recv().await {
            if let SubmissionState::Done { report } = update.state {
                return report;
            }
        }

        // The pipeline task died without a terminal state.
        evaluator::failure_report(
            &SandboxFailure::Infra {
                msg: "judge pipeline ended without a verdict".to_string(),
            },
            &cases,
        )
    }

    /// Queues a submission and streams every state transition, ending with
    /// `Done`, to `res_tx`.
    pub async fn submit(&self, submission: Submission, res_tx: Sender<Submission>) {
        let (judge_tx, judge_rx) = channel(1);
        handle_judging(
            res_tx,
            judge_rx,
            self.sandbox.clone(),
            self.gate.clone(),
            self.cancellations.clone(),
        );
        judge_tx.send(submission).await.expect(JUDGE_TX_ERR);
    }

    /// Requests cancellation of an in-flight submission. Returns false when
    /// the submission is unknown or already finished.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.cancellations.get(&id) {
            Some(entry) => entry.send(true).is_ok(),
            None => false,
        }
    }
}
