pub mod codec;
pub mod constants;
pub mod domain;
pub mod driver;
pub mod engine;
pub mod evaluator;
pub mod pipeline;
pub mod sandbox;


pub use domain::{
    ExecutionLimits, ExecutionResult, ExitStatus, MethodSignature, Param, ParamType, Submission,
    SubmissionReport, SubmissionState, TestCase, Verdict, VerdictKind,
};
pub use engine::JudgeEngine;
pub use sandbox::{ProcessSandbox, Sandbox};

use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber with env-based filtering plus a panic hook
/// that routes panics through tracing. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
