use uuid::Uuid;

use crate::constants::{
    DEFAULT_COMPILE_TIME_MS, DEFAULT_MEMORY_BYTES, DEFAULT_OUTPUT_BYTES, DEFAULT_RUN_TIME_MS,
};

/// Semantic types a method parameter or return value can have. Test-case
/// literals are interpreted against these via the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Int,
    IntArray,
    Str,
    StrArray,
    Double,
    LinkedListOfInt,
    BinaryTreeOfInt,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
}

impl Param {
    pub fn new(name: &str, ty: ParamType) -> Self {
        Param {
            name: name.to_string(),
            ty,
        }
    }
}

/// Immutable once a submission is accepted.
#[derive(Clone, Debug)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: ParamType,
}

/// One concrete set of input literals plus the expected-output literal.
/// Identified by its 1-based position within the submission.
#[derive(Clone, Debug)]
pub struct TestCase {
    pub inputs: Vec<String>,
    pub expected: String,
}

impl TestCase {
    pub fn new(inputs: &[&str], expected: &str) -> Self {
        TestCase {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            expected: expected.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CompilationLimits {
    pub time_ms: Option<u64>,
    pub memory_bytes: Option<u64>,
}

impl Default for CompilationLimits {
    fn default() -> Self {
        CompilationLimits {
            time_ms: Some(DEFAULT_COMPILE_TIME_MS),
            memory_bytes: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionLimits {
    pub time_ms: Option<u64>,
    pub memory_bytes: Option<u64>,
    pub stdout_size_bytes: Option<u64>,
    pub stderr_size_bytes: Option<u64>,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        ExecutionLimits {
            time_ms: Some(DEFAULT_RUN_TIME_MS),
            memory_bytes: Some(DEFAULT_MEMORY_BYTES),
            stdout_size_bytes: Some(DEFAULT_OUTPUT_BYTES),
            stderr_size_bytes: Some(DEFAULT_OUTPUT_BYTES),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Submission {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub signature: MethodSignature,
    pub body: String,
    pub test_cases: Vec<TestCase>,
    pub compilation_limits: CompilationLimits,
    pub execution_limits: ExecutionLimits,
    pub state: SubmissionState,
}

impl Submission {
    pub fn new(signature: MethodSignature, body: &str, test_cases: Vec<TestCase>) -> Self {
        let now = chrono::Utc::now();
        Submission {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            signature,
            body: body.to_string(),
            test_cases,
            compilation_limits: CompilationLimits::default(),
            execution_limits: ExecutionLimits::default(),
            state: SubmissionState::default(),
        }
    }

    pub fn change_state(&self, new_state: SubmissionState) -> Self {
        Self {
            state: new_state,
            updated_at: chrono::Utc::now(),
            ..self.clone()
        }
    }
}

/// Every submission moves through these states in order and terminates in
/// `Done`, which always carries a report: compile and infra failures show up
/// as the report's overall verdict rather than as extra terminal states.
#[derive(Clone, Debug)]
pub enum SubmissionState {
    Pending,
    Provisioning,
    Compiling,
    Running,
    Done { report: SubmissionReport },
}

impl Default for SubmissionState {
    fn default() -> Self {
        SubmissionState::Pending
    }
}

/// How the sandboxed process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
    TimedOut,
    MemoryExceeded,
}

/// Captured once per submission run; never mutated afterwards.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub peak_memory_bytes: u64,
}

/// Declaration order is severity order: the overall verdict of a submission
/// is the maximum across its cases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerdictKind {
    Pass,
    WrongAnswer,
    RuntimeError,
    Timeout,
    MemoryExceeded,
    Cancelled,
    InfraError,
    CompileError,
}

#[derive(Clone, Debug)]
pub struct Verdict {
    /// 1-based test-case index.
    pub case: usize,
    pub kind: VerdictKind,
    pub actual: String,
    pub expected: String,
    pub message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SubmissionReport {
    pub verdicts: Vec<Verdict>,
    pub overall: VerdictKind,
}

impl SubmissionReport {
    pub fn from_verdicts(verdicts: Vec<Verdict>) -> Self {
        let overall = verdicts
            .iter()
            .map(|v| v.kind)
            .max()
            .unwrap_or(VerdictKind::Pass);
        SubmissionReport { verdicts, overall }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> MethodSignature {
        MethodSignature {
            name: "reverse".to_string(),
            params: vec![Param::new("x", ParamType::Int)],
            returns: ParamType::Int,
        }
    }

    #[test]
    fn test_change_state_keeps_identity() {
        let submission = Submission::new(signature(), "return 0;", vec![]);
        let updated = submission.change_state(SubmissionState::Compiling);

        assert_eq!(updated.id, submission.id);
        assert_eq!(updated.created_at, submission.created_at);
        assert!(matches!(updated.state, SubmissionState::Compiling));
        assert!(matches!(submission.state, SubmissionState::Pending));
    }

    #[test]
    fn test_overall_verdict_is_worst_case() {
        let verdict = |kind| Verdict {
            case: 1,
            kind,
            actual: String::new(),
            expected: String::new(),
            message: None,
        };

        let report = SubmissionReport::from_verdicts(vec![
            verdict(VerdictKind::Pass),
            verdict(VerdictKind::Timeout),
            verdict(VerdictKind::WrongAnswer),
        ]);
        assert_eq!(report.overall, VerdictKind::Timeout);

        let report = SubmissionReport::from_verdicts(vec![]);
        assert_eq!(report.overall, VerdictKind::Pass);
    }

    #[test]
    fn test_compile_error_outranks_everything() {
        let kinds = [
            VerdictKind::Pass,
            VerdictKind::WrongAnswer,
            VerdictKind::RuntimeError,
            VerdictKind::Timeout,
            VerdictKind::MemoryExceeded,
            VerdictKind::Cancelled,
            VerdictKind::InfraError,
        ];
        for kind in kinds {
            assert!(kind < VerdictKind::CompileError);
        }
    }
}
