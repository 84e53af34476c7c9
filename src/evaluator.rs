use std::collections::HashMap;

use crate::codec;
use crate::constants::{EXPECTED_MARKER, OUTPUT_MARKER, RUNTIME_ERROR_MARKER, TEST_LINE_PREFIX};
use crate::domain::{
    ExecutionResult, ExitStatus, MethodSignature, SubmissionReport, TestCase, Verdict, VerdictKind,
};
use crate::sandbox::SandboxFailure;

/// Parses the captured stdout against the canonical line format and produces
/// one fresh verdict per test case, preserving input order. Lines that do
/// not match the format are ignored for scoring.
pub fn evaluate(
    result: &ExecutionResult,
    signature: &MethodSignature,
    cases: &[TestCase],
) -> Vec<Verdict> {
    let lines: HashMap<usize, (String, String)> = result
        .stdout
        .lines()
        .filter_map(parse_line)
        .map(|(idx, actual, expected)| (idx, (actual.to_string(), expected.to_string())))
        .collect();

    cases
        .iter()
        .enumerate()
        .map(|(pos, case)| {
            let index = pos + 1;
            if case.inputs.len() != signature.params.len() {
                return Verdict {
                    case: index,
                    kind: VerdictKind::InfraError,
                    actual: String::new(),
                    expected: case.expected.clone(),
                    message: Some(format!(
                        "case supplies {} parameters, signature declares {}",
                        case.inputs.len(),
                        signature.params.len()
                    )),
                };
            }

            match lines.get(&index) {
                Some((actual, _)) if actual == RUNTIME_ERROR_MARKER => Verdict {
                    case: index,
                    kind: VerdictKind::RuntimeError,
                    actual: actual.clone(),
                    expected: case.expected.clone(),
                    message: Some("method invocation threw".to_string()),
                },
                Some((actual, expected)) => Verdict {
                    case: index,
                    kind: compare(actual, expected, signature),
                    actual: actual.clone(),
                    expected: expected.clone(),
                    message: None,
                },
                None => missing_line_verdict(index, case, result.status),
            }
        })
        .collect()
}

/// Builds the submission report for a completed run.
pub fn report(
    result: &ExecutionResult,
    signature: &MethodSignature,
    cases: &[TestCase],
) -> SubmissionReport {
    SubmissionReport::from_verdicts(evaluate(result, signature, cases))
}

/// Builds the report for a run that never produced output: the failure kind
/// applies to every case and to the submission as a whole.
pub fn failure_report(failure: &SandboxFailure, cases: &[TestCase]) -> SubmissionReport {
    let kind = match failure {
        SandboxFailure::Compile { .. } => VerdictKind::CompileError,
        SandboxFailure::Infra { .. } => VerdictKind::InfraError,
        SandboxFailure::Cancelled => VerdictKind::Cancelled,
    };
    let message = failure.to_string();

    let verdicts = cases
        .iter()
        .enumerate()
        .map(|(pos, case)| Verdict {
            case: pos + 1,
            kind,
            actual: String::new(),
            expected: case.expected.clone(),
            message: Some(message.clone()),
        })
        .collect();

    SubmissionReport {
        verdicts,
        overall: kind,
    }
}

/// `Test <n> - Output: <actual>, Expected: <expected>` -> (n, actual,
/// expected). The first separator occurrence wins, matching how the driver
/// prints the line.
fn parse_line(line: &str) -> Option<(usize, &str, &str)> {
    let rest = line.strip_prefix(TEST_LINE_PREFIX)?;
    let (index, rest) = rest.split_once(OUTPUT_MARKER)?;
    let index: usize = index.trim().parse().ok()?;
    let (actual, expected) = rest.split_once(EXPECTED_MARKER)?;
    Some((index, actual.trim(), expected.trim()))
}

fn compare(actual: &str, expected: &str, signature: &MethodSignature) -> VerdictKind {
    let equal = match (
        codec::parse(actual, signature.returns),
        codec::parse(expected, signature.returns),
    ) {
        (Ok(a), Ok(e)) => a.approx_eq(&e),
        // Unparseable output falls back to exact textual comparison.
        _ => actual == expected,
    };
    if equal {
        VerdictKind::Pass
    } else {
        VerdictKind::WrongAnswer
    }
}

/// A case whose line never appeared inherits its verdict from how the
/// process ended, not WrongAnswer.
fn missing_line_verdict(index: usize, case: &TestCase, status: ExitStatus) -> Verdict {
    let kind = match status {
        ExitStatus::TimedOut => VerdictKind::Timeout,
        ExitStatus::MemoryExceeded => VerdictKind::MemoryExceeded,
        ExitStatus::Exited(_) | ExitStatus::Signaled(_) => VerdictKind::RuntimeError,
    };
    Verdict {
        case: index,
        kind,
        actual: String::new(),
        expected: case.expected.clone(),
        message: Some("no output line for this case".to_string()),
    }
}
