pub const TASK_TX_ERR: &str = "Failed to send submission to res_tx";
pub const JUDGE_TX_ERR: &str = "Failed to send submission to judge_tx";

/// Defaults for constrained execution environments.
pub const DEFAULT_COMPILE_TIME_MS: u64 = 10_000;
pub const DEFAULT_RUN_TIME_MS: u64 = 5_000;
pub const DEFAULT_MEMORY_BYTES: u64 = 256 * 1024 * 1024;
pub const DEFAULT_OUTPUT_BYTES: u64 = 1024 * 1024;

/// Wire contract between the generated driver and the evaluator:
/// `Test <n> - Output: <actual>, Expected: <expected>`, one line per case.
pub const TEST_LINE_PREFIX: &str = "Test ";
pub const OUTPUT_MARKER: &str = " - Output: ";
pub const EXPECTED_MARKER: &str = ", Expected: ";

/// Printed by the generated driver in place of a result when the user's
/// method throws. Non-numeric and bracket-free, so it can never be mistaken
/// for a rendered value.
pub const RUNTIME_ERROR_MARKER: &str = "RUNTIME_ERROR";

/// Hard cap on reconstructed list/tree sizes. Oversized input fails parsing
/// instead of exhausting memory.
pub const MAX_NODES: usize = 1 << 16;
