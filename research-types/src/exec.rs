//! Sandboxed code execution results.

use serde::{Deserialize, Serialize};

/// The outcome of running a code snippet in the sandbox runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecResult {
    /// Whether the run completed without error and without timing out.
    pub ok: bool,
    /// Captured stdout, truncated to a fixed byte cap.
    pub stdout: String,
    /// Captured stderr, truncated to a fixed byte cap.
    pub stderr: String,
    /// Process exit code. `-9` signals a forced timeout kill.
    pub returncode: i32,
    /// Wall-clock duration of the run, in milliseconds.
    pub duration_ms: u64,
    /// Whether the run executed inside a container (`true`) or the
    /// subprocess fallback (`false`).
    pub isolated: bool,
    /// Container identifier, if `isolated`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}
