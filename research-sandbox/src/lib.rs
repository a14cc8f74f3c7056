//! # research-sandbox — sandbox runtime (C4)
//!
//! Runs untrusted code snippets under a harness that seeds a deterministic
//! RNG-equivalent (an env-var-provided seed the snippet is expected to
//! consume), injects optional JSON input via an environment variable, and
//! caps output and wall-clock time.
//!
//! Isolation policy: a [`ContainerLauncher`] is tried first (no network,
//! read-only root, ephemeral scratch, CPU/memory caps, read-only mount of
//! `base_dir` and the harness script). If the launcher reports it cannot
//! run (no container runtime available, provisioning failure), execution
//! falls back to a plain subprocess of the host interpreter with stdin
//! disabled and a fresh temporary working directory.

use async_trait::async_trait;
use research_types::ExecResult;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// The well-known path at which `base_dir` is mounted read-only inside a
/// container run, and exposed to the snippet via `SANDBOX_WORKDIR`.
pub const CONTAINER_MOUNT_PATH: &str = "/workspace";
/// Environment variable carrying the JSON input blob, if any.
pub const ENV_INPUT: &str = "SANDBOX_INPUT";
/// Environment variable carrying the deterministic seed.
pub const ENV_SEED: &str = "SANDBOX_SEED";
/// Environment variable exposing the mounted base directory, explicit
/// rather than implicit (spec.md §9 open question: the original relied on
/// an implicit `PYTHONPATH=/workspace`).
pub const ENV_WORKDIR: &str = "SANDBOX_WORKDIR";
/// Each output stream is truncated to this many bytes. Truncation is
/// silent.
pub const OUTPUT_CAP_BYTES: usize = 64 * 1024;
/// Exit code recorded on a forced timeout kill.
pub const TIMEOUT_RETURNCODE: i32 = -9;

/// Errors from sandbox provisioning. A [`ContainerLauncher`] returning
/// [`SandboxError::Unavailable`] triggers the subprocess fallback; any
/// other variant is surfaced as a tool failure by the caller.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SandboxError {
    /// No container runtime is available; fall back to subprocess.
    #[error("container isolation unavailable: {0}")]
    Unavailable(String),
    /// Failed to provision the sandbox's scratch directory or harness
    /// file.
    #[error("failed to provision sandbox: {0}")]
    Provisioning(#[from] std::io::Error),
}

/// What to run.
pub struct SandboxRequest {
    /// The snippet's source text, interpreted by `interpreter`.
    pub code: String,
    /// Optional JSON input made available via [`ENV_INPUT`].
    pub input: Option<serde_json::Value>,
    /// Wall-clock timeout, in seconds.
    pub timeout_s: u64,
    /// Deterministic seed, exposed via [`ENV_SEED`].
    pub seed: u64,
    /// Read-only directory to mount (container path) or expose via
    /// [`ENV_WORKDIR`] (subprocess path). `None` mounts nothing.
    pub base_dir: Option<PathBuf>,
    /// Host interpreter invoked on the harness script. Defaults to a
    /// POSIX shell, since the snippet language is not mandated by this
    /// core; callers targeting a specific interpreter (python3, node, …)
    /// set this explicitly.
    pub interpreter: String,
}

impl SandboxRequest {
    /// Build a request with the default shell interpreter.
    pub fn new(code: impl Into<String>, timeout_s: u64, seed: u64) -> Self {
        Self {
            code: code.into(),
            input: None,
            timeout_s,
            seed,
            base_dir: None,
            interpreter: "/bin/sh".to_string(),
        }
    }
}

/// Isolation boundary for the "preferred" execution path. A concrete
/// implementation shells out to a container runtime; tests substitute a
/// fake so the suite does not require a real runtime to be installed.
#[async_trait]
pub trait ContainerLauncher: Send + Sync {
    /// Attempt to run `req`'s harness-wrapped script in an isolated
    /// container. Returns [`SandboxError::Unavailable`] if no runtime can
    /// be provisioned, which the caller treats as "use the fallback".
    async fn run(&self, req: &SandboxRequest, harness_path: &Path) -> Result<ExecResult, SandboxError>;
}

/// A launcher that always reports unavailability, forcing the subprocess
/// fallback. Used when no container runtime is configured.
pub struct NoContainerRuntime;

#[async_trait]
impl ContainerLauncher for NoContainerRuntime {
    async fn run(&self, _req: &SandboxRequest, _harness_path: &Path) -> Result<ExecResult, SandboxError> {
        Err(SandboxError::Unavailable("no container runtime configured".into()))
    }
}

/// Build the harness script wrapping `code`. The harness sets up nothing
/// beyond what the environment already exposes (seed and input arrive via
/// env vars); it exists only to guard the user code with a top-level trap
/// so a failing snippet prints its error but does not propagate past the
/// harness.
fn harness_script(interpreter: &str, code: &str) -> String {
    if interpreter.ends_with("sh") {
        // `set +e` plus a trailing no-op keeps a failing line from
        // aborting the rest of the snippet — the harness traps, it
        // doesn't propagate.
        format!("#!/bin/sh\nset +e\n{code}\ntrue\n")
    } else {
        // Non-shell interpreters get the snippet body with no shell
        // framing; the interpreter itself is responsible for reading
        // SANDBOX_SEED / SANDBOX_INPUT from its environment.
        code.to_string()
    }
}

fn truncate_utf8_lossy(bytes: &[u8], cap: usize) -> String {
    let slice = if bytes.len() > cap { &bytes[..cap] } else { bytes };
    String::from_utf8_lossy(slice).into_owned()
}

/// The sandbox runtime: tries `launcher`, falls back to a host subprocess.
pub struct Sandbox<L: ContainerLauncher> {
    launcher: L,
}

impl Sandbox<NoContainerRuntime> {
    /// A sandbox with no container runtime — every call uses the
    /// subprocess fallback.
    pub fn subprocess_only() -> Self {
        Self {
            launcher: NoContainerRuntime,
        }
    }
}

impl<L: ContainerLauncher> Sandbox<L> {
    /// Build a sandbox around a specific container launcher.
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    /// Run `req`, preferring container isolation and falling back to a
    /// subprocess. Always returns a populated [`ExecResult`] — sandbox
    /// failure is reported via `ok=false`, never as an error, matching
    /// the `run_sandbox` tool contract (spec.md §4.6).
    pub async fn run_snippet(&self, req: SandboxRequest) -> ExecResult {
        let scratch = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "sandbox: failed to create scratch dir");
                return ExecResult {
                    ok: false,
                    stdout: String::new(),
                    stderr: format!("failed to provision sandbox: {e}"),
                    returncode: -1,
                    duration_ms: 0,
                    isolated: false,
                    container_id: None,
                };
            }
        };
        let harness_path = scratch.path().join("harness.sh");
        let script = harness_script(&req.interpreter, &req.code);
        if let Err(e) = std::fs::write(&harness_path, &script) {
            return ExecResult {
                ok: false,
                stdout: String::new(),
                stderr: format!("failed to write harness: {e}"),
                returncode: -1,
                duration_ms: 0,
                isolated: false,
                container_id: None,
            };
        }

        let started = Instant::now();
        match self.launcher.run(&req, &harness_path).await {
            Ok(result) => {
                audit(&req, &result);
                result
            }
            Err(SandboxError::Unavailable(reason)) => {
                tracing::debug!(%reason, "sandbox: falling back to subprocess isolation");
                let result = run_subprocess(&req, &harness_path, started).await;
                audit(&req, &result);
                result
            }
            Err(e) => {
                let result = ExecResult {
                    ok: false,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    returncode: -1,
                    duration_ms: started.elapsed().as_millis() as u64,
                    isolated: false,
                    container_id: None,
                };
                audit(&req, &result);
                result
            }
        }
    }
}

fn audit(req: &SandboxRequest, result: &ExecResult) {
    tracing::info!(
        isolated = result.isolated,
        container_id = result.container_id.as_deref().unwrap_or(""),
        ok = result.ok,
        returncode = result.returncode,
        duration_ms = result.duration_ms,
        seed = req.seed,
        timeout_s = req.timeout_s,
        "sandbox invocation"
    );
}

async fn run_subprocess(req: &SandboxRequest, harness_path: &Path, started: Instant) -> ExecResult {
    let workdir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => {
            return ExecResult {
                ok: false,
                stdout: String::new(),
                stderr: format!("failed to create working directory: {e}"),
                returncode: -1,
                duration_ms: started.elapsed().as_millis() as u64,
                isolated: false,
                container_id: None,
            };
        }
    };

    let mut cmd = Command::new(&req.interpreter);
    cmd.arg(harness_path)
        .current_dir(workdir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_clear()
        .env(ENV_SEED, req.seed.to_string());
    if let Some(input) = &req.input {
        cmd.env(ENV_INPUT, input.to_string());
    }
    if let Some(base_dir) = &req.base_dir {
        cmd.env(ENV_WORKDIR, base_dir);
    }
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            return ExecResult {
                ok: false,
                stdout: String::new(),
                stderr: format!("failed to spawn interpreter: {e}"),
                returncode: -1,
                duration_ms: started.elapsed().as_millis() as u64,
                isolated: false,
                container_id: None,
            };
        }
    };

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let run = tokio::time::timeout(Duration::from_secs(req.timeout_s), child.wait());
    let (returncode, timed_out) = match run.await {
        Ok(Ok(status)) => (status.code().unwrap_or(-1), false),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "sandbox: wait failed");
            (-1, false)
        }
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            (TIMEOUT_RETURNCODE, true)
        }
    };

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    if let Some(mut out) = stdout_pipe.take() {
        let _ = out.read_to_end(&mut stdout_buf).await;
    }
    if let Some(mut err) = stderr_pipe.take() {
        let _ = err.read_to_end(&mut stderr_buf).await;
    }

    ExecResult {
        ok: !timed_out && returncode == 0,
        stdout: truncate_utf8_lossy(&stdout_buf, OUTPUT_CAP_BYTES),
        stderr: truncate_utf8_lossy(&stderr_buf, OUTPUT_CAP_BYTES),
        returncode,
        duration_ms: started.elapsed().as_millis() as u64,
        isolated: false,
        container_id: None,
    }
}
