use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{Duration, Instant, timeout};
use uuid::Uuid;

use crate::constants::{
    DEFAULT_COMPILE_TIME_MS, DEFAULT_MEMORY_BYTES, DEFAULT_OUTPUT_BYTES, DEFAULT_RUN_TIME_MS,
};
use crate::domain::{CompilationLimits, ExecutionLimits, ExecutionResult, ExitStatus};
use crate::sandbox::{CompileError, RunError, Sandbox, SandboxContext, SandboxError};

const SOURCE_FILE: &str = "solution.cpp";
const ARTIFACT_FILE: &str = "solution";

/// Sandbox backed by plain OS processes: one fresh working directory per
/// run, g++ as the compiler, rlimits plus a dedicated process group for the
/// executed artifact, and a wall-clock watchdog that kills the whole group.
#[derive(Debug)]
pub struct ProcessSandbox {
    base_dir: PathBuf,
    gnucpp_path: PathBuf,
    groups: DashMap<Uuid, i32>,
}

impl ProcessSandbox {
    pub fn new<T, U>(base_dir: T, gnucpp_path: U) -> std::io::Result<Self>
    where
        T: AsRef<Path>,
        U: AsRef<Path>,
    {
        // Unique per instance so two engines on one host never collide.
        let base_dir = base_dir.as_ref().join(format!("sandbox_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            gnucpp_path: gnucpp_path.as_ref().into(),
            groups: DashMap::new(),
        })
    }

    pub fn from_env() -> std::io::Result<Self> {
        let gnucpp = std::env::var("GNUCPP_PATH").unwrap_or_else(|_| "/usr/bin/g++".to_string());
        Self::new(std::env::temp_dir().join("judge-engine"), gnucpp)
    }
}

#[async_trait::async_trait]
impl Sandbox for ProcessSandbox {
    #[tracing::instrument]
    async fn provision(&self) -> Result<SandboxContext, SandboxError> {
        let id = Uuid::new_v4();
        let workdir = self.base_dir.join(id.to_string());
        fs::create_dir_all(&workdir)
            .await
            .map_err(|e| SandboxError::Provision {
                msg: format!("{}: {e}", workdir.display()),
            })?;
        Ok(SandboxContext { id, workdir })
    }

    #[tracing::instrument(skip(source))]
    async fn compile(
        &self,
        ctx: &SandboxContext,
        source: &str,
        limits: &CompilationLimits,
    ) -> Result<(), CompileError> {
        let source_path = ctx.workdir.join(SOURCE_FILE);
        let artifact_path = ctx.workdir.join(ARTIFACT_FILE);

        fs::write(&source_path, source)
            .await
            .map_err(|e| CompileError::Internal {
                msg: format!("failed to write source file: {e}"),
            })?;

        let mut cmd = Command::new(&self.gnucpp_path);
        cmd.arg("-std=c++17")
            .arg("-O2")
            .arg("-o")
            .arg(&artifact_path)
            .arg(&source_path)
            .current_dir(&ctx.workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let limit_ms = limits.time_ms.unwrap_or(DEFAULT_COMPILE_TIME_MS);
        let output = match timeout(Duration::from_millis(limit_ms), cmd.output()).await {
            Ok(result) => result.map_err(|e| CompileError::Internal {
                msg: format!("failed to execute {}: {e}", self.gnucpp_path.display()),
            })?,
            Err(_) => return Err(CompileError::TimedOut { limit_ms }),
        };

        if !output.status.success() {
            return Err(CompileError::CompilationFailed {
                log: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        if !fs::try_exists(&artifact_path).await.unwrap_or(false) {
            return Err(CompileError::Internal {
                msg: format!("artifact was not created at {}", artifact_path.display()),
            });
        }

        Ok(())
    }

    #[tracing::instrument]
    async fn execute(
        &self,
        ctx: &SandboxContext,
        limits: &ExecutionLimits,
    ) -> Result<ExecutionResult, RunError> {
        let artifact_path = ctx.workdir.join(ARTIFACT_FILE);
        let memory_limit = limits.memory_bytes.unwrap_or(DEFAULT_MEMORY_BYTES);
        let time_limit_ms = limits.time_ms.unwrap_or(DEFAULT_RUN_TIME_MS);

        let mut cmd = Command::new(&artifact_path);
        cmd.current_dir(&ctx.workdir)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        apply_isolation(&mut cmd, memory_limit, time_limit_ms);

        let mut child = cmd.spawn().map_err(|e| RunError::Internal {
            msg: format!("failed to spawn {}: {e}", artifact_path.display()),
        })?;
        let pid = child.id().map(|p| p as i32);
        if let Some(pid) = pid {
            self.groups.insert(ctx.id, pid);
        }

        let stdout_task = tokio::spawn(read_capped(
            child.stdout.take(),
            limits.stdout_size_bytes.unwrap_or(DEFAULT_OUTPUT_BYTES),
        ));
        let stderr_task = tokio::spawn(read_capped(
            child.stderr.take(),
            limits.stderr_size_bytes.unwrap_or(DEFAULT_OUTPUT_BYTES),
        ));

        let peak = Arc::new(AtomicU64::new(0));
        if let Some(pid) = pid {
            tokio::spawn(watch_peak_memory(pid, peak.clone()));
        }

        let started = Instant::now();
        let status = match timeout(Duration::from_millis(time_limit_ms), child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                self.groups.remove(&ctx.id);
                return Err(RunError::Internal {
                    msg: format!("failed to wait for process: {e}"),
                });
            }
            Err(_) => {
                // Watchdog expired: kill the whole group, then reap.
                let _ = child.start_kill();
                if let Some(pid) = pid {
                    kill_group(pid);
                }
                let _ = child.wait().await;
                None
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;
        self.groups.remove(&ctx.id);

        // Streams are drained even on abnormal termination; the kill closed
        // the pipes, so these finish promptly.
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let peak_memory_bytes = peak.load(Ordering::Relaxed);

        let status = match status {
            None => ExitStatus::TimedOut,
            Some(status) => match status.code() {
                Some(code) => ExitStatus::Exited(code),
                None => {
                    let signal = exit_signal(&status);
                    if peak_memory_bytes >= memory_limit {
                        ExitStatus::MemoryExceeded
                    } else {
                        ExitStatus::Signaled(signal)
                    }
                }
            },
        };

        Ok(ExecutionResult {
            status,
            stdout,
            stderr,
            duration_ms,
            peak_memory_bytes,
        })
    }

    #[tracing::instrument]
    async fn terminate(&self, ctx: &SandboxContext) {
        if let Some(entry) = self.groups.get(&ctx.id) {
            tracing::debug!("terminating process group {} of sandbox {}", *entry, ctx.id);
            kill_group(*entry);
        }
    }

    #[tracing::instrument]
    async fn destroy(&self, ctx: SandboxContext) {
        self.groups.remove(&ctx.id);
        if let Err(e) = fs::remove_dir_all(&ctx.workdir).await {
            tracing::warn!(
                "failed to remove sandbox dir {}: {}",
                ctx.workdir.display(),
                e
            );
        }
    }
}

impl Drop for ProcessSandbox {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.base_dir);
    }
}

async fn read_capped<R>(reader: Option<R>, cap: u64) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };
    let mut buf = Vec::new();
    let mut capped = reader.take(cap);
    let _ = capped.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).to_string()
}

/// Runs the artifact in its own session/process group with hard rlimits:
/// address space from the memory ceiling, CPU seconds derived from the wall
/// clock (a backstop in case the watchdog task is starved), no core dumps.
#[cfg(unix)]
fn apply_isolation(cmd: &mut Command, memory_bytes: u64, time_ms: u64) {
    let cpu_secs = time_ms / 1000 + 1;
    unsafe {
        cmd.pre_exec(move || {
            if libc::setsid() == -1 && libc::setpgid(0, 0) == -1 {
                return Err(std::io::Error::last_os_error());
            }

            let address = libc::rlimit {
                rlim_cur: memory_bytes as libc::rlim_t,
                rlim_max: memory_bytes as libc::rlim_t,
            };
            if libc::setrlimit(libc::RLIMIT_AS, &address) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            let cpu = libc::rlimit {
                rlim_cur: cpu_secs as libc::rlim_t,
                rlim_max: cpu_secs as libc::rlim_t,
            };
            if libc::setrlimit(libc::RLIMIT_CPU, &cpu) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            let core = libc::rlimit {
                rlim_cur: 0,
                rlim_max: 0,
            };
            if libc::setrlimit(libc::RLIMIT_CORE, &core) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn apply_isolation(_cmd: &mut Command, _memory_bytes: u64, _time_ms: u64) {}

#[cfg(unix)]
fn kill_group(pid: i32) {
    unsafe {
        libc::killpg(pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: i32) {}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> i32 {
    -1
}

/// Samples VmHWM from /proc while the process lives. Best-effort: the task
/// ends itself once the proc entry disappears.
#[cfg(unix)]
async fn watch_peak_memory(pid: i32, peak: Arc<AtomicU64>) {
    let path = format!("/proc/{pid}/status");
    loop {
        let Ok(text) = tokio::fs::read_to_string(&path).await else {
            break;
        };
        if let Some(kb) = vm_hwm_kb(&text) {
            peak.fetch_max(kb * 1024, Ordering::Relaxed);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[cfg(not(unix))]
async fn watch_peak_memory(_pid: i32, _peak: Arc<AtomicU64>) {}

#[cfg(unix)]
fn vm_hwm_kb(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with("VmHWM:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gnucpp_path() -> String {
        std::env::var("GNUCPP_PATH").unwrap_or_else(|_| "/usr/bin/g++".to_string())
    }

    fn gnucpp_available() -> bool {
        std::process::Command::new(gnucpp_path())
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn sandbox() -> ProcessSandbox {
        ProcessSandbox::new(std::env::temp_dir().join("judge-engine-tests"), gnucpp_path())
            .expect("Failed to create sandbox")
    }

    const HELLO_CODE: &str = r#"
        #include <iostream>
        int main() {
            std::cout << "Hello, World!" << std::endl;
            return 0;
        }"#;

    const BROKEN_CODE: &str = r#"
        #include <iostream>
        int main() {
            std::cout << "Hello, World!" << std::endl
            return 0;
        }"#;

    const SPIN_CODE: &str = r#"
        int main() {
            for (;;) {}
            return 0;
        }"#;

    #[tokio::test]
    async fn test_from_env_provisions() {
        let sandbox = ProcessSandbox::from_env().expect("Failed to create sandbox");
        let ctx = sandbox.provision().await.unwrap();
        assert!(ctx.workdir.exists());
        sandbox.destroy(ctx).await;
    }

    #[tokio::test]
    async fn test_provision_creates_distinct_workdirs() {
        let sandbox = sandbox();
        let a = sandbox.provision().await.unwrap();
        let b = sandbox.provision().await.unwrap();

        assert_ne!(a.workdir, b.workdir);
        assert!(a.workdir.exists());
        assert!(b.workdir.exists());

        sandbox.destroy(a.clone()).await;
        assert!(!a.workdir.exists());
        sandbox.destroy(b).await;
    }

    #[tokio::test]
    async fn test_compile_and_execute_hello() {
        if !gnucpp_available() {
            eprintln!("skipping: g++ not found");
            return;
        }

        let sandbox = sandbox();
        let ctx = sandbox.provision().await.unwrap();

        sandbox
            .compile(&ctx, HELLO_CODE, &CompilationLimits::default())
            .await
            .expect("Compilation should succeed");

        let result = sandbox
            .execute(&ctx, &ExecutionLimits::default())
            .await
            .expect("Execution should succeed");

        assert_eq!(result.status, ExitStatus::Exited(0));
        assert_eq!(result.stdout, "Hello, World!\n");
        assert!(result.stderr.is_empty());

        sandbox.destroy(ctx).await;
    }

    #[tokio::test]
    async fn test_compile_error_carries_log() {
        if !gnucpp_available() {
            eprintln!("skipping: g++ not found");
            return;
        }

        let sandbox = sandbox();
        let ctx = sandbox.provision().await.unwrap();

        let result = sandbox
            .compile(&ctx, BROKEN_CODE, &CompilationLimits::default())
            .await;
        assert!(matches!(
            result,
            Err(CompileError::CompilationFailed { .. })
        ));

        sandbox.destroy(ctx).await;
    }

    #[tokio::test]
    async fn test_missing_compiler_is_internal() {
        let sandbox =
            ProcessSandbox::new(std::env::temp_dir().join("judge-engine-tests"), "/aboba")
                .expect("Failed to create sandbox");
        let ctx = sandbox.provision().await.unwrap();

        let result = sandbox
            .compile(&ctx, HELLO_CODE, &CompilationLimits::default())
            .await;
        assert!(matches!(result, Err(CompileError::Internal { .. })));

        sandbox.destroy(ctx).await;
    }

    #[tokio::test]
    async fn test_watchdog_kills_spinning_process() {
        if !gnucpp_available() {
            eprintln!("skipping: g++ not found");
            return;
        }

        let sandbox = sandbox();
        let ctx = sandbox.provision().await.unwrap();
        sandbox
            .compile(&ctx, SPIN_CODE, &CompilationLimits::default())
            .await
            .expect("Compilation should succeed");

        let limits = ExecutionLimits {
            time_ms: Some(500),
            ..ExecutionLimits::default()
        };
        let started = std::time::Instant::now();
        let result = sandbox.execute(&ctx, &limits).await.unwrap();

        assert_eq!(result.status, ExitStatus::TimedOut);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        sandbox.destroy(ctx).await;
    }
}
