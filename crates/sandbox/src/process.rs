//! Subprocess sandbox.

use crate::config::SandboxConfig;
use crate::{Result, Sandbox, SandboxError};
use async_trait::async_trait;
use optiloop_core::{BenchmarkResult, CodeArtifact, ExecutionOutcome};
use regex::Regex;
use std::io::Write;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Marker the memory harness writes to stderr before exiting.
pub const MEMORY_MARKER: &str = "__OPTILOOP_PEAK_MB__";

/// Runs the target file under tracemalloc and reports the peak on stderr.
const MEMORY_HARNESS: &str = r#"import runpy, sys, tracemalloc
sys.argv = sys.argv[1:]
tracemalloc.start()
try:
    runpy.run_path(sys.argv[0], run_name="__main__")
finally:
    _, _peak = tracemalloc.get_traced_memory()
    sys.stderr.write("\n__OPTILOOP_PEAK_MB__=%f\n" % (_peak / (1024 * 1024)))
"#;

/// Input fed to programs that read from stdin.
const INJECTED_INPUT: &str = "10\n";

/// Runs code with a local interpreter in its own process group.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    config: SandboxConfig,
    marker_re: Regex,
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

impl ProcessSandbox {
    /// Create a sandbox.
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            marker_re: Regex::new(r"\n?__OPTILOOP_PEAK_MB__=([0-9.eE+-]+)\n?")
                .expect("Invalid memory marker regex"),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Split the memory marker out of stderr.
    fn extract_peak(&self, stderr: &str) -> (f64, String) {
        match self.marker_re.captures(stderr) {
            Some(caps) => {
                let peak = caps[1].parse::<f64>().unwrap_or(0.0);
                (peak.max(0.0), self.marker_re.replace_all(stderr, "").into_owned())
            }
            None => (0.0, stderr.to_string()),
        }
    }

    async fn run(&self, code: &CodeArtifact, timeout: Duration) -> Result<ExecutionOutcome> {
        let mut file = tempfile::Builder::new()
            .prefix("optiloop-")
            .suffix(".py")
            .tempfile()?;
        file.write_all(code.text().as_bytes())?;
        file.flush()?;

        let mut cmd = Command::new(&self.config.interpreter);
        if self.config.measure_memory {
            cmd.arg("-c").arg(MEMORY_HARNESS);
        }
        cmd.arg(file.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| SandboxError::Spawn {
            interpreter: self.config.interpreter.clone(),
            source,
        })?;
        let pid = child.id();

        if let Some(mut stdin) = child.stdin.take() {
            if code.text().contains("input(") {
                // The child may exit without reading; a broken pipe is not an error here.
                if let Err(e) = stdin.write_all(INJECTED_INPUT.as_bytes()).await {
                    debug!("Failed to write stdin: {}", e);
                }
            }
            drop(stdin);
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::Io(std::io::Error::other("stdout not captured")))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SandboxError::Io(std::io::Error::other("stderr not captured")))?;

        let result = tokio::time::timeout(timeout, async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (out_res, err_res) =
                tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
            out_res?;
            err_res?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out, err))
        })
        .await;

        match result {
            Ok(Ok((status, out, err))) => {
                let runtime = start.elapsed().as_secs_f64();
                let stderr = String::from_utf8_lossy(&err).to_string();
                let (memory_mb, stderr) = self.extract_peak(&stderr);
                let return_code = status.code().unwrap_or(-1);
                debug!(
                    "Execution finished: code {} in {:.3}s, peak {:.2} MB",
                    return_code, runtime, memory_mb
                );
                Ok(ExecutionOutcome {
                    success: status.success(),
                    output: String::from_utf8_lossy(&out).to_string(),
                    error: if stderr.trim().is_empty() {
                        None
                    } else {
                        Some(stderr)
                    },
                    runtime_seconds: runtime,
                    memory_mb,
                    return_code,
                    timed_out: false,
                })
            }
            Ok(Err(e)) => Err(SandboxError::Io(e)),
            Err(_) => {
                warn!("Execution timed out after {:.2}s, killing process group", timeout.as_secs_f64());
                kill_group(pid);
                if let Err(e) = child.kill().await {
                    debug!("Failed to kill child: {}", e);
                }
                Ok(ExecutionOutcome {
                    success: false,
                    output: String::new(),
                    error: Some(format!("Execution timeout after {:.2}s", timeout.as_secs_f64())),
                    runtime_seconds: timeout.as_secs_f64(),
                    memory_mb: 0.0,
                    return_code: -1,
                    timed_out: true,
                })
            }
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[async_trait]
impl Sandbox for ProcessSandbox {
    async fn execute(&self, code: &CodeArtifact, timeout: Option<Duration>) -> ExecutionOutcome {
        let timeout = timeout.unwrap_or_else(|| self.config.timeout_for(code.chars()));
        match self.run(code, timeout).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Sandbox error: {}", e);
                ExecutionOutcome::failed(e.to_string())
            }
        }
    }

    async fn benchmark(&self, code: &CodeArtifact) -> BenchmarkResult {
        let runs = self.config.runs.max(1);
        let mut successes = Vec::with_capacity(runs);
        let mut last_failure: Option<ExecutionOutcome> = None;

        for _ in 0..runs {
            let outcome = self.execute(code, None).await;
            if outcome.success {
                successes.push(outcome);
            } else {
                last_failure = Some(outcome);
            }
        }

        if successes.is_empty() {
            let failure = last_failure.unwrap_or_else(|| ExecutionOutcome::failed("All benchmark runs failed"));
            return BenchmarkResult {
                success: false,
                runtime: failure.runtime_seconds,
                memory: failure.memory_mb,
                test_pass_rate: 0.0,
                error: Some(
                    failure
                        .error
                        .unwrap_or_else(|| format!("exit code {}", failure.return_code)),
                ),
                runs,
            };
        }

        let count = successes.len() as f64;
        let runtime = successes.iter().map(|o| o.runtime_seconds).sum::<f64>() / count;
        let memory = successes.iter().map(|o| o.memory_mb).sum::<f64>() / count;
        let mut result = BenchmarkResult::succeeded(runtime, memory, count / runs as f64);
        result.runs = runs;
        result
    }
}
