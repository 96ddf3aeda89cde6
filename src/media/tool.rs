//! Runs external media tools with an explicit argument vector and a deadline.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Only the end of stderr is kept; ffmpeg prints the cause last.
pub const STDERR_TAIL_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("i/o error while running {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn tool(&self) -> &str {
        match self {
            ToolError::Spawn { tool, .. }
            | ToolError::TimedOut { tool, .. }
            | ToolError::Failed { tool, .. }
            | ToolError::Io { tool, .. } => tool,
        }
    }

    /// Captured stderr of a non-zero exit.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ToolError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Output captured from a successful run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ToolRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Spawns `program` with `args` (no shell involved), drains stdout and
    /// stderr concurrently and waits for exit.
    ///
    /// stdout is returned whole. stderr is drained to EOF but only its last
    /// [`STDERR_TAIL_BYTES`] are kept. A non-zero exit becomes
    /// [`ToolError::Failed`] carrying that tail. On
    /// deadline expiry the child's whole process group is killed. Dropping the
    /// returned future kills the child as well.
    pub async fn run<I, S>(&self, program: &str, args: I) -> Result<ToolOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let tool = tool_name(program);
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ToolError::Spawn {
            tool: tool.clone(),
            source,
        })?;

        let (mut stdout, mut stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                terminate(&mut child).await;
                return Err(ToolError::Io {
                    tool,
                    source: io::Error::other("child output pipes were not captured"),
                });
            }
        };

        let outcome = tokio::time::timeout(self.timeout, async {
            let mut out = Vec::new();
            let (out_res, err_res, status) = tokio::join!(
                stdout.read_to_end(&mut out),
                read_tail(&mut stderr, STDERR_TAIL_BYTES),
                child.wait(),
            );
            out_res?;
            Ok::<_, io::Error>((status?, out, err_res?))
        })
        .await;

        let (status, out, err) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(source)) => {
                terminate(&mut child).await;
                return Err(ToolError::Io { tool, source });
            }
            Err(_elapsed) => {
                terminate(&mut child).await;
                warn!(tool = %tool, timeout = ?self.timeout, "tool deadline expired, process group killed");
                return Err(ToolError::TimedOut {
                    tool,
                    timeout: self.timeout,
                });
            }
        };

        let output = ToolOutput {
            status,
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !status.success() {
            warn!(tool = %tool, %status, elapsed_ms, stderr = %output.stderr.trim(), "tool failed");
            return Err(ToolError::Failed {
                tool,
                status,
                stderr: output.stderr.trim().to_string(),
            });
        }

        debug!(tool = %tool, %status, elapsed_ms, "tool finished");
        Ok(output)
    }
}

fn tool_name(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string())
}

/// Reads `reader` to EOF, keeping only the trailing `limit` bytes.
async fn read_tail<R>(reader: &mut R, limit: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut tail = Vec::with_capacity(limit.min(8 * 1024));
    let mut buf = [0u8; 8 * 1024];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(tail);
        }
        tail.extend_from_slice(&buf[..n]);
        if tail.len() > limit {
            let excess = tail.len() - limit;
            tail.drain(..excess);
        }
    }
}

async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        // The child leads its own group, so this also reaches anything it forked.
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
    let _ = child.kill().await;
}
