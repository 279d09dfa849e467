//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill on all platforms.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

use crate::application::ports::{
    CancelSignal, CommandRunner, CommandSpec, RunOutcome, wait_cancelled,
};

/// How long to wait for output readers after the child has exited or been
/// killed. Grandchildren can hold the pipes open past that point.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Production `CommandRunner` over `tokio::process`.
///
/// Timeouts and cancellation kill the child explicitly; dropping the wait
/// future alone leaves the process running on some platforms.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Kill `child` and, on unix, every process in its group.
///
/// Streaming children lead their own process group, so compiler
/// grandchildren (`rustc`, `cc`) go down with them.
#[cfg_attr(not(unix), allow(unused_variables))]
async fn kill_tree(child: &mut tokio::process::Child, program: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        let group = format!("-{pid}");
        let killed = tokio::process::Command::new("kill")
            .args(["-KILL", "--", &group])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = killed {
            tracing::debug!(%program, error = %e, "process group kill failed");
        }
    }
    let _ = child.kill().await;
}

/// Forward each line of `reader` to `tx` until EOF or the receiver is gone.
async fn forward_lines<R>(reader: Option<R>, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }

    async fn run_streaming(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
        mut cancel: CancelSignal,
        lines: mpsc::UnboundedSender<String>,
    ) -> Result<RunOutcome> {
        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }
        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn {}", spec.program))?;

        let readers = tokio::spawn({
            let stdout = forward_lines(child.stdout.take(), lines.clone());
            let stderr = forward_lines(child.stderr.take(), lines);
            async move {
                tokio::join!(stdout, stderr);
            }
        });

        let outcome = tokio::select! {
            status = child.wait() => {
                let status = status.with_context(|| format!("waiting for {}", spec.program))?;
                RunOutcome::Exited { code: status.code(), success: status.success() }
            }
            () = tokio::time::sleep(timeout) => {
                kill_tree(&mut child, &spec.program).await;
                tracing::warn!(program = %spec.program, secs = timeout.as_secs(), "killed after timeout");
                RunOutcome::TimedOut
            }
            () = wait_cancelled(&mut cancel) => {
                kill_tree(&mut child, &spec.program).await;
                tracing::info!(program = %spec.program, "killed on cancel");
                RunOutcome::Cancelled
            }
        };

        let abort = readers.abort_handle();
        if tokio::time::timeout(DRAIN_GRACE, readers).await.is_err() {
            abort.abort();
        }
        Ok(outcome)
    }
}
