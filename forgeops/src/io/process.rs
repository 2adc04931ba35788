//! Running child processes with a timeout and bounded output capture.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Run `cmd` with stdin closed, killing it once `timeout` elapses.
///
/// Both pipes are drained on scoped reader threads while the child runs, so
/// a chatty child never stalls on a full pipe. At most `output_limit_bytes`
/// of each stream are kept.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = timeout.as_secs()))]
pub fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawn command")?;
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(anyhow!("child output was not piped"));
    };

    thread::scope(|scope| -> Result<CommandOutput> {
        let stdout = scope.spawn(move || drain(stdout, output_limit_bytes));
        let stderr = scope.spawn(move || drain(stderr, output_limit_bytes));

        let waited = child.wait_timeout(timeout).context("wait for command")?;
        let timed_out = waited.is_none();
        let status = match waited {
            Some(status) => status,
            None => {
                warn!("command timed out, killing");
                child.kill().context("kill command")?;
                child.wait().context("wait command after kill")?
            }
        };

        let output = CommandOutput {
            status,
            stdout: joined(stdout.join()).context("collect stdout")?,
            stderr: joined(stderr.join()).context("collect stderr")?,
            timed_out,
        };
        debug!(exit_code = ?status.code(), timed_out, "command finished");
        Ok(output)
    })
}

fn joined(result: thread::Result<Result<Vec<u8>>>) -> Result<Vec<u8>> {
    result.map_err(|_| anyhow!("output reader panicked"))?
}

/// Read `reader` to the end, keeping the first `limit` bytes.
fn drain<R: Read>(reader: R, limit: usize) -> Result<Vec<u8>> {
    let mut kept = Vec::new();
    let mut reader = reader.take(limit as u64);
    reader.read_to_end(&mut kept).context("read output")?;
    io::copy(&mut reader.into_inner(), &mut io::sink()).context("discard output")?;
    Ok(kept)
}
