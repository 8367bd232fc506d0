//! Command execution for the Linux networking CLIs.
//!
//! Commands are always spawned from a literal argument vector. Nothing is
//! ever handed to `/bin/sh`, so interface names or addresses carrying shell
//! metacharacters reach the tool as one opaque argument.
//!
//! # Example
//!
//! ```ignore
//! use nas_os_common::shell::{self, SystemRunner, IP_CMD};
//!
//! let argv = shell::argv([IP_CMD, "link", "show", "dev", "e101-001-0"]);
//! let out = shell::run(&SystemRunner, &argv, false).await?;
//! if out.success() {
//!     println!("{}", out.text());
//! }
//! ```

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, trace};

use crate::error::{NasError, NasResult};

/// Path to the `ip` command.
pub const IP_CMD: &str = "/sbin/ip";

/// Path to the `brctl` command for legacy bridge control.
pub const BRCTL_CMD: &str = "/sbin/brctl";

/// Path to the `bridge` command for FDB manipulation.
pub const BRIDGE_CMD: &str = "/sbin/bridge";

/// The `sysctl` command, resolved through `PATH`.
pub const SYSCTL_CMD: &str = "sysctl";

/// Emitted by iproute2 when the kernel dump changed underneath it. The
/// snapshot is unreliable, so such lines never reach parsers.
pub const INTERRUPTED_DUMP_MARKER: &str = "Dump was interrupted and may be inconsistent.";

/// Fixed tracing target for command failure reports.
pub const LOG_TARGET: &str = "nas_ip";

/// Builds an owned argument vector from string-like parts.
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

/// Unprocessed result of a spawned command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// Exit code, -1 when the process was killed by a signal.
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl RawOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Result of [`run`]: exit code plus cleaned output lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// stdout followed by stderr, one entry per line, trailing whitespace
    /// stripped, interrupted-dump lines removed.
    pub lines: Vec<String>,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the output lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Spawns commands. Implemented by [`SystemRunner`] in production and by
/// scripted fakes in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `argv[0]` with the remaining elements as literal arguments and
    /// waits for it to exit. There is no timeout.
    async fn spawn(&self, argv: &[String]) -> NasResult<RawOutput>;
}

/// Runs real processes through `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn spawn(&self, argv: &[String]) -> NasResult<RawOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| NasError::invalid_argument("argv", "empty argument vector"))?;

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| NasError::Spawn {
                command: argv.join(" "),
                source: e,
            })?;

        Ok(RawOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Merges stdout and stderr into cleaned lines.
pub fn collect_lines(stdout: &str, stderr: &str) -> Vec<String> {
    stdout
        .lines()
        .chain(stderr.lines())
        .filter(|line| !line.contains(INTERRUPTED_DUMP_MARKER))
        .map(|line| line.trim_end().to_string())
        .collect()
}

/// Executes `argv` and returns its exit code and output lines.
///
/// With `log_fail` set, a non-zero exit logs the full command and every
/// output line at error level. Commands expected to fail (existence checks,
/// link-local configuration on L2 ports) pass `false`.
pub async fn run<R>(runner: &R, argv: &[String], log_fail: bool) -> NasResult<CommandOutput>
where
    R: CommandRunner + ?Sized,
{
    if argv.is_empty() {
        return Err(NasError::invalid_argument("argv", "empty argument vector"));
    }

    trace!(command = %argv.join(" "), "Executing command");
    let raw = runner.spawn(argv).await?;
    let output = CommandOutput {
        exit_code: raw.exit_code,
        lines: collect_lines(&raw.stdout, &raw.stderr),
    };

    if !output.success() {
        if log_fail {
            error!(
                target: LOG_TARGET,
                exit_code = output.exit_code,
                "Failed CMD: {}",
                argv.join(" ")
            );
            for line in &output.lines {
                error!(target: LOG_TARGET, "* {}", line);
            }
        } else {
            debug!(
                command = %argv.join(" "),
                exit_code = output.exit_code,
                "Command failed (not logged)"
            );
        }
    }

    Ok(output)
}

/// Executes `argv` and turns a non-zero exit into [`NasError::CommandFailed`].
pub async fn run_checked<R>(runner: &R, argv: &[String]) -> NasResult<CommandOutput>
where
    R: CommandRunner + ?Sized,
{
    let output = run(runner, argv, true).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(NasError::CommandFailed {
            command: argv.join(" "),
            exit_code: output.exit_code,
            output: output.text(),
        })
    }
}
