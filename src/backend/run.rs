//! Subprocess plumbing shared by the Git and Mercurial backends
//!
//! Every VCS invocation funnels through [`run`] or [`run_checked`] so the
//! environment pinning and error formatting stay in one place. Prompting is
//! disabled unconditionally; an operation that would need credentials fails
//! instead of hanging the pipeline.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Captured output of a finished VCS subprocess.
pub(super) struct CmdOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Decoded stdout
    pub stdout: String,
    /// Decoded stderr
    pub stderr: String,
}

impl CmdOutput {
    /// Combined output for error messages and pattern checks.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim_end().to_string();
        let err = self.stderr.trim_end();
        if !err.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(err);
        }
        text
    }
}

/// Run a VCS command and capture its output regardless of exit status.
///
/// Used where a non-zero exit is meaningful (conflicts, "no changes").
pub(super) fn run(program: &str, args: &[&str], cwd: &Path) -> Result<CmdOutput> {
    debug!(program, ?args, "running vcs command");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GCM_INTERACTIVE", "never")
        .env("HGPLAIN", "1")
        .output()
        .map_err(|e| Error::Backend(format!("failed to run {program}: {e}")))?;

    let out = CmdOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !out.success {
        debug!(program, code = ?out.code, stderr = %out.stderr.trim_end(), "vcs command failed");
    }

    Ok(out)
}

/// Run a VCS command and require exit status 0.
///
/// Returns trimmed stdout on success; maps failure to [`Error::Backend`]
/// with the full command line and combined output, enough for manual
/// reproduction.
pub(super) fn run_checked(program: &str, args: &[&str], cwd: &Path) -> Result<String> {
    let out = run(program, args, cwd)?;
    if out.success {
        Ok(out.stdout.trim().to_string())
    } else {
        Err(Error::Backend(format!(
            "`{program} {}` failed: {}",
            args.join(" "),
            out.combined()
        )))
    }
}
