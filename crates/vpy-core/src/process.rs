//! Blocking subprocess execution with captured output.
//!
//! The probe and the delegating creator are the only suspension points of a
//! run; both go through here.

use std::ffi::OsStr;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run a program to completion, capturing stdout and stderr.
///
/// `PYTHONPATH` is stripped from the child environment so a polluted caller
/// environment cannot leak modules into probe or builder subprocesses.
pub fn run_captured<I, S>(program: &OsStr, args: I) -> Result<RunOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .env_remove("PYTHONPATH")
        .env_remove("__PYVENV_LAUNCHER__")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = command
        .output()
        .with_context(|| format!("failed to start {}", program.to_string_lossy()))?;

    Ok(RunOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
