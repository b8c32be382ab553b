//! Error taxonomy of the construction pipeline.
//!
//! Everything except a failed symlink (recovered locally by falling back to
//! copy) is fatal; partial output stays on disk and `--clear` starts over.

use camino::Utf8PathBuf;
use thiserror::Error;

use vpy_domain::SpecParseError;

#[derive(Debug, Error)]
pub enum VenvError {
    #[error(transparent)]
    InvalidSpec(#[from] SpecParseError),

    #[error("no interpreter satisfies the spec `{spec}`")]
    NoInterpreterFound { spec: String },

    #[error("failed to probe {executable} (exit code {exit_code}): {stderr}")]
    ProbeFailed {
        executable: Utf8PathBuf,
        exit_code: i32,
        stderr: String,
    },

    #[error("no creator available for {interpreter}")]
    NoCreatorFor { interpreter: String },

    #[error("refusing destination {dest}: {reason}")]
    DestRejected { dest: Utf8PathBuf, reason: String },

    #[error("host venv builder failed (exit code {exit_code})\nstdout: {stdout}\nstderr: {stderr}")]
    DelegateFailed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("cannot materialize {what}: missing source {src}")]
    MaterializeFailed { what: String, src: Utf8PathBuf },

    #[error("seeding pip into {dest} failed (exit code {exit_code}): {stderr}")]
    SeedFailed {
        dest: Utf8PathBuf,
        exit_code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VenvError {
    /// Process exit code the CLI maps this error to: bad user input is 2,
    /// everything else 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            VenvError::InvalidSpec(_) | VenvError::DestRejected { .. } => 2,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for VenvError {
    fn from(error: std::io::Error) -> Self {
        VenvError::Other(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_input_errors_exit_with_two() {
        let error = VenvError::DestRejected {
            dest: "a:b".into(),
            reason: "path separator".into(),
        };
        assert_eq!(error.exit_code(), 2);
        let error = VenvError::InvalidSpec(SpecParseError {
            spec: "??".into(),
            reason: "nothing recognizable in spec".into(),
        });
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn runtime_errors_exit_with_one() {
        let error = VenvError::ProbeFailed {
            executable: "/usr/bin/python3".into(),
            exit_code: 3,
            stderr: "boom".into(),
        };
        assert_eq!(error.exit_code(), 1);
        assert!(error.to_string().contains("boom"));
    }
}
