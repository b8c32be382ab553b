//! The record a probed Python interpreter is described by.
//!
//! One `Interpreter` corresponds to one concrete binary on the host. It is
//! produced by deserializing the JSON payload the introspection script
//! prints, and is immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Interpreter implementation tag. Treated as opaque outside of creator
/// selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Implementation {
    CPython,
    PyPy,
    Other(String),
}

impl From<String> for Implementation {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "cpython" => Implementation::CPython,
            "pypy" => Implementation::PyPy,
            _ => Implementation::Other(raw),
        }
    }
}

impl From<Implementation> for String {
    fn from(implementation: Implementation) -> Self {
        implementation.name().to_string()
    }
}

impl Implementation {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Implementation::CPython => "CPython",
            Implementation::PyPy => "PyPy",
            Implementation::Other(name) => name,
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OsFamily {
    Posix,
    Windows,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionInfo {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

/// Description of one host runtime, as reported by the runtime itself.
///
/// The `system_*` accessors resolve transitively through layered
/// environments: they never point back at an environment produced by this
/// tool, always at a real installation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interpreter {
    pub implementation: Implementation,
    pub version_info: VersionInfo,
    /// 32 or 64.
    pub architecture: u32,
    /// `os.name`: `posix` or `nt`.
    pub os: String,
    /// `sys.platform`: `linux`, `darwin`, `win32`, ...
    pub platform: String,
    pub executable: Utf8PathBuf,
    /// The path the interpreter was actually invoked through; differs from
    /// `executable` when shim scripts are in play.
    pub original_executable: Utf8PathBuf,
    /// `sys._base_executable`, when the runtime exposes it.
    pub base_executable: Option<Utf8PathBuf>,
    /// The host installation's executable. `None` straight out of the probe
    /// when the binary sits inside an environment; filled in by the
    /// resolve-to-system walk.
    pub system_executable: Option<Utf8PathBuf>,
    pub prefix: Utf8PathBuf,
    pub exec_prefix: Utf8PathBuf,
    pub base_prefix: Option<Utf8PathBuf>,
    pub base_exec_prefix: Option<Utf8PathBuf>,
    /// Set by pre-pyvenv.cfg virtualenvs.
    pub real_prefix: Option<Utf8PathBuf>,
    pub system_stdlib: Utf8PathBuf,
    pub system_stdlib_platform: Utf8PathBuf,
    pub system_include: Utf8PathBuf,
    /// Whether the host ships the `venv` environment builder module.
    pub has_venv: bool,
    pub free_threaded: bool,
    pub file_system_encoding: String,
    /// `sys.path` of the probed runtime.
    pub path: Vec<String>,
    /// Install-scheme variables. Only the enumerated subset the pipeline
    /// reads is meaningful; everything else is unspecified.
    pub sysconfig_vars: BTreeMap<String, Option<String>>,
}

impl Interpreter {
    #[must_use]
    pub fn os_family(&self) -> OsFamily {
        if self.os == "nt" {
            OsFamily::Windows
        } else {
            OsFamily::Posix
        }
    }

    /// Install root of the host installation.
    #[must_use]
    pub fn system_prefix(&self) -> &Utf8Path {
        self.real_prefix
            .as_deref()
            .or(self.base_prefix.as_deref())
            .unwrap_or(&self.prefix)
    }

    /// Install root for platform-dependent files of the host installation.
    #[must_use]
    pub fn system_exec_prefix(&self) -> &Utf8Path {
        self.real_prefix
            .as_deref()
            .or(self.base_exec_prefix.as_deref())
            .unwrap_or(&self.exec_prefix)
    }

    /// `major.minor.micro`.
    #[must_use]
    pub fn version_str(&self) -> String {
        self.version_info.to_string()
    }

    /// `pythonX.Y`, the conventional versioned directory / binary stem.
    #[must_use]
    pub fn python_name(&self) -> String {
        format!(
            "python{}.{}",
            self.version_info.major, self.version_info.minor
        )
    }

    /// Whether this binary runs inside a PEP 405 environment.
    #[must_use]
    pub fn is_venv(&self) -> bool {
        self.version_info.major == 3
            && self
                .base_prefix
                .as_deref()
                .is_some_and(|base| base != self.prefix)
    }

    /// Whether this binary runs inside a legacy (pre-PEP 405) virtualenv.
    #[must_use]
    pub fn is_old_virtualenv(&self) -> bool {
        self.real_prefix.is_some()
    }

    #[must_use]
    pub fn sysconfig_var(&self, key: &str) -> Option<&str> {
        self.sysconfig_vars
            .get(key)
            .and_then(|value| value.as_deref())
    }

    /// True when the sysconfig variable is set to a non-empty, non-zero
    /// value, the way `Py_ENABLE_SHARED` style flags are reported.
    #[must_use]
    pub fn sysconfig_flag(&self, key: &str) -> bool {
        matches!(self.sysconfig_var(key), Some(value) if !value.is_empty() && value != "0")
    }

    /// The mac framework builds need their own creator; everything else
    /// follows the plain posix layout.
    #[must_use]
    pub fn is_mac_framework(&self) -> bool {
        if self.platform != "darwin" {
            return false;
        }
        let expected = if self.version_info.major == 3 {
            "Python3"
        } else {
            "Python"
        };
        self.sysconfig_var("PYTHONFRAMEWORK") == Some(expected)
    }

    /// Windows store pythons live under a sandboxed prefix and cannot be
    /// laid out by the builtin creators.
    #[must_use]
    pub fn is_windows_store(&self) -> bool {
        self.os_family() == OsFamily::Windows
            && self
                .system_prefix()
                .as_str()
                .replace('/', "\\")
                .contains("\\Microsoft\\WindowsApps\\")
    }
}

impl fmt::Display for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{} at {}",
            self.implementation,
            self.version_str(),
            self.architecture,
            self.executable
        )
    }
}
