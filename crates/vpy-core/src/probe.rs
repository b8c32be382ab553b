//! Interrogation of host interpreters.
//!
//! `probe` runs a short introspection program under the target binary and
//! parses the JSON it prints into an [`Interpreter`]. `probe_resolved`
//! additionally walks layered environments until the record's `system_*`
//! paths bottom out at a real installation.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Mutex;

use anyhow::anyhow;
use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use tracing::debug;

use vpy_domain::{Interpreter, OsFamily};

use crate::cache;
use crate::errors::VenvError;
use crate::process::run_captured;

/// Runs under both Python 2 and 3; may only rely on the standard library
/// since it executes before any environment exists.
const PROBE_SCRIPT: &str = r#"
from __future__ import print_function
import json
import os
import platform
import sys

try:
    import sysconfig
except ImportError:
    sysconfig = None


def text(value):
    if isinstance(value, bytes):
        return value.decode("utf-8", "replace")
    return value


def config_var(name):
    if sysconfig is None:
        return None
    value = sysconfig.get_config_var(name)
    return None if value is None else text(str(value))


prefix = text(sys.prefix)
exec_prefix = text(sys.exec_prefix)
base_prefix = text(getattr(sys, "base_prefix", None))
base_exec_prefix = text(getattr(sys, "base_exec_prefix", None))
real_prefix = text(getattr(sys, "real_prefix", None))
system_prefix = real_prefix or base_prefix or prefix
system_exec_prefix = real_prefix or base_exec_prefix or exec_prefix


def to_system(path):
    if path is None:
        return None
    for current, system in ((prefix, system_prefix), (exec_prefix, system_exec_prefix)):
        if path.startswith(current):
            return system + path[len(current):]
    return path


def scheme_path(name):
    if sysconfig is None:
        return None
    try:
        return text(sysconfig.get_path(name))
    except (KeyError, ValueError):
        return None


def fast_system_executable():
    # inside an environment the base executable is only trustworthy when the
    # runtime recorded it for us; otherwise leave it to the caller's walk
    if real_prefix or (base_prefix is not None and base_prefix != prefix):
        if real_prefix is None:
            base_executable = getattr(sys, "_base_executable", None)
            if base_executable and base_executable != sys.executable and os.path.exists(base_executable):
                return text(base_executable)
        return None
    return text(sys.executable)


try:
    __import__("venv")
    has_venv = True
except ImportError:
    has_venv = False

scheme_keys = ("stdlib", "platstdlib", "purelib", "platlib", "include", "scripts", "data")
var_keys = ("INSTSONAME", "LIBDIR", "Py_ENABLE_SHARED", "PYTHONFRAMEWORK", "Py_GIL_DISABLED")
sysconfig_vars = {}
for key in scheme_keys:
    sysconfig_vars[key] = scheme_path(key)
for key in var_keys:
    sysconfig_vars[key] = config_var(key)

data = {
    "implementation": text(platform.python_implementation()),
    "version_info": {
        "major": sys.version_info[0],
        "minor": sys.version_info[1],
        "micro": sys.version_info[2],
    },
    "architecture": 64 if sys.maxsize > 2 ** 32 else 32,
    "os": text(os.name),
    "platform": text(sys.platform),
    "executable": text(sys.executable),
    "original_executable": text(sys.executable),
    "base_executable": text(getattr(sys, "_base_executable", None)),
    "system_executable": fast_system_executable(),
    "prefix": prefix,
    "exec_prefix": exec_prefix,
    "base_prefix": base_prefix,
    "base_exec_prefix": base_exec_prefix,
    "real_prefix": real_prefix,
    "system_stdlib": to_system(scheme_path("stdlib")) or system_prefix,
    "system_stdlib_platform": to_system(scheme_path("platstdlib")) or system_exec_prefix,
    "system_include": to_system(scheme_path("include")) or system_prefix,
    "has_venv": has_venv,
    "free_threaded": config_var("Py_GIL_DISABLED") == "1",
    "file_system_encoding": text(sys.getfilesystemencoding()),
    "path": [text(i) for i in sys.path],
    "sysconfig_vars": sysconfig_vars,
}
print(json.dumps(data))
"#;

static PROBE_CACHE: Lazy<Mutex<HashMap<Utf8PathBuf, Interpreter>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Drop every in-process probe result; the next probe hits the subprocess
/// (or the disk cache) again.
pub fn clear_probe_cache() {
    PROBE_CACHE
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clear();
}

/// Describe the given binary. Results are cached per canonicalized path.
pub fn probe(executable: &Utf8Path) -> Result<Interpreter, VenvError> {
    let canonical = canonicalize(executable);
    {
        let cached = PROBE_CACHE
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(interpreter) = cached.get(&canonical) {
            return Ok(interpreter.clone());
        }
    }
    let interpreter = match cache::load(&canonical) {
        Some(interpreter) => interpreter,
        None => {
            let interpreter = probe_subprocess(executable)?;
            cache::store(&canonical, &interpreter);
            interpreter
        }
    };
    PROBE_CACHE
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .insert(canonical, interpreter.clone());
    Ok(interpreter)
}

/// Describe the given binary and resolve layered environments: the returned
/// record's `system_*` paths point at the host installation, never at an
/// intermediate environment.
pub fn probe_resolved(executable: &Utf8Path) -> Result<Interpreter, VenvError> {
    let mut current = probe(executable)?;
    let invoked = current.executable.clone();
    let mut seen_prefixes: Vec<Utf8PathBuf> = Vec::new();

    loop {
        // deliberately iterative: recursing through probes would loop over
        // layered environments
        while current.system_executable.is_none() {
            let prefix = current.system_prefix().to_owned();
            if seen_prefixes.contains(&prefix) {
                return Err(VenvError::Other(anyhow!(
                    "interpreter prefixes form a cycle: {}",
                    seen_prefixes
                        .iter()
                        .map(|prefix| prefix.as_str())
                        .collect::<Vec<_>>()
                        .join(" -> ")
                )));
            }
            debug!(prefix = %prefix, exe = %current.executable, "walking to outer interpreter");
            seen_prefixes.push(prefix.clone());
            current = discover_in_prefix(&current, &prefix)?;
        }
        let system_executable = current
            .system_executable
            .clone()
            .unwrap_or_else(|| current.executable.clone());
        if current.executable == system_executable {
            break;
        }
        current = probe(&system_executable)?;
    }

    current.executable = invoked;
    Ok(current)
}

fn probe_subprocess(executable: &Utf8Path) -> Result<Interpreter, VenvError> {
    debug!(exe = %executable, "probing interpreter");
    let output = run_captured(
        OsStr::new(executable.as_str()),
        [OsStr::new("-c"), OsStr::new(PROBE_SCRIPT)],
    )?;
    if !output.success() {
        return Err(VenvError::ProbeFailed {
            executable: executable.to_owned(),
            exit_code: output.code,
            stderr: output.stderr,
        });
    }
    serde_json::from_str(&output.stdout).map_err(|error| VenvError::ProbeFailed {
        executable: executable.to_owned(),
        exit_code: output.code,
        stderr: format!("unparseable probe payload: {error}"),
    })
}

fn canonicalize(executable: &Utf8Path) -> Utf8PathBuf {
    match executable.canonicalize_utf8() {
        Ok(canonical) => canonical,
        Err(_) => executable.to_owned(),
    }
}

/// Locate and probe the interpreter one layer further out: the binary inside
/// `prefix` that matches the probed implementation, architecture, and
/// version.
fn discover_in_prefix(
    current: &Interpreter,
    prefix: &Utf8Path,
) -> Result<Interpreter, VenvError> {
    for candidate in exe_candidates(current, prefix) {
        if !candidate.is_file() {
            continue;
        }
        let Ok(found) = probe(&candidate) else {
            continue;
        };
        if found.implementation == current.implementation
            && found.architecture == current.architecture
            && found.version_info == current.version_info
        {
            return Ok(found);
        }
        debug!(exe = %candidate, "refused host candidate: metadata differs");
    }
    Err(VenvError::Other(anyhow!(
        "failed to find the host interpreter of {} inside {prefix}",
        current.executable
    )))
}

fn exe_candidates(current: &Interpreter, prefix: &Utf8Path) -> Vec<Utf8PathBuf> {
    let version = current.version_info;
    let mut stems = vec![
        current.implementation.name().to_ascii_lowercase(),
        "python".to_string(),
    ];
    stems.dedup();
    let suffix = if current.os_family() == OsFamily::Windows {
        ".exe"
    } else {
        ""
    };

    let mut folders = vec![prefix.to_owned()];
    match current.os_family() {
        OsFamily::Posix => folders.push(prefix.join("bin")),
        OsFamily::Windows => folders.push(prefix.join("Scripts")),
    }
    // mirror where the current binary sits relative to its own prefix
    if let Some(bin_dir) = current.executable.parent() {
        if let Ok(relative) = bin_dir.strip_prefix(&current.prefix) {
            folders.push(prefix.join(relative));
        }
    }

    let mut candidates = Vec::new();
    for folder in folders {
        for stem in &stems {
            for name in [
                format!("{stem}{}.{}{suffix}", version.major, version.minor),
                format!("{stem}{}{suffix}", version.major),
                format!("{stem}{suffix}"),
            ] {
                let candidate = folder.join(name);
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{cpython, find_python};

    #[test]
    fn probe_script_is_ascii_and_self_contained() {
        assert!(PROBE_SCRIPT.is_ascii());
        // only stdlib imports, nothing from site-packages
        for line in PROBE_SCRIPT.lines() {
            if let Some(module) = line.strip_prefix("import ") {
                assert!(
                    ["json", "os", "platform", "sys", "sysconfig"].contains(&module),
                    "unexpected import {module}"
                );
            }
        }
    }

    #[test]
    fn probe_failure_captures_stderr() {
        let missing = Utf8Path::new("/vpy/definitely/not/python");
        assert!(probe(missing).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn probes_a_real_interpreter_when_available() {
        let Some(python) = find_python() else {
            eprintln!("skipping probe test (python not found)");
            return;
        };
        std::env::set_var("VPY_NO_CACHE", "1");
        let interpreter = probe(&python).expect("probe");
        assert!(interpreter.version_info.major >= 2);
        assert!(interpreter.executable.as_str().contains("python"));
        assert!(!interpreter.system_stdlib.as_str().is_empty());

        let resolved = probe_resolved(&python).expect("resolve");
        assert!(resolved.system_executable.is_some());
        // the system prefix of a resolved record is never itself an env
        assert!(!resolved
            .system_prefix()
            .join("pyvenv.cfg")
            .exists());
    }

    #[test]
    fn candidates_cover_versioned_names() {
        let mut interpreter = cpython(3, 11);
        interpreter.prefix = "/venv".into();
        interpreter.executable = "/venv/bin/python".into();
        let candidates = exe_candidates(&interpreter, Utf8Path::new("/usr"));
        let names: Vec<&str> = candidates.iter().map(|exe| exe.as_str()).collect();
        assert!(names.contains(&"/usr/bin/python3.11"));
        assert!(names.contains(&"/usr/bin/python"));
    }

    #[test]
    fn probe_payload_deserializes_into_the_record() {
        let payload = serde_json::json!({
            "implementation": "CPython",
            "version_info": {"major": 3, "minor": 11, "micro": 4},
            "architecture": 64,
            "os": "posix",
            "platform": "linux",
            "executable": "/usr/bin/python3.11",
            "original_executable": "/usr/bin/python3.11",
            "base_executable": null,
            "system_executable": "/usr/bin/python3.11",
            "prefix": "/usr",
            "exec_prefix": "/usr",
            "base_prefix": null,
            "base_exec_prefix": null,
            "real_prefix": null,
            "system_stdlib": "/usr/lib/python3.11",
            "system_stdlib_platform": "/usr/lib/python3.11",
            "system_include": "/usr/include/python3.11",
            "has_venv": true,
            "free_threaded": false,
            "file_system_encoding": "utf-8",
            "path": ["/usr/lib/python3.11"],
            "sysconfig_vars": {"LIBDIR": "/usr/lib", "Py_ENABLE_SHARED": "1", "PYTHONFRAMEWORK": null}
        });
        let interpreter: Interpreter = serde_json::from_value(payload).unwrap();
        assert!(interpreter.has_venv);
        assert_eq!(interpreter.sysconfig_var("LIBDIR"), Some("/usr/lib"));
        assert!(interpreter.sysconfig_flag("Py_ENABLE_SHARED"));
        assert_eq!(interpreter.sysconfig_var("PYTHONFRAMEWORK"), None);
    }
}
