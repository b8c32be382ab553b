//! Resolution of a user spec to a concrete host interpreter.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use vpy_domain::{Interpreter, PythonSpec};

use crate::errors::VenvError;
use crate::probe::probe_resolved;

/// Find an interpreter satisfying `spec`: an absolute path is probed
/// directly, anything else is looked up on `PATH` under the names the spec
/// implies.
pub fn discover_interpreter(spec: &PythonSpec) -> Result<Interpreter, VenvError> {
    if let Some(path) = &spec.path {
        // an explicit path that probes successfully is trusted as given;
        // wrapper scripts report the wrapped binary as sys.executable, so
        // no name comparison would hold
        return probe_resolved(path);
    }

    for name in candidate_names(spec) {
        let Ok(found) = which::which(&name) else {
            continue;
        };
        let Some(found) = Utf8PathBuf::from_path_buf(found).ok() else {
            continue;
        };
        debug!(%name, exe = %found, "probing discovery candidate");
        let Ok(interpreter) = probe_resolved(&found) else {
            continue;
        };
        if spec.satisfied_by(&interpreter) {
            return Ok(interpreter);
        }
        debug!(exe = %found, "candidate does not satisfy spec");
    }
    Err(VenvError::NoInterpreterFound {
        spec: spec.to_string(),
    })
}

/// Probe the interpreter at an explicit path, without spec filtering.
pub fn probe_path(path: &Utf8Path) -> Result<Interpreter, VenvError> {
    probe_resolved(path)
}

fn candidate_names(spec: &PythonSpec) -> Vec<String> {
    let stem = spec
        .implementation
        .clone()
        .unwrap_or_else(|| "python".to_string());
    let threaded = if spec.free_threaded == Some(true) {
        "t"
    } else {
        ""
    };
    let mut names = Vec::new();
    match (spec.major, spec.minor) {
        (Some(major), Some(minor)) => {
            names.push(format!("{stem}{major}.{minor}{threaded}"));
            names.push(format!("{stem}{major}"));
        }
        (Some(major), None) => names.push(format!("{stem}{major}{threaded}")),
        _ => {}
    }
    names.push(stem.clone());
    if stem != "python" {
        // fall back to the generic name; satisfied_by still filters
        names.push("python3".to_string());
        names.push("python".to_string());
    } else if spec.major != Some(2) {
        names.insert(names.len() - 1, "python3".to_string());
    }
    names.dedup();
    names
}
