//! Parsed user interpreter requests.
//!
//! A spec is an abstract requirement over interpreters: `3.12`,
//! `python3.11`, `pypy2`, `311`, `3.13t`, `cpython3-64`, `>=3.10,<3.13`, or
//! an absolute path. Every field is optional; an interpreter satisfies the
//! spec when every populated field matches.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use pep440_rs::{Version, VersionSpecifiers};
use thiserror::Error;

use crate::interpreter::Interpreter;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid interpreter spec {spec:?}: {reason}")]
pub struct SpecParseError {
    pub spec: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct PythonSpec {
    /// The request as given by the user.
    pub request: String,
    pub implementation: Option<String>,
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub micro: Option<u64>,
    pub architecture: Option<u32>,
    pub free_threaded: Option<bool>,
    pub path: Option<Utf8PathBuf>,
    pub version_specifier: Option<VersionSpecifiers>,
}

impl PythonSpec {
    /// Parse a textual spec.
    pub fn parse(raw: &str) -> Result<Self, SpecParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(err(raw, "empty spec"));
        }
        if looks_like_path(trimmed) {
            return Ok(PythonSpec {
                request: raw.to_string(),
                path: Some(Utf8PathBuf::from(trimmed)),
                ..PythonSpec::default()
            });
        }

        let (implementation, rest) = split_implementation(trimmed);
        // `py`/`python` mean "any implementation"; a bare one is the
        // wildcard spec every interpreter satisfies
        let wildcard_name = matches!(
            implementation,
            Some(name) if name.eq_ignore_ascii_case("py") || name.eq_ignore_ascii_case("python")
        );
        let implementation = if wildcard_name {
            None
        } else {
            implementation.map(str::to_string)
        };

        // `cpython>=3.10` style: everything after the name is a PEP 440 range
        if rest.starts_with(['<', '>', '=', '~', '!']) {
            let specifiers = VersionSpecifiers::from_str(rest)
                .map_err(|error| err(raw, &format!("bad version specifier: {error}")))?;
            return Ok(PythonSpec {
                request: raw.to_string(),
                implementation,
                version_specifier: Some(specifiers),
                ..PythonSpec::default()
            });
        }

        let (rest, architecture) = split_architecture(raw, rest)?;
        let (rest, free_threaded) = match rest.strip_suffix('t') {
            Some(stripped) => (stripped, Some(true)),
            None => (rest, None),
        };

        let mut spec = PythonSpec {
            request: raw.to_string(),
            implementation,
            architecture,
            free_threaded,
            ..PythonSpec::default()
        };
        if !rest.is_empty() {
            let (major, minor, micro) = parse_version(raw, rest)?;
            spec.major = major;
            spec.minor = minor;
            spec.micro = micro;
        }
        if !wildcard_name
            && spec.implementation.is_none()
            && spec.major.is_none()
            && spec.architecture.is_none()
            && spec.free_threaded.is_none()
        {
            return Err(err(raw, "nothing recognizable in spec"));
        }
        Ok(spec)
    }

    #[must_use]
    pub fn is_path(&self) -> bool {
        self.path.is_some()
    }

    /// Whether the probed interpreter satisfies this request.
    ///
    /// A path spec carries no constraints beyond the path itself; resolving
    /// it means probing that path, and the probe reports `sys.executable`,
    /// which differs from the invoked path for wrapper scripts. So path
    /// specs match any successfully probed interpreter.
    #[must_use]
    pub fn satisfied_by(&self, interpreter: &Interpreter) -> bool {
        if let Some(implementation) = &self.implementation {
            if !implementation.eq_ignore_ascii_case(interpreter.implementation.name()) {
                return false;
            }
        }
        if let Some(architecture) = self.architecture {
            if architecture != interpreter.architecture {
                return false;
            }
        }
        if let Some(free_threaded) = self.free_threaded {
            if free_threaded != interpreter.free_threaded {
                return false;
            }
        }
        let version = interpreter.version_info;
        for (requested, actual) in [
            (self.major, version.major),
            (self.minor, version.minor),
            (self.micro, version.micro),
        ] {
            if matches!(requested, Some(requested) if requested != actual) {
                return false;
            }
        }
        if let Some(specifiers) = &self.version_specifier {
            let Ok(candidate) = Version::from_str(&interpreter.version_str()) else {
                return false;
            };
            if !specifiers.contains(&candidate) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for PythonSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.request)
    }
}

fn err(spec: &str, reason: &str) -> SpecParseError {
    SpecParseError {
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}

fn looks_like_path(raw: &str) -> bool {
    let path = std::path::Path::new(raw);
    path.is_absolute() || raw.contains(std::path::MAIN_SEPARATOR) || raw.contains('/')
}

/// Split the leading alphabetic implementation name, if any.
fn split_implementation(raw: &str) -> (Option<&str>, &str) {
    let end = raw
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(raw.len());
    if end == 0 {
        return (None, raw);
    }
    // a trailing `t` belongs to the free-threaded marker only when a version
    // follows, so `pypyt` stays an implementation name
    (Some(&raw[..end]), &raw[end..])
}

fn split_architecture<'a>(
    spec: &str,
    rest: &'a str,
) -> Result<(&'a str, Option<u32>), SpecParseError> {
    if let Some(stripped) = rest.strip_suffix("-64") {
        return Ok((stripped, Some(64)));
    }
    if let Some(stripped) = rest.strip_suffix("-32") {
        return Ok((stripped, Some(32)));
    }
    if rest.contains('-') {
        return Err(err(spec, "architecture must be -32 or -64"));
    }
    Ok((rest, None))
}

type VersionTriple = (Option<u64>, Option<u64>, Option<u64>);

fn parse_version(spec: &str, raw: &str) -> Result<VersionTriple, SpecParseError> {
    let parts: Vec<&str> = raw.split('.').filter(|part| !part.is_empty()).collect();
    let numbers: Vec<u64> = parts
        .iter()
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| err(spec, &format!("bad version component {part:?}")))
        })
        .collect::<Result<_, _>>()?;
    match numbers.as_slice() {
        [] => Ok((None, None, None)),
        // `311` is shorthand for 3.11
        [single] if parts.len() == 1 => {
            let text = parts[0];
            if *single > 9 {
                let major = text[..1]
                    .parse::<u64>()
                    .map_err(|_| err(spec, "bad version"))?;
                let minor = text[1..]
                    .parse::<u64>()
                    .map_err(|_| err(spec, "bad version"))?;
                Ok((Some(major), Some(minor), None))
            } else {
                Ok((Some(*single), None, None))
            }
        }
        [major, minor] => Ok((Some(*major), Some(*minor), None)),
        [major, minor, micro] => Ok((Some(*major), Some(*minor), Some(*micro))),
        _ => Err(err(spec, "at most three version components")),
    }
}
