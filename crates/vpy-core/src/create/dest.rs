//! Destination validation, performed before anything is written.

use camino::{Utf8Path, Utf8PathBuf};

use crate::errors::VenvError;

/// The separator used to split environment-variable path lists; a
/// destination containing it would break every activation script.
const PATH_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Validate the requested destination and return it as an absolute path.
pub fn validate_dest(raw: &Utf8Path) -> Result<Utf8PathBuf, VenvError> {
    let reject = |reason: String| VenvError::DestRejected {
        dest: raw.to_owned(),
        reason,
    };

    if raw.as_str().is_empty() {
        return Err(reject("empty destination".into()));
    }
    if raw.as_str().contains(PATH_LIST_SEPARATOR) {
        return Err(reject(format!(
            "must not contain the path separator ({PATH_LIST_SEPARATOR}); \
             it would break activation scripts"
        )));
    }
    for component in raw.components() {
        let text = component.as_str();
        if text.contains('\u{0}') {
            return Err(reject("contains a NUL byte".into()));
        }
        if cfg!(windows) && text.contains(['<', '>', '"', '|', '?', '*']) {
            return Err(reject(format!(
                "component {text:?} is not representable on this filesystem"
            )));
        }
    }

    let dest = absolutize(raw)?;
    if dest.is_file() {
        return Err(reject("already exists and is a file".into()));
    }

    // some ancestor must already exist and be writable
    let mut ancestor: &Utf8Path = &dest;
    loop {
        if ancestor.exists() {
            if writable(ancestor) {
                break;
            }
            return Err(reject(format!("{ancestor} is not write-able")));
        }
        match ancestor.parent() {
            Some(parent) => ancestor = parent,
            None => return Err(reject("no writable ancestor".into())),
        }
    }

    Ok(dest)
}

fn absolutize(raw: &Utf8Path) -> Result<Utf8PathBuf, VenvError> {
    if raw.is_absolute() {
        return Ok(raw.to_owned());
    }
    let cwd = std::env::current_dir().map_err(VenvError::from)?;
    let cwd = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|cwd| VenvError::Other(anyhow::anyhow!("non-utf8 working directory {cwd:?}")))?;
    Ok(cwd.join(raw))
}

#[cfg(unix)]
fn writable(path: &Utf8Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|metadata| metadata.permissions().mode() & 0o200 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn writable(path: &Utf8Path) -> bool {
    std::fs::metadata(path)
        .map(|metadata| !metadata.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_list_separator() {
        let error = validate_dest(Utf8Path::new("a:b")).unwrap_err();
        assert!(matches!(error, VenvError::DestRejected { .. }));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn rejects_existing_file() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let error = validate_dest(Utf8Path::from_path(&file).unwrap()).unwrap_err();
        assert!(error.to_string().contains("is a file"));
    }

    #[test]
    fn accepts_fresh_dir_under_writable_parent() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("deep/nested/env");
        let validated = validate_dest(Utf8Path::from_path(&dest).unwrap()).unwrap();
        assert!(validated.is_absolute());
        assert!(!dest.exists(), "validation must not create anything");
    }

    #[test]
    fn relative_destinations_become_absolute() {
        let validated = validate_dest(Utf8Path::new("some-env")).unwrap();
        assert!(validated.is_absolute());
        assert!(validated.as_str().ends_with("some-env"));
    }
}
