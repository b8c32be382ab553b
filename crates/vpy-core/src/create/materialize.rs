//! Executes a plan of source refs against the destination.
//!
//! This is the only component that writes interpreter files into the
//! environment. Planners stay pure; everything filesystem-shaped funnels
//! through here.

use camino::Utf8Path;
use tracing::{debug, warn};

use vpy_domain::EnvLayout;

use crate::create::refs::{relative_to_sibling, RefKind, RefWhen, SourceRef};
use crate::errors::VenvError;

/// Materialize every applicable ref. `symlinks` is the mode chosen for the
/// run; refs that are forced one way or the other override it per file.
pub fn materialize(
    refs: &[SourceRef],
    layout: &EnvLayout,
    symlinks: bool,
) -> Result<(), VenvError> {
    for source_ref in refs {
        match source_ref.when {
            RefWhen::CopyOnly if symlinks && !source_ref.must_copy => {
                debug!(src = %source_ref.src, "skipping copy-only ref in symlink mode");
                continue;
            }
            RefWhen::SymlinkOnly if !symlinks => {
                debug!(src = %source_ref.src, "skipping symlink-only ref in copy mode");
                continue;
            }
            _ => {}
        }
        if !source_ref.src.exists() {
            if source_ref.must_exist {
                return Err(VenvError::MaterializeFailed {
                    what: "required source is missing".into(),
                    src: source_ref.src.clone(),
                });
            }
            debug!(src = %source_ref.src, "optional source missing, skipped");
            continue;
        }
        let dest = source_ref.dest_path(layout);
        let link = symlinks && !source_ref.must_copy;
        place(source_ref, &dest, link)?;
        if source_ref.kind == RefKind::Executable {
            alias_links(source_ref, &dest, symlinks)?;
        }
    }
    Ok(())
}

fn place(source_ref: &SourceRef, dest: &Utf8Path, link: bool) -> Result<(), VenvError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    remove_stale(dest)?;
    if link {
        match symlink(&source_ref.src, dest, source_ref.kind == RefKind::Directory) {
            Ok(()) => return Ok(()),
            Err(error) => {
                warn!(src = %source_ref.src, %dest, %error, "symlink failed, copying instead");
            }
        }
    }
    match source_ref.kind {
        RefKind::Directory => copy_tree(&source_ref.src, dest)?,
        RefKind::Executable => {
            std::fs::copy(&source_ref.src, dest)?;
            mark_executable(dest)?;
        }
        RefKind::File | RefKind::DllOrExt => {
            std::fs::copy(&source_ref.src, dest)?;
        }
    }
    Ok(())
}

/// Secondary names for an executable: relative symlinks to the primary
/// where possible, otherwise fresh copies.
fn alias_links(source_ref: &SourceRef, primary: &Utf8Path, symlinks: bool) -> Result<(), VenvError> {
    let Some(dir) = primary.parent() else {
        return Ok(());
    };
    for alias in &source_ref.aliases {
        let dest = dir.join(alias);
        remove_stale(&dest)?;
        if symlinks {
            let target = relative_to_sibling(&dest, primary);
            match symlink(&target, &dest, false) {
                Ok(()) => continue,
                Err(error) => {
                    warn!(%dest, %error, "alias symlink failed, copying instead");
                }
            }
        }
        std::fs::copy(primary, &dest)?;
        mark_executable(&dest)?;
    }
    Ok(())
}

fn remove_stale(dest: &Utf8Path) -> Result<(), VenvError> {
    // symlink_metadata so dangling links are seen too
    let Ok(metadata) = dest.symlink_metadata() else {
        return Ok(());
    };
    if metadata.is_dir() {
        std::fs::remove_dir_all(dest)?;
    } else {
        std::fs::remove_file(dest)?;
    }
    Ok(())
}

fn copy_tree(src: &Utf8Path, dest: &Utf8Path) -> Result<(), VenvError> {
    std::fs::create_dir_all(dest)?;
    for entry in src.read_dir_utf8().map_err(VenvError::from)? {
        let entry = entry.map_err(VenvError::from)?;
        let target = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(VenvError::from)?;
        if file_type.is_dir() {
            copy_tree(entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(src: &Utf8Path, dest: &Utf8Path, _directory: bool) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(windows)]
fn symlink(src: &Utf8Path, dest: &Utf8Path, directory: bool) -> std::io::Result<()> {
    if directory {
        std::os::windows::fs::symlink_dir(src, dest)
    } else {
        std::os::windows::fs::symlink_file(src, dest)
    }
}

#[cfg(unix)]
fn mark_executable(path: &Utf8Path) -> Result<(), VenvError> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn mark_executable(_path: &Utf8Path) -> Result<(), VenvError> {
    Ok(())
}
