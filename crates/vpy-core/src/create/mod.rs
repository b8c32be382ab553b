//! The creation pipeline: validate the destination, pick a creator, plan
//! sources, materialize them and write the bootstrap files.

mod bootstrap;
mod delegate;
mod dest;
mod distutils_patch;
mod flavors;
mod materialize;
mod refs;
mod selector;

use once_cell::sync::Lazy;
use tracing::{debug, info};

use vpy_domain::{CreatedEnv, EnvLayout, Interpreter, OsFamily, UserOptions};

use crate::errors::VenvError;

pub use flavors::BuiltinFlavor;
pub use refs::{Dest, RefKind, RefWhen, SourceRef};
pub use selector::{select, Creator};

/// Build an isolated environment for `interpreter` at the destination named
/// in `options`.
///
/// The run is idempotent: re-running over an existing environment rewrites
/// the same files and leaves anything else in the destination alone.
///
/// # Errors
///
/// [`VenvError::DestRejected`] before any write when the destination is
/// unusable; the creator-specific variants afterwards.
pub fn create_environment(
    interpreter: &Interpreter,
    options: &UserOptions,
) -> Result<CreatedEnv, VenvError> {
    let dest = dest::validate_dest(&options.dest)?;
    let mut options = options.clone();
    options.dest.clone_from(&dest);

    let creator = selector::select(interpreter, &options)?;
    let layout = EnvLayout::for_interpreter(&dest, interpreter);
    let symlinks = use_symlinks(&options, interpreter);
    info!(
        creator = creator.name(),
        %dest,
        symlinks,
        "creating environment for {interpreter}"
    );

    if options.clear && dest.exists() {
        debug!(%dest, "clearing existing destination");
        std::fs::remove_dir_all(&dest)?;
    }

    let cfg = match creator {
        Creator::Delegating => delegate::delegate_create(interpreter, &layout, &options, symlinks)?,
        Creator::Builtin(flavor) => {
            for dir in layout.directories() {
                std::fs::create_dir_all(dir)?;
            }
            for dir in (flavor.ensure_dirs)(interpreter, &layout) {
                std::fs::create_dir_all(dir)?;
            }
            let plan = (flavor.sources)(interpreter);
            debug!(refs = plan.len(), "materializing plan");
            materialize::materialize(&plan, &layout, symlinks)?;
            let cfg = bootstrap::write_pyenv_cfg(interpreter, &layout, &options)?;
            (flavor.extra_bootstrap)(interpreter, &layout)?;
            cfg
        }
    };

    distutils_patch::write_distutils_patch(&layout)?;

    Ok(CreatedEnv {
        layout,
        pyenv_cfg: cfg,
        prompt: options.effective_prompt(),
    })
}

/// Whether this run materializes through symlinks: the user may force
/// copies, and the filesystem may not support links at all.
fn use_symlinks(options: &UserOptions, interpreter: &Interpreter) -> bool {
    if options.copies {
        return false;
    }
    if interpreter.os_family() == OsFamily::Windows {
        // creating them needs a privilege most windows users lack
        return false;
    }
    *FS_SUPPORTS_SYMLINK
}

static FS_SUPPORTS_SYMLINK: Lazy<bool> = Lazy::new(fs_supports_symlink);

#[cfg(unix)]
fn fs_supports_symlink() -> bool {
    true
}

#[cfg(not(unix))]
fn fs_supports_symlink() -> bool {
    let Ok(temp) = tempfile::tempdir() else {
        return false;
    };
    let target = temp.path().join("target");
    if std::fs::write(&target, b"x").is_err() {
        return false;
    }
    std::os::windows::fs::symlink_file(&target, temp.path().join("link")).is_ok()
}
