//! The delegating creator: drive the host's own `venv` module and overlay
//! our bootstrap on top of what it produced.

use tracing::info;

use vpy_domain::{EnvLayout, Interpreter, PyEnvCfg, UserOptions};

use crate::create::bootstrap::pyenv_cfg_for;
use crate::errors::VenvError;
use crate::process::run_captured;

/// Build the environment through `python -m venv` and return the merged
/// cfg. Seeding stays disabled in the subprocess; the seeder handles it
/// uniformly for every creator.
pub fn delegate_create(
    interpreter: &Interpreter,
    layout: &EnvLayout,
    options: &UserOptions,
    symlinks: bool,
) -> Result<PyEnvCfg, VenvError> {
    let host = interpreter
        .system_executable
        .clone()
        .unwrap_or_else(|| interpreter.executable.clone());

    let mut args: Vec<&str> = vec!["-m", "venv", "--without-pip"];
    if options.system_site_packages {
        args.push("--system-site-packages");
    }
    args.push(if symlinks { "--symlinks" } else { "--copies" });
    args.push(layout.dest.as_str());

    info!(exe = %host, dest = %layout.dest, "delegating to the host venv module");
    let output = run_captured(host.as_std_path().as_os_str(), &args).map_err(VenvError::Other)?;
    if !output.success() {
        return Err(VenvError::DelegateFailed {
            exit_code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    for lib in layout.libs() {
        std::fs::create_dir_all(lib)?;
    }

    // venv's own cfg values win over ours; our extra keys are kept
    let mut cfg = pyenv_cfg_for(interpreter, options);
    let venv_cfg = PyEnvCfg::read_from(layout.dest.as_std_path())?;
    cfg.merge(&venv_cfg);
    cfg.write_to(layout.dest.as_std_path())?;
    Ok(cfg)
}
