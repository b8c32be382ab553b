//! Seeding pip into a freshly created environment.
//!
//! The environment's own interpreter runs `ensurepip`, which installs the
//! wheels bundled with the host runtime. Creation itself never seeds; the
//! session layer decides whether to call this.

use tracing::{debug, info};

use vpy_domain::CreatedEnv;

use crate::errors::VenvError;
use crate::process::run_captured;

/// Install pip (and setuptools where the runtime bundles it) into `env`.
pub fn seed_pip(env: &CreatedEnv) -> Result<(), VenvError> {
    let exe = env.exe();
    info!(%exe, "seeding pip via ensurepip");
    let output = run_captured(
        exe.as_std_path().as_os_str(),
        ["-m", "ensurepip", "--upgrade", "--default-pip"],
    )
    .map_err(VenvError::Other)?;
    if !output.success() {
        return Err(VenvError::SeedFailed {
            dest: env.dest().to_owned(),
            exit_code: output.code,
            stderr: output.stderr,
        });
    }
    debug!(stdout = %output.stdout, "ensurepip finished");
    Ok(())
}
