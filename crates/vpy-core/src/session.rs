//! One end-to-end run: resolve the spec, create the environment, write the
//! activators, seed.

use tracing::info;

use vpy_domain::{CreatedEnv, PythonSpec, UserOptions};

use crate::activate::write_activators;
use crate::create::create_environment;
use crate::discovery::discover_interpreter;
use crate::errors::VenvError;
use crate::seed::seed_pip;

#[derive(Clone, Debug)]
pub struct SessionRequest {
    /// Interpreter spec text; `None` means any python on `PATH`.
    pub python: Option<String>,
    pub options: UserOptions,
}

pub fn run_session(request: &SessionRequest) -> Result<CreatedEnv, VenvError> {
    let spec = PythonSpec::parse(request.python.as_deref().unwrap_or("python"))?;
    let interpreter = discover_interpreter(&spec)?;
    info!(%interpreter, "resolved interpreter");

    let env = create_environment(&interpreter, &request.options)?;
    write_activators(&env)?;
    if request.options.seed {
        seed_pip(&env)?;
    }
    Ok(env)
}
