#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod interpreter;
pub mod layout;
pub mod pyenv_cfg;
pub mod spec;

pub use interpreter::{Implementation, Interpreter, OsFamily, VersionInfo};
pub use layout::{CreatedEnv, EnvLayout, UserOptions};
pub use pyenv_cfg::{PyEnvCfg, PYENV_CFG};
pub use spec::{PythonSpec, SpecParseError};
