//! Bootstrap files written into every environment: `pyvenv.cfg`, and for
//! major-2 hosts the `site.py` shim that stands in for the missing startup
//! machinery.

use camino::Utf8PathBuf;

use vpy_domain::{EnvLayout, Interpreter, PyEnvCfg, UserOptions};

use crate::errors::VenvError;

/// Build the cfg describing `interpreter` as the base of an environment.
/// Key order is part of the format we emit; rewrites stay byte-stable.
#[must_use]
pub fn pyenv_cfg_for(interpreter: &Interpreter, options: &UserOptions) -> PyEnvCfg {
    let host = interpreter
        .system_executable
        .clone()
        .unwrap_or_else(|| interpreter.executable.clone());
    let home = host.parent().map_or_else(|| host.clone(), Utf8PathBuf::from);
    let mut cfg = PyEnvCfg::new();
    cfg.insert("home", home.as_str());
    cfg.insert("implementation", interpreter.implementation.name());
    cfg.insert("version_info", interpreter.version_str());
    cfg.insert(
        "include-system-site-packages",
        if options.system_site_packages {
            "true"
        } else {
            "false"
        },
    );
    cfg.insert("base-prefix", interpreter.system_prefix().as_str());
    cfg.insert("base-exec-prefix", interpreter.system_exec_prefix().as_str());
    cfg.insert("base-executable", host.as_str());
    // only an explicit prompt is recorded; activators still default to the
    // directory name
    if let Some(prompt) = &options.prompt {
        cfg.insert("prompt", prompt);
    }
    cfg
}

/// Write `pyvenv.cfg` at the environment root and return it.
pub fn write_pyenv_cfg(
    interpreter: &Interpreter,
    layout: &EnvLayout,
    options: &UserOptions,
) -> Result<PyEnvCfg, VenvError> {
    let cfg = pyenv_cfg_for(interpreter, options);
    cfg.write_to(layout.dest.as_std_path())
        .map_err(VenvError::from)?;
    Ok(cfg)
}

/// `site.py` placed in the environment's stdlib directory of python2
/// environments. The runtime imports it before anything else is usable, so
/// the file may only rely on builtins until it has fixed `sys.path`.
const SITE_SHIM: &str = r#""""Python 2 startup bootstrap for this environment.

Only builtins may be imported before the path is fixed up.
"""
import sys


def main():
    config = read_pyvenv_cfg()
    sys.real_prefix = sys.base_prefix = config["base-prefix"]
    sys.base_exec_prefix = config["base-exec-prefix"]
    sys.base_executable = config["base-executable"]
    wants_global_site = config.get("include-system-site-packages", "") == "true"
    remap_stdlib_paths()
    disable_user_site()
    load_host_site()
    if wants_global_site:
        enable_global_site()


def read_pyvenv_cfg():
    sep = "\\" if sys.platform == "win32" else "/"
    path = "{}{}pyvenv.cfg".format(sys.prefix, sep)
    config = {}
    with open(path) as handle:
        for line in handle:
            try:
                at = line.index("=")
            except ValueError:
                continue
            config[line[:at].strip()] = line[at + 1 :].strip()
    return config


def remap_stdlib_paths():
    """Interpreter startup resolved the stdlib relative to this environment;
    point those entries back at the base installation."""
    sep = "\\" if sys.platform == "win32" else "/"
    exe_dir = sys.executable[: sys.executable.rfind(sep)]
    base_exe_dir = sys.base_executable[: sys.base_executable.rfind(sep)]
    for at, value in enumerate(sys.path):
        if value == exe_dir:
            continue
        if value.startswith(exe_dir):
            sys.path[at] = base_exe_dir + value[len(exe_dir) :]
        elif value.startswith(sys.prefix):
            sys.path[at] = sys.base_prefix + value[len(sys.prefix) :]
        elif value.startswith(sys.exec_prefix):
            sys.path[at] = sys.base_exec_prefix + value[len(sys.exec_prefix) :]


def disable_user_site():
    # sys.flags is a c-level struct; swap in a writable clone
    sys.original_flags = sys.flags

    class Flags(object):
        def __init__(self):
            self.__dict__ = {
                key: getattr(sys.flags, key) for key in dir(sys.flags) if not key.startswith("_")
            }

    sys.flags = Flags()
    sys.flags.no_user_site = 1


def load_host_site():
    here = __file__
    # with the stdlib paths remapped, reloading resolves to the base
    # installation's site module and runs its normal initialisation
    reload(sys.modules["site"])  # noqa: F821

    # the reload replaced this module's globals; from here on nothing
    # defined above may be referenced without a guard
    import json
    import os

    site_packages = r"""
    ___EXPECTED_SITE_PACKAGES___
    """
    add_site_dir = getattr(sys.modules["site"], "addsitedir", None)
    if add_site_dir is not None:
        for relative in json.loads(site_packages):
            full = os.path.abspath(os.path.join(os.path.dirname(here), relative))
            if full not in sys.path:
                add_site_dir(full)


def enable_global_site():
    import site

    sys.flags = sys.original_flags
    site.ENABLE_USER_SITE = None
    saved = site.PREFIXES
    try:
        site.PREFIXES = [sys.base_prefix, sys.base_exec_prefix]
        site.main()
    finally:
        site.PREFIXES = saved


main()
"#;

/// Install the python2 `site.py` shim into the environment's stdlib
/// directory.
pub fn write_site_shim(_interpreter: &Interpreter, layout: &EnvLayout) -> Result<(), VenvError> {
    let packed = serde_json::to_string(&relative_site_packages(layout))
        .map_err(|error| VenvError::Other(error.into()))?;
    let content = SITE_SHIM.replace("___EXPECTED_SITE_PACKAGES___", &packed);
    std::fs::create_dir_all(&layout.stdlib_dir)?;
    std::fs::write(layout.stdlib_dir.join("site.py"), content)?;
    Ok(())
}

/// Site-package directories as paths relative to the stdlib directory, the
/// form the shim resolves them in.
fn relative_site_packages(layout: &EnvLayout) -> Vec<String> {
    layout
        .libs()
        .into_iter()
        .map(|lib| {
            lib.strip_prefix(&layout.stdlib_dir)
                .map_or_else(|_| lib.to_string(), |relative| relative.to_string())
        })
        .collect()
}
