//! Activation scripts, rendered from embedded templates into the
//! environment's script directory.
//!
//! Each shell gets its own template; all of them share the same placeholder
//! set, substituted at write time.

use tracing::debug;

use vpy_domain::{CreatedEnv, OsFamily};

use crate::errors::VenvError;

const BASH_TEMPLATE: &str = r#"# Source this file (". bin/activate"); it cannot be run directly.

deactivate () {
    if ! [ -z "${_OLD_VIRTUAL_PATH:+_}" ] ; then
        PATH="$_OLD_VIRTUAL_PATH"
        export PATH
        unset _OLD_VIRTUAL_PATH
    fi
    if ! [ -z "${_OLD_VIRTUAL_PYTHONHOME+_}" ] ; then
        PYTHONHOME="$_OLD_VIRTUAL_PYTHONHOME"
        export PYTHONHOME
        unset _OLD_VIRTUAL_PYTHONHOME
    fi
    if [ -n "${BASH-}" ] || [ -n "${ZSH_VERSION-}" ] ; then
        hash -r 2>/dev/null
    fi
    if ! [ -z "${_OLD_VIRTUAL_PS1+_}" ] ; then
        PS1="$_OLD_VIRTUAL_PS1"
        export PS1
        unset _OLD_VIRTUAL_PS1
    fi
    unset VIRTUAL_ENV
    if [ ! "${1-}" = "nondestructive" ] ; then
        unset -f deactivate
    fi
}

deactivate nondestructive

VIRTUAL_ENV='__VIRTUAL_ENV__'
export VIRTUAL_ENV

_OLD_VIRTUAL_PATH="$PATH"
PATH="$VIRTUAL_ENV/__BIN_NAME__:$PATH"
export PATH

# a set PYTHONHOME would defeat the environment's isolation
if ! [ -z "${PYTHONHOME+_}" ] ; then
    _OLD_VIRTUAL_PYTHONHOME="$PYTHONHOME"
    unset PYTHONHOME
fi

if [ -z "${VIRTUAL_ENV_DISABLE_PROMPT-}" ] ; then
    _OLD_VIRTUAL_PS1="${PS1-}"
    PS1="(__VIRTUAL_PROMPT__) ${PS1-}"
    export PS1
fi

if [ -n "${BASH-}" ] || [ -n "${ZSH_VERSION-}" ] ; then
    hash -r 2>/dev/null
fi
"#;

const FISH_TEMPLATE: &str = r#"# Source this file ("source bin/activate.fish").

function deactivate -d 'Exit virtual environment and return to normal shell environment'
    if test -n "$_OLD_VIRTUAL_PATH"
        set -gx PATH $_OLD_VIRTUAL_PATH
        set -e _OLD_VIRTUAL_PATH
    end
    if test -n "$_OLD_VIRTUAL_PYTHONHOME"
        set -gx PYTHONHOME $_OLD_VIRTUAL_PYTHONHOME
        set -e _OLD_VIRTUAL_PYTHONHOME
    end
    if test -n "$_OLD_FISH_PROMPT_OVERRIDE"
        functions -e fish_prompt
        set -e _OLD_FISH_PROMPT_OVERRIDE
        functions -c _old_fish_prompt fish_prompt
        functions -e _old_fish_prompt
    end
    set -e VIRTUAL_ENV
    if test "$argv[1]" != 'nondestructive'
        functions -e deactivate
    end
end

deactivate nondestructive

set -gx VIRTUAL_ENV '__VIRTUAL_ENV__'
set -gx _OLD_VIRTUAL_PATH $PATH
set -gx PATH "$VIRTUAL_ENV/__BIN_NAME__" $PATH

if set -q PYTHONHOME
    set -gx _OLD_VIRTUAL_PYTHONHOME $PYTHONHOME
    set -e PYTHONHOME
end

if test -z "$VIRTUAL_ENV_DISABLE_PROMPT"
    functions -c fish_prompt _old_fish_prompt
    function fish_prompt
        printf '(%s) ' '__VIRTUAL_PROMPT__'
        _old_fish_prompt
    end
    set -gx _OLD_FISH_PROMPT_OVERRIDE "$VIRTUAL_ENV"
end
"#;

const POWERSHELL_TEMPLATE: &str = r#"function global:deactivate([switch] $NonDestructive) {
    if (Test-Path variable:_OLD_VIRTUAL_PATH) {
        $env:PATH = $variable:_OLD_VIRTUAL_PATH
        Remove-Variable "_OLD_VIRTUAL_PATH" -Scope global
    }
    if (Test-Path function:_old_virtual_prompt) {
        $function:prompt = $function:_old_virtual_prompt
        Remove-Item function:\_old_virtual_prompt
    }
    if ($env:VIRTUAL_ENV) {
        Remove-Item env:VIRTUAL_ENV -ErrorAction SilentlyContinue
    }
    if (!$NonDestructive) {
        Remove-Item function:deactivate
    }
}

deactivate -NonDestructive

$env:VIRTUAL_ENV = '__VIRTUAL_ENV__'

New-Variable -Scope global -Name _OLD_VIRTUAL_PATH -Value $env:PATH
$env:PATH = "$env:VIRTUAL_ENV/__BIN_NAME____PATH_SEP__" + $env:PATH

if (!$env:VIRTUAL_ENV_DISABLE_PROMPT) {
    function global:_old_virtual_prompt { "" }
    $function:_old_virtual_prompt = $function:prompt
    function global:prompt {
        ("(__VIRTUAL_PROMPT__) " + (& $function:_old_virtual_prompt))
    }
}
"#;

const BATCH_TEMPLATE: &str = r#"@echo off
set "VIRTUAL_ENV=__VIRTUAL_ENV__"

if defined _OLD_VIRTUAL_PROMPT (
    set "PROMPT=%_OLD_VIRTUAL_PROMPT%"
) else (
    if not defined PROMPT set "PROMPT=$P$G"
    set "_OLD_VIRTUAL_PROMPT=%PROMPT%"
)
set "PROMPT=(__VIRTUAL_PROMPT__) %PROMPT%"

if not defined _OLD_VIRTUAL_PYTHONHOME set "_OLD_VIRTUAL_PYTHONHOME=%PYTHONHOME%"
set PYTHONHOME=

if defined _OLD_VIRTUAL_PATH set "PATH=%_OLD_VIRTUAL_PATH%"
if not defined _OLD_VIRTUAL_PATH set "_OLD_VIRTUAL_PATH=%PATH%"
set "PATH=%VIRTUAL_ENV%\__BIN_NAME__;%PATH%"
"#;

const DEACTIVATE_BATCH_TEMPLATE: &str = r#"@echo off
if defined _OLD_VIRTUAL_PROMPT set "PROMPT=%_OLD_VIRTUAL_PROMPT%"
set _OLD_VIRTUAL_PROMPT=

if defined _OLD_VIRTUAL_PYTHONHOME (
    set "PYTHONHOME=%_OLD_VIRTUAL_PYTHONHOME%"
    set _OLD_VIRTUAL_PYTHONHOME=
)

if defined _OLD_VIRTUAL_PATH set "PATH=%_OLD_VIRTUAL_PATH%"
set _OLD_VIRTUAL_PATH=
set VIRTUAL_ENV=
"#;

/// Write activation scripts for the shells of the environment's platform.
pub fn write_activators(env: &CreatedEnv) -> Result<(), VenvError> {
    let scripts: &[(&str, &str)] = match env.layout.os_family {
        OsFamily::Posix => &[
            ("activate", BASH_TEMPLATE),
            ("activate.fish", FISH_TEMPLATE),
            ("activate.ps1", POWERSHELL_TEMPLATE),
        ],
        OsFamily::Windows => &[
            ("activate.bat", BATCH_TEMPLATE),
            ("deactivate.bat", DEACTIVATE_BATCH_TEMPLATE),
            ("activate.ps1", POWERSHELL_TEMPLATE),
        ],
    };
    std::fs::create_dir_all(&env.layout.script_dir)?;
    for (name, template) in scripts {
        debug!(script = name, "writing activator");
        std::fs::write(env.layout.script_dir.join(name), render(template, env))?;
    }
    Ok(())
}

fn render(template: &str, env: &CreatedEnv) -> String {
    let bin_name = env.layout.bin_dir.file_name().unwrap_or("bin");
    let path_sep = match env.layout.os_family {
        OsFamily::Posix => ":",
        OsFamily::Windows => ";",
    };
    template
        .replace("__VIRTUAL_ENV__", env.dest().as_str())
        .replace("__VIRTUAL_PROMPT__", &env.prompt)
        .replace("__BIN_NAME__", bin_name)
        .replace("__PATH_SEP__", path_sep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{cpython, cpython_windows};
    use camino::Utf8Path;
    use vpy_domain::{EnvLayout, PyEnvCfg};

    fn created(env_root: &Utf8Path, windows: bool) -> CreatedEnv {
        let interpreter = if windows {
            cpython_windows(3, 11)
        } else {
            cpython(3, 11)
        };
        CreatedEnv {
            layout: EnvLayout::for_interpreter(env_root, &interpreter),
            pyenv_cfg: PyEnvCfg::new(),
            prompt: "demo".into(),
        }
    }

    #[test]
    fn posix_envs_get_shell_activators() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap().join("env");
        let env = created(&root, false);
        write_activators(&env).unwrap();

        let activate = std::fs::read_to_string(env.layout.script_dir.join("activate")).unwrap();
        assert!(activate.contains(&format!("VIRTUAL_ENV='{root}'")));
        assert!(activate.contains("(demo)"));
        assert!(activate.contains("$VIRTUAL_ENV/bin:"));
        assert!(!activate.contains("__VIRTUAL_PROMPT__"));
        assert!(env.layout.script_dir.join("activate.fish").is_file());
        assert!(env.layout.script_dir.join("activate.ps1").is_file());
        assert!(!env.layout.script_dir.join("activate.bat").exists());
    }

    #[test]
    fn windows_envs_get_batch_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap().join("env");
        let env = created(&root, true);
        write_activators(&env).unwrap();

        let activate =
            std::fs::read_to_string(env.layout.script_dir.join("activate.bat")).unwrap();
        assert!(activate.contains(r"%VIRTUAL_ENV%\Scripts;"));
        let ps1 = std::fs::read_to_string(env.layout.script_dir.join("activate.ps1")).unwrap();
        assert!(ps1.contains("/Scripts;"));
        assert!(!ps1.contains("__BIN_NAME__"));
        assert!(env.layout.script_dir.join("deactivate.bat").is_file());
        assert!(!env.layout.script_dir.join("activate.fish").exists());
    }
}
