//! Destination directory layout and the handle a finished creation returns.

use camino::{Utf8Path, Utf8PathBuf};

use crate::interpreter::{Interpreter, OsFamily};
use crate::pyenv_cfg::PyEnvCfg;

/// What the user asked for, independent of any interpreter.
#[derive(Clone, Debug)]
pub struct UserOptions {
    pub dest: Utf8PathBuf,
    /// Prefer copying over symlinking.
    pub copies: bool,
    pub system_site_packages: bool,
    pub prompt: Option<String>,
    /// Remove an existing destination before creating.
    pub clear: bool,
    /// Skip the delegating creator even when the host ships `venv`.
    pub force_builtin: bool,
    pub seed: bool,
}

impl UserOptions {
    #[must_use]
    pub fn new(dest: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            copies: false,
            system_site_packages: false,
            prompt: None,
            clear: false,
            force_builtin: false,
            seed: true,
        }
    }

    /// The prompt to advertise in activation scripts: explicit, or the
    /// destination directory name.
    #[must_use]
    pub fn effective_prompt(&self) -> String {
        self.prompt.clone().unwrap_or_else(|| {
            self.dest
                .file_name()
                .unwrap_or(self.dest.as_str())
                .to_string()
        })
    }
}

/// All paths of one destination, computed up front from the interpreter and
/// never revised during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvLayout {
    pub dest: Utf8PathBuf,
    /// Directory the interpreter binary lands in.
    pub bin_dir: Utf8PathBuf,
    /// Directory console scripts land in; same as `bin_dir` on posix.
    pub script_dir: Utf8PathBuf,
    /// The environment's standard-library directory.
    pub stdlib_dir: Utf8PathBuf,
    /// Pure-python site-packages.
    pub purelib: Utf8PathBuf,
    /// Platform-specific site-packages; equals `purelib` everywhere the
    /// builtin creators support.
    pub platlib: Utf8PathBuf,
    pub include_dir: Utf8PathBuf,
    /// The primary interpreter binary inside the environment.
    pub exe: Utf8PathBuf,
    pub os_family: OsFamily,
}

impl EnvLayout {
    #[must_use]
    pub fn for_interpreter(dest: &Utf8Path, interpreter: &Interpreter) -> Self {
        let dest = dest.to_owned();
        match interpreter.os_family() {
            OsFamily::Posix => {
                let bin_dir = dest.join("bin");
                let stdlib_dir = dest.join("lib").join(interpreter.python_name());
                let purelib = stdlib_dir.join("site-packages");
                Self {
                    exe: bin_dir.join("python"),
                    script_dir: bin_dir.clone(),
                    platlib: purelib.clone(),
                    include_dir: dest.join("include").join(interpreter.python_name()),
                    dest,
                    bin_dir,
                    stdlib_dir,
                    purelib,
                    os_family: OsFamily::Posix,
                }
            }
            OsFamily::Windows => {
                let bin_dir = dest.join("Scripts");
                let stdlib_dir = dest.join("Lib");
                let purelib = stdlib_dir.join("site-packages");
                Self {
                    exe: bin_dir.join("python.exe"),
                    script_dir: bin_dir.clone(),
                    platlib: purelib.clone(),
                    include_dir: dest.join("Include"),
                    dest,
                    bin_dir,
                    stdlib_dir,
                    purelib,
                    os_family: OsFamily::Windows,
                }
            }
        }
    }

    /// Directories that must exist before any file is materialized.
    #[must_use]
    pub fn directories(&self) -> Vec<&Utf8Path> {
        let mut dirs = vec![
            self.dest.as_path(),
            self.bin_dir.as_path(),
            self.script_dir.as_path(),
            self.stdlib_dir.as_path(),
            self.purelib.as_path(),
            self.platlib.as_path(),
        ];
        dirs.sort_unstable();
        dirs.dedup();
        dirs
    }

    /// The library directories downstream consumers (seeders, the site
    /// shim) care about.
    #[must_use]
    pub fn libs(&self) -> Vec<&Utf8Path> {
        let mut libs = vec![self.purelib.as_path(), self.platlib.as_path()];
        libs.dedup();
        libs
    }
}

/// The frozen result of a successful creation, handed to seeders and
/// activators.
#[derive(Clone, Debug)]
pub struct CreatedEnv {
    pub layout: EnvLayout,
    /// The cfg as written to disk.
    pub pyenv_cfg: PyEnvCfg,
    /// Prompt advertised by activation scripts.
    pub prompt: String,
}

impl CreatedEnv {
    #[must_use]
    pub fn dest(&self) -> &Utf8Path {
        &self.layout.dest
    }

    #[must_use]
    pub fn exe(&self) -> &Utf8Path {
        &self.layout.exe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::testing::posix_interpreter;

    #[test]
    fn posix_layout_uses_versioned_lib_dir() {
        let interpreter = posix_interpreter(3, 11);
        let layout = EnvLayout::for_interpreter(Utf8Path::new("/tmp/env"), &interpreter);
        assert_eq!(layout.bin_dir, "/tmp/env/bin");
        assert_eq!(layout.script_dir, layout.bin_dir);
        assert_eq!(layout.purelib, "/tmp/env/lib/python3.11/site-packages");
        assert_eq!(layout.exe, "/tmp/env/bin/python");
    }

    #[test]
    fn windows_layout_uses_scripts_and_lib() {
        let mut interpreter = posix_interpreter(3, 11);
        interpreter.os = "nt".into();
        interpreter.platform = "win32".into();
        let layout = EnvLayout::for_interpreter(Utf8Path::new("C:/env"), &interpreter);
        assert_eq!(layout.bin_dir, "C:/env/Scripts");
        assert_eq!(layout.purelib, "C:/env/Lib/site-packages");
        assert_eq!(layout.exe, "C:/env/Scripts/python.exe");
    }

    #[test]
    fn directories_are_unique_and_sorted() {
        let interpreter = posix_interpreter(3, 11);
        let layout = EnvLayout::for_interpreter(Utf8Path::new("/tmp/env"), &interpreter);
        let dirs = layout.directories();
        let mut sorted = dirs.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(dirs, sorted);
    }

    #[test]
    fn effective_prompt_falls_back_to_dir_name() {
        let mut options = UserOptions::new("/tmp/demo-env");
        assert_eq!(options.effective_prompt(), "demo-env");
        options.prompt = Some("custom".into());
        assert_eq!(options.effective_prompt(), "custom");
    }
}
