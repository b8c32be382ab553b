//! Overlay that stops distutils configuration files from steering installs
//! outside the environment.
//!
//! A `.pth` file in site-packages imports the patch module at every
//! interpreter start; the module installs an import hook that rewrites the
//! `install` options distutils and setuptools pick up from configuration
//! files, whenever those modules actually load.

use camino::{Utf8Path, Utf8PathBuf};

use vpy_domain::EnvLayout;

use crate::errors::VenvError;

const PATCH_MODULE: &str = "_vpy_patch";

const PATCH_SCRIPT: &str = r#""""Keep distutils-configured install paths inside this environment.

Distutils lets configuration files override the install prefix and the
console-script directory. Both would place files outside the environment,
so a meta path finder patches the dist machinery whenever it loads. The
modules are never imported eagerly; hosts without distutils start clean.
"""
import os
import sys

PATCH_FILE = os.path.join(__file__)
PATCHED_MODULES = ("distutils.dist", "setuptools.dist")


def patch_dist(module):
    old = module.Distribution.parse_config_files
    if getattr(old, "_vpy_patched", False):
        return

    def parse_config_files(self, *args, **kwargs):
        result = old(self, *args, **kwargs)
        # this file may be truncated by a concurrent rewrite while the
        # closure is live; a missing global means do nothing
        try:
            marker = PATCH_FILE
        except NameError:
            return result
        install = self.get_option_dict("install")
        if "prefix" in install:
            install["prefix"] = marker, os.path.abspath(sys.prefix)
        if "install_scripts" in install:
            scripts = os.path.abspath(os.path.join(os.path.dirname(marker), "__SCRIPT_DIR__"))
            install["install_scripts"] = marker, scripts
        return result

    parse_config_files._vpy_patched = True
    module.Distribution.parse_config_files = parse_config_files


if sys.version_info[0] >= 3:
    from importlib.util import find_spec

    class _Finder:
        """Patches the dist modules right after their normal load."""

        loading = None

        def find_spec(self, fullname, path, target=None):
            # globals may be gone if this file was rewritten underneath us
            names = globals().get("PATCHED_MODULES")
            if not names or fullname not in names or self.loading is not None:
                return None
            # find_spec re-enters every meta path finder, this one included
            self.loading = fullname
            try:
                spec = find_spec(fullname, path)
            finally:
                self.loading = None
            if spec is None or not hasattr(spec.loader, "exec_module"):
                return spec
            old = spec.loader.exec_module
            if getattr(old, "_vpy_patched", False):
                return spec

            def exec_module(module, _old=old, _names=names, _patch=patch_dist):
                _old(module)
                if module.__name__ in _names:
                    _patch(module)

            exec_module._vpy_patched = True
            try:
                spec.loader.exec_module = exec_module
            except AttributeError:
                pass  # extension loaders are read-only
            return spec

    sys.meta_path.insert(0, _Finder())
else:
    # python 2 always ships distutils
    from distutils import dist

    patch_dist(dist)
"#;

/// Write the patch module and its loader `.pth` into site-packages.
pub fn write_distutils_patch(layout: &EnvLayout) -> Result<(), VenvError> {
    let script_dir = relative_path(&layout.purelib, &layout.script_dir);
    let script = PATCH_SCRIPT.replace("__SCRIPT_DIR__", script_dir.as_str());
    std::fs::create_dir_all(&layout.purelib)?;
    std::fs::write(
        layout.purelib.join(format!("{PATCH_MODULE}.py")),
        script,
    )?;
    std::fs::write(
        layout.purelib.join(format!("{PATCH_MODULE}.pth")),
        format!("import {PATCH_MODULE}\n"),
    )?;
    Ok(())
}

/// Lexical relative path from `from` to `to`; both must be absolute.
fn relative_path(from: &Utf8Path, to: &Utf8Path) -> Utf8PathBuf {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();
    let shared = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();
    let mut relative = Utf8PathBuf::new();
    for _ in shared..from.len() {
        relative.push("..");
    }
    for component in &to[shared..] {
        relative.push(component.as_str());
    }
    if relative.as_str().is_empty() {
        relative.push(".");
    }
    relative
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::cpython;

    #[test]
    fn relative_paths_walk_up_to_the_shared_root() {
        assert_eq!(
            relative_path(
                Utf8Path::new("/env/lib/python3.11/site-packages"),
                Utf8Path::new("/env/bin"),
            ),
            "../../../bin"
        );
        assert_eq!(
            relative_path(Utf8Path::new("/env/bin"), Utf8Path::new("/env/bin")),
            "."
        );
    }

    #[test]
    fn patch_and_loader_land_in_site_packages() {
        let temp = tempfile::tempdir().unwrap();
        let dest = Utf8Path::from_path(temp.path()).unwrap().join("env");
        let layout = EnvLayout::for_interpreter(&dest, &cpython(3, 11));
        write_distutils_patch(&layout).unwrap();

        let module = std::fs::read_to_string(layout.purelib.join("_vpy_patch.py")).unwrap();
        assert!(!module.contains("__SCRIPT_DIR__"));
        assert!(module.contains("../../../bin"));
        let loader = std::fs::read_to_string(layout.purelib.join("_vpy_patch.pth")).unwrap();
        assert_eq!(loader, "import _vpy_patch\n");
    }

    #[test]
    fn hook_defers_imports_and_guards_its_constant() {
        let temp = tempfile::tempdir().unwrap();
        let dest = Utf8Path::from_path(temp.path()).unwrap().join("env");
        let layout = EnvLayout::for_interpreter(&dest, &cpython(3, 11));
        write_distutils_patch(&layout).unwrap();

        let module = std::fs::read_to_string(layout.purelib.join("_vpy_patch.py")).unwrap();
        // a finder on meta_path, not an eager import that breaks hosts
        // without distutils
        assert!(module.contains("sys.meta_path.insert(0, _Finder())"));
        assert!(module.contains("def find_spec(self, fullname, path, target=None):"));
        assert!(!module.contains("\nfrom distutils import dist"));
        // truncation guard around the module-level constant
        assert!(module.contains("except NameError:"));
    }
}
