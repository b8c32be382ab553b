//! Builtin creator flavors.
//!
//! Each flavor is a record of plain functions: a predicate saying whether it
//! can lay out a given interpreter, a planner producing the source refs to
//! materialize, extra directories to create, and a post-bootstrap hook.
//! Shared behavior lives in free functions composed by the records.

use camino::Utf8PathBuf;

use vpy_domain::{EnvLayout, Implementation, Interpreter, OsFamily};

use crate::create::bootstrap::write_site_shim;
use crate::create::refs::{dedup_targets, Dest, RefKind, SourceRef};
use crate::errors::VenvError;

#[derive(Debug)]
pub struct BuiltinFlavor {
    pub name: &'static str,
    pub can_describe: fn(&Interpreter) -> bool,
    pub sources: fn(&Interpreter) -> Vec<SourceRef>,
    /// Directories to create inside the environment, relative to its root,
    /// beyond what the layout itself requires.
    pub ensure_dirs: fn(&Interpreter, &EnvLayout) -> Vec<Utf8PathBuf>,
    /// Runs after the common bootstrap files are in place.
    pub extra_bootstrap: fn(&Interpreter, &EnvLayout) -> Result<(), VenvError>,
}

/// Ordered most-specific first; selection takes the first match.
pub static FLAVORS: &[BuiltinFlavor] = &[
    BuiltinFlavor {
        name: "cpython3-mac-framework",
        can_describe: |i| {
            cpython(i, 3) && i.os_family() == OsFamily::Posix && i.is_mac_framework()
        },
        sources: mac_framework_sources,
        ensure_dirs: no_dirs,
        extra_bootstrap: no_bootstrap,
    },
    BuiltinFlavor {
        name: "cpython3-posix",
        can_describe: |i| {
            cpython(i, 3) && i.os_family() == OsFamily::Posix && !i.is_mac_framework()
        },
        sources: cpython3_posix_sources,
        ensure_dirs: no_dirs,
        extra_bootstrap: no_bootstrap,
    },
    BuiltinFlavor {
        name: "cpython2-posix",
        can_describe: |i| cpython(i, 2) && i.os_family() == OsFamily::Posix,
        sources: cpython2_posix_sources,
        ensure_dirs: no_dirs,
        extra_bootstrap: write_site_shim,
    },
    BuiltinFlavor {
        name: "cpython3-windows",
        can_describe: |i| cpython(i, 3) && usable_windows(i),
        sources: cpython3_windows_sources,
        ensure_dirs: no_dirs,
        extra_bootstrap: no_bootstrap,
    },
    BuiltinFlavor {
        name: "cpython2-windows",
        can_describe: |i| cpython(i, 2) && usable_windows(i),
        sources: cpython2_windows_sources,
        ensure_dirs: no_dirs,
        extra_bootstrap: write_site_shim,
    },
    BuiltinFlavor {
        name: "pypy3-posix",
        can_describe: |i| pypy(i, 3) && i.os_family() == OsFamily::Posix,
        sources: pypy3_sources,
        ensure_dirs: no_dirs,
        extra_bootstrap: no_bootstrap,
    },
    BuiltinFlavor {
        name: "pypy3-windows",
        can_describe: |i| pypy(i, 3) && usable_windows(i),
        sources: pypy3_sources,
        ensure_dirs: no_dirs,
        extra_bootstrap: no_bootstrap,
    },
    BuiltinFlavor {
        name: "pypy2-posix",
        can_describe: |i| pypy(i, 2) && i.os_family() == OsFamily::Posix,
        sources: pypy2_sources,
        ensure_dirs: pypy2_dirs,
        extra_bootstrap: write_site_shim,
    },
    BuiltinFlavor {
        name: "pypy2-windows",
        can_describe: |i| pypy(i, 2) && usable_windows(i),
        sources: pypy2_sources,
        ensure_dirs: pypy2_dirs,
        extra_bootstrap: write_site_shim,
    },
];

fn cpython(interpreter: &Interpreter, major: u64) -> bool {
    interpreter.implementation == Implementation::CPython
        && interpreter.version_info.major == major
}

fn pypy(interpreter: &Interpreter, major: u64) -> bool {
    interpreter.implementation == Implementation::PyPy && interpreter.version_info.major == major
}

fn usable_windows(interpreter: &Interpreter) -> bool {
    interpreter.os_family() == OsFamily::Windows && !interpreter.is_windows_store()
}

fn no_dirs(_: &Interpreter, _: &EnvLayout) -> Vec<Utf8PathBuf> {
    Vec::new()
}

fn no_bootstrap(_: &Interpreter, _: &EnvLayout) -> Result<(), VenvError> {
    Ok(())
}

/// The binary the environment's executable is built from: always the host
/// installation's own, never a shim in an intermediate environment.
fn host_exe(interpreter: &Interpreter) -> Utf8PathBuf {
    interpreter
        .system_executable
        .clone()
        .unwrap_or_else(|| interpreter.executable.clone())
}

fn posix_python_ref(interpreter: &Interpreter, extra_aliases: &[String]) -> SourceRef {
    let host = host_exe(interpreter);
    let major = interpreter.version_info.major;
    let mut aliases = vec![format!("python{major}"), interpreter.python_name()];
    aliases.extend_from_slice(extra_aliases);
    if let Some(name) = host.file_name() {
        aliases.push(name.to_string());
    }
    aliases.retain(|alias| alias != "python");
    let aliases = dedup_targets(aliases, OsFamily::Posix);
    let exe = SourceRef::executable(host, "python", aliases);
    if major == 2 {
        // a symlinked python2 resolves its prefix through the link target
        exe.forced_copy()
    } else {
        exe
    }
}

/// `libpythonX.Y.so.N` next to a shared-build interpreter; without it a
/// copied binary fails to start.
fn shared_library_refs(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = Vec::new();
    if !interpreter.sysconfig_flag("Py_ENABLE_SHARED") {
        return refs;
    }
    if let (Some(libdir), Some(soname)) = (
        interpreter.sysconfig_var("LIBDIR"),
        interpreter.sysconfig_var("INSTSONAME"),
    ) {
        let library = Utf8PathBuf::from(libdir).join(soname);
        if library.is_file() {
            refs.push(SourceRef::file(library, Dest::Lib).copy_only());
        }
    }
    refs
}

/// Stdlib modules the major-2 site shim needs before it can bolt the rest
/// of the standard library onto `sys.path`. Compiled forms ride along when
/// present; the source form is mandatory when no compiled form exists.
fn landmark_module_refs(interpreter: &Interpreter, modules: &[&str]) -> Vec<SourceRef> {
    let mut refs = Vec::new();
    for module in modules {
        let compiled = interpreter.system_stdlib.join(format!("{module}.pyc"));
        let source = interpreter.system_stdlib.join(format!("{module}.py"));
        let has_compiled = compiled.is_file();
        if has_compiled {
            refs.push(SourceRef::file(compiled, Dest::Stdlib));
        }
        if source.is_file() || !has_compiled {
            refs.push(SourceRef::file(source, Dest::Stdlib));
        }
    }
    refs
}

fn include_dir_ref(interpreter: &Interpreter) -> Option<SourceRef> {
    if interpreter.system_include.join("Python.h").is_file() {
        Some(SourceRef::directory(
            interpreter.system_include.clone(),
            Dest::IncludeDir,
        ))
    } else {
        None
    }
}

fn cpython3_posix_sources(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = vec![posix_python_ref(interpreter, &[])];
    refs.extend(shared_library_refs(interpreter));
    refs
}

fn mac_framework_sources(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = cpython3_posix_sources(interpreter);
    // the framework dylib the relocated binary dereferences at startup
    if let Some(framework) = interpreter.sysconfig_var("PYTHONFRAMEWORK") {
        refs.push(
            SourceRef::file(interpreter.system_prefix().join(framework), Dest::EnvRoot)
                .named(".Python")
                .optional()
                .symlink_only(),
        );
    }
    refs
}

fn cpython2_posix_sources(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = vec![posix_python_ref(interpreter, &[])];
    refs.extend(shared_library_refs(interpreter));
    refs.extend(landmark_module_refs(interpreter, &["os"]));
    let dynload = interpreter.system_stdlib_platform.join("lib-dynload");
    if dynload.is_dir() {
        refs.push(SourceRef::directory(dynload, Dest::Stdlib));
    }
    refs.extend(include_dir_ref(interpreter));
    refs
}

fn windows_python_refs(interpreter: &Interpreter) -> Vec<SourceRef> {
    let host = host_exe(interpreter);
    let mut aliases = Vec::new();
    if let Some(name) = host.file_name() {
        if !name.eq_ignore_ascii_case("python.exe") {
            aliases.push(name.to_string());
        }
    }
    let mut exe = SourceRef::executable(host.clone(), "python.exe", aliases);
    if interpreter.version_info.major == 2 {
        exe = exe.forced_copy();
    }
    let mut refs = vec![exe];
    if let Some(dir) = host.parent() {
        let windowed = dir.join("pythonw.exe");
        if windowed.is_file() {
            let mut w = SourceRef::executable(windowed, "pythonw.exe", Vec::new());
            if interpreter.version_info.major == 2 {
                w = w.forced_copy();
            }
            refs.push(w);
        }
    }
    refs
}

fn cpython2_windows_sources(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = windows_python_refs(interpreter);
    let VersionPair { major, minor } = version_pair(interpreter);
    if let Some(dir) = host_exe(interpreter).parent() {
        refs.push(
            SourceRef::file(dir.join(format!("python{major}{minor}.dll")), Dest::Bin)
                .forced_copy()
                .optional(),
        );
    }
    refs.extend(landmark_module_refs(interpreter, &["os"]));
    refs.extend(include_dir_ref(interpreter));
    refs
}

fn cpython3_windows_sources(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = windows_python_refs(interpreter);
    refs.extend(windows_dll_refs(interpreter));
    refs.extend(windows_zip_ref(interpreter));
    if interpreter.version_info.minor >= 7 {
        let launcher = interpreter
            .system_stdlib
            .join("venv/scripts/nt/python.exe");
        refs.push(
            SourceRef::file(launcher, Dest::Bin)
                .named("venvlauncher.exe")
                .forced_copy()
                .optional(),
        );
    }
    refs
}

/// Runtime DLLs and extension modules next to the binary and under
/// `<prefix>/DLLs`. Always copied; loader search paths do not follow links.
fn windows_dll_refs(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    let mut dirs = Vec::new();
    if let Some(parent) = host_exe(interpreter).parent() {
        dirs.push(parent.to_owned());
    }
    dirs.push(interpreter.system_prefix().join("DLLs"));
    for dir in dirs {
        let Ok(entries) = dir.read_dir_utf8() else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name() else {
                continue;
            };
            let lower = name.to_lowercase();
            if !(lower.ends_with(".dll") || lower.ends_with(".pyd")) {
                continue;
            }
            if seen.contains(&lower) {
                continue;
            }
            seen.push(lower);
            let mut dll = SourceRef::file(path.to_owned(), Dest::Bin).forced_copy();
            dll.kind = RefKind::DllOrExt;
            refs.push(dll);
        }
    }
    refs
}

/// The embeddable distribution keeps the stdlib in `pythonXY.zip`, visible
/// on `sys.path`; it must sit next to the environment's binary too.
fn windows_zip_ref(interpreter: &Interpreter) -> Option<SourceRef> {
    let VersionPair { major, minor } = version_pair(interpreter);
    let wanted = format!("python{major}{minor}.zip");
    for entry in &interpreter.path {
        if entry.to_lowercase().ends_with(&wanted) {
            let path = Utf8PathBuf::from(entry);
            if path.is_file() {
                return Some(SourceRef::file(path, Dest::Bin).forced_copy());
            }
        }
    }
    None
}

struct VersionPair {
    major: u64,
    minor: u64,
}

fn version_pair(interpreter: &Interpreter) -> VersionPair {
    VersionPair {
        major: interpreter.version_info.major,
        minor: interpreter.version_info.minor,
    }
}

fn pypy_exe_ref(interpreter: &Interpreter) -> SourceRef {
    let major = interpreter.version_info.major;
    let mut aliases = vec!["pypy".to_string()];
    if major == 3 {
        aliases.push("pypy3".to_string());
    }
    if interpreter.os_family() == OsFamily::Windows {
        let host = host_exe(interpreter);
        let mut names: Vec<String> = aliases.iter().map(|a| format!("{a}.exe")).collect();
        if let Some(name) = host.file_name() {
            if !name.eq_ignore_ascii_case("python.exe") {
                names.push(name.to_string());
            }
        }
        let exe = SourceRef::executable(
            host,
            "python.exe",
            dedup_targets(names, OsFamily::Windows),
        );
        if major == 2 {
            exe.forced_copy()
        } else {
            exe
        }
    } else {
        posix_python_ref(interpreter, &aliases)
    }
}

/// `libpypy-c` rides next to the binary; without it a copied exe aborts on
/// startup.
fn pypy_shared_lib_refs(interpreter: &Interpreter) -> Vec<SourceRef> {
    let stem = if interpreter.version_info.major == 3 {
        "libpypy3-c"
    } else {
        "libpypy-c"
    };
    let mut names = vec![format!("{stem}.so"), format!("{stem}.dylib")];
    if interpreter.os_family() == OsFamily::Windows {
        names = vec![format!("{stem}.dll")];
    }
    let mut dirs = Vec::new();
    if let Some(parent) = host_exe(interpreter).parent() {
        dirs.push(parent.to_owned());
    }
    if let Some(libdir) = interpreter.sysconfig_var("LIBDIR") {
        dirs.push(Utf8PathBuf::from(libdir));
    }
    let mut refs = Vec::new();
    for dir in &dirs {
        for name in &names {
            let library = dir.join(name);
            if library.is_file() {
                refs.push(SourceRef::file(library, Dest::Bin).copy_only());
            }
        }
    }
    refs
}

fn pypy3_sources(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = vec![pypy_exe_ref(interpreter)];
    refs.extend(pypy_shared_lib_refs(interpreter));
    refs
}

const PYPY2_LANDMARKS: &[&str] = &[
    "copy_reg",
    "genericpath",
    "linecache",
    "os",
    "stat",
    "UserDict",
    "warnings",
];

fn pypy2_sources(interpreter: &Interpreter) -> Vec<SourceRef> {
    let mut refs = vec![pypy_exe_ref(interpreter)];
    refs.extend(pypy_shared_lib_refs(interpreter));
    let mut modules: Vec<&str> = PYPY2_LANDMARKS.to_vec();
    if interpreter.os_family() == OsFamily::Windows {
        modules.push("ntpath");
    } else {
        modules.push("posixpath");
    }
    refs.extend(landmark_module_refs(interpreter, &modules));
    // bundled pure-python modules pypy resolves relative to the exe
    let lib_pypy = interpreter.system_prefix().join("lib_pypy");
    if lib_pypy.is_dir() {
        refs.push(SourceRef::directory(lib_pypy, Dest::EnvRoot).optional());
    }
    refs
}

fn pypy2_dirs(_: &Interpreter, layout: &EnvLayout) -> Vec<Utf8PathBuf> {
    vec![layout.dest.join("lib_pypy")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create::refs::RefWhen;
    use crate::testutil::{cpython as cpython_fixture, pypy as pypy_fixture};

    #[test]
    fn python3_posix_plan_is_exe_plus_aliases() {
        let interpreter = cpython_fixture(3, 11);
        let refs = cpython3_posix_sources(&interpreter);
        assert_eq!(refs.len(), 1);
        let exe = &refs[0];
        assert_eq!(exe.kind, RefKind::Executable);
        assert_eq!(exe.dest_name.as_deref(), Some("python"));
        assert!(exe.aliases.contains(&"python3".to_string()));
        assert!(exe.aliases.contains(&"python3.11".to_string()));
        assert!(!exe.must_copy);
    }

    #[test]
    fn shared_builds_add_the_runtime_library() {
        let mut interpreter = cpython_fixture(3, 11);
        let temp = tempfile::tempdir().unwrap();
        let libdir = temp.path().join("lib");
        std::fs::create_dir(&libdir).unwrap();
        std::fs::write(libdir.join("libpython3.11.so.1.0"), b"elf").unwrap();
        interpreter
            .sysconfig_vars
            .insert("Py_ENABLE_SHARED".into(), Some("1".into()));
        interpreter.sysconfig_vars.insert(
            "LIBDIR".into(),
            Some(libdir.to_str().unwrap().to_string()),
        );
        interpreter
            .sysconfig_vars
            .insert("INSTSONAME".into(), Some("libpython3.11.so.1.0".into()));
        let refs = cpython3_posix_sources(&interpreter);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].when, RefWhen::CopyOnly);
        assert_eq!(refs[1].dest, Dest::Lib);
    }

    #[test]
    fn python2_exe_is_always_copied() {
        let interpreter = cpython_fixture(2, 7);
        let refs = cpython2_posix_sources(&interpreter);
        assert!(refs[0].must_copy);
        // landmark os module is planned even when the host files are absent
        assert!(refs
            .iter()
            .any(|r| r.src.as_str().ends_with("os.py") && r.must_exist));
    }

    #[test]
    fn pypy_plan_carries_the_pypy_alias() {
        let interpreter = pypy_fixture(3, 10);
        let refs = pypy3_sources(&interpreter);
        assert!(refs[0].aliases.contains(&"pypy3".to_string()));
        assert!(refs[0].aliases.contains(&"pypy".to_string()));
    }

    #[test]
    fn mac_framework_plan_links_the_dylib() {
        let mut interpreter = cpython_fixture(3, 11);
        interpreter.platform = "darwin".into();
        interpreter
            .sysconfig_vars
            .insert("PYTHONFRAMEWORK".into(), Some("Python3".into()));
        let refs = mac_framework_sources(&interpreter);
        let dylib = refs.last().unwrap();
        assert_eq!(dylib.dest_name.as_deref(), Some(".Python"));
        assert_eq!(dylib.when, RefWhen::SymlinkOnly);
        assert!(!dylib.must_exist);
    }
}
