//! Test fixtures shared across the crate's unit tests.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;

use vpy_domain::{Implementation, Interpreter, VersionInfo};

pub(crate) fn cpython(major: u64, minor: u64) -> Interpreter {
    Interpreter {
        implementation: Implementation::CPython,
        version_info: VersionInfo {
            major,
            minor,
            micro: 4,
        },
        architecture: 64,
        os: "posix".into(),
        platform: "linux".into(),
        executable: Utf8PathBuf::from(format!("/usr/bin/python{major}.{minor}")),
        original_executable: Utf8PathBuf::from(format!("/usr/bin/python{major}.{minor}")),
        base_executable: None,
        system_executable: Some(Utf8PathBuf::from(format!("/usr/bin/python{major}.{minor}"))),
        prefix: "/usr".into(),
        exec_prefix: "/usr".into(),
        base_prefix: None,
        base_exec_prefix: None,
        real_prefix: None,
        system_stdlib: Utf8PathBuf::from(format!("/usr/lib/python{major}.{minor}")),
        system_stdlib_platform: Utf8PathBuf::from(format!("/usr/lib/python{major}.{minor}")),
        system_include: Utf8PathBuf::from(format!("/usr/include/python{major}.{minor}")),
        has_venv: major == 3,
        free_threaded: false,
        file_system_encoding: "utf-8".into(),
        path: vec![],
        sysconfig_vars: BTreeMap::new(),
    }
}

pub(crate) fn cpython_windows(major: u64, minor: u64) -> Interpreter {
    let mut interpreter = cpython(major, minor);
    interpreter.os = "nt".into();
    interpreter.platform = "win32".into();
    interpreter.executable = "C:/Python/python.exe".into();
    interpreter.original_executable = "C:/Python/python.exe".into();
    interpreter.system_executable = Some("C:/Python/python.exe".into());
    interpreter.prefix = "C:/Python".into();
    interpreter.exec_prefix = "C:/Python".into();
    interpreter.system_stdlib = "C:/Python/Lib".into();
    interpreter.system_stdlib_platform = "C:/Python/Lib".into();
    interpreter.system_include = "C:/Python/Include".into();
    interpreter
}

pub(crate) fn pypy(major: u64, minor: u64) -> Interpreter {
    let mut interpreter = cpython(major, minor);
    interpreter.implementation = Implementation::PyPy;
    interpreter.executable = "/opt/pypy/bin/pypy".into();
    interpreter.original_executable = "/opt/pypy/bin/pypy".into();
    interpreter.system_executable = Some("/opt/pypy/bin/pypy".into());
    interpreter.prefix = "/opt/pypy".into();
    interpreter.exec_prefix = "/opt/pypy".into();
    interpreter.has_venv = false;
    interpreter
}

pub(crate) fn find_python() -> Option<Utf8PathBuf> {
    for name in ["python3", "python"] {
        if let Ok(path) = which::which(name) {
            if let Ok(utf8) = Utf8PathBuf::from_path_buf(path) {
                return Some(utf8);
            }
        }
    }
    None
}
