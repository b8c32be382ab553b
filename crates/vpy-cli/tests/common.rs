#![allow(dead_code)]

use std::path::PathBuf;

pub fn find_python() -> Option<PathBuf> {
    for name in ["python3", "python"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }
    None
}

pub fn bin_dir_name() -> &'static str {
    if cfg!(windows) {
        "Scripts"
    } else {
        "bin"
    }
}
