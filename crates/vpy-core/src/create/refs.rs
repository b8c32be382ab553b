//! Materialization directives.
//!
//! A [`SourceRef`] names one file or directory on the host and where it goes
//! inside the environment. Planners only build these; the materializer is
//! the sole component that touches the destination.

use camino::{Utf8Path, Utf8PathBuf};

use vpy_domain::{EnvLayout, OsFamily};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefKind {
    Executable,
    File,
    Directory,
    /// Windows `*.dll` / `*.pyd` neighbours of the interpreter.
    DllOrExt,
}

/// Whether a ref applies given the materialization mode chosen for the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefWhen {
    Always,
    CopyOnly,
    SymlinkOnly,
}

/// Symbolic destination, resolved against the layout at materialization
/// time. This replaces per-ref destination callbacks with data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dest {
    /// `<bin>/<name>`
    Bin,
    /// `<stdlib>/<name>`
    Stdlib,
    /// `<dest>/<name>`
    EnvRoot,
    /// `<dest>/lib/<name>`
    Lib,
    /// The environment's include directory itself (directory refs).
    IncludeDir,
}

#[derive(Clone, Debug)]
pub struct SourceRef {
    pub kind: RefKind,
    pub src: Utf8PathBuf,
    pub dest: Dest,
    /// Name inside the destination directory; the source file name when
    /// absent.
    pub dest_name: Option<String>,
    /// Symlinking this ref is never acceptable.
    pub must_copy: bool,
    /// When false, a missing source skips the ref instead of failing the
    /// run.
    pub must_exist: bool,
    pub when: RefWhen,
    /// Executable refs: additional names in the bin directory that must
    /// resolve to the primary destination.
    pub aliases: Vec<String>,
}

impl SourceRef {
    #[must_use]
    pub fn executable(src: impl Into<Utf8PathBuf>, primary: &str, aliases: Vec<String>) -> Self {
        Self {
            kind: RefKind::Executable,
            src: src.into(),
            dest: Dest::Bin,
            dest_name: Some(primary.to_string()),
            must_copy: false,
            must_exist: true,
            when: RefWhen::Always,
            aliases,
        }
    }

    #[must_use]
    pub fn file(src: impl Into<Utf8PathBuf>, dest: Dest) -> Self {
        Self {
            kind: RefKind::File,
            src: src.into(),
            dest,
            dest_name: None,
            must_copy: false,
            must_exist: true,
            when: RefWhen::Always,
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn directory(src: impl Into<Utf8PathBuf>, dest: Dest) -> Self {
        Self {
            kind: RefKind::Directory,
            src: src.into(),
            dest,
            dest_name: None,
            must_copy: false,
            must_exist: true,
            when: RefWhen::Always,
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.must_exist = false;
        self
    }

    #[must_use]
    pub fn copy_only(mut self) -> Self {
        self.when = RefWhen::CopyOnly;
        self
    }

    #[must_use]
    pub fn symlink_only(mut self) -> Self {
        self.when = RefWhen::SymlinkOnly;
        self
    }

    #[must_use]
    pub fn forced_copy(mut self) -> Self {
        self.must_copy = true;
        self
    }

    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.dest_name = Some(name.to_string());
        self
    }

    /// Absolute destination for this ref inside `layout`.
    #[must_use]
    pub fn dest_path(&self, layout: &EnvLayout) -> Utf8PathBuf {
        let name = self
            .dest_name
            .as_deref()
            .or_else(|| self.src.file_name())
            .unwrap_or("unnamed");
        match &self.dest {
            Dest::Bin => layout.bin_dir.join(name),
            Dest::Stdlib => layout.stdlib_dir.join(name),
            Dest::EnvRoot => layout.dest.join(name),
            Dest::Lib => layout.dest.join("lib").join(name),
            Dest::IncludeDir => layout.include_dir.clone(),
        }
    }
}

/// Deduplicate executable alias names, case-insensitively on windows where
/// the filesystem will collapse them anyway.
#[must_use]
pub fn dedup_targets(names: Vec<String>, os_family: OsFamily) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut result = Vec::new();
    for name in names {
        let key = match os_family {
            OsFamily::Windows => name.to_lowercase(),
            OsFamily::Posix => name.clone(),
        };
        if !seen.contains(&key) {
            seen.push(key);
            result.push(name);
        }
    }
    result
}

/// Path relative from `from`'s directory to `to`, for sibling symlinks.
#[must_use]
pub fn relative_to_sibling(from: &Utf8Path, to: &Utf8Path) -> Utf8PathBuf {
    match (from.parent(), to.strip_prefix(from.parent().unwrap_or(from))) {
        (Some(_), Ok(relative)) => relative.to_owned(),
        _ => to.to_owned(),
    }
}
