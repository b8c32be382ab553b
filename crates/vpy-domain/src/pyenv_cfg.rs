//! The `pyenv.cfg` bootstrap file.
//!
//! Python 3 runtimes read this file at startup to locate the host
//! installation. The format is one `key = value` per line; order matters to
//! keep rewrites byte-stable, so entries live in an [`IndexMap`].

use std::fs;
use std::io;
use std::path::Path;

use indexmap::IndexMap;

pub const PYENV_CFG: &str = "pyvenv.cfg";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PyEnvCfg {
    entries: IndexMap<String, String>,
}

impl PyEnvCfg {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse cfg text. Lines without `=` are ignored, whitespace around key
    /// and value is stripped, duplicate keys keep the last value.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut entries = IndexMap::new();
        for line in content.lines() {
            let Some(at) = line.find('=') else { continue };
            let key = line[..at].trim();
            if key.is_empty() {
                continue;
            }
            let value = line[at + 1..].trim();
            entries.insert(key.to_string(), value.to_string());
        }
        Self { entries }
    }

    /// Read the cfg inside `folder`, or an empty cfg when the file does not
    /// exist.
    pub fn read_from(folder: &Path) -> io::Result<Self> {
        let path = folder.join(PYENV_CFG);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(error) => Err(error),
        }
    }

    pub fn write_to(&self, folder: &Path) -> io::Result<()> {
        fs::write(folder.join(PYENV_CFG), self.to_string())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert only when the key is not present yet.
    pub fn entry_or(&mut self, key: &str, value: impl Into<String>) {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.to_string(), value.into());
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Merge `other` over this cfg, overwriting existing keys in place and
    /// appending new ones.
    pub fn merge(&mut self, other: &PyEnvCfg) {
        for (key, value) in other.iter() {
            self.entries.insert(key.to_string(), value.to_string());
        }
    }
}

impl std::fmt::Display for PyEnvCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.entries {
            if value.is_empty() {
                writeln!(f, "{key} =")?;
            } else {
                writeln!(f, "{key} = {value}")?;
            }
        }
        Ok(())
    }
}
