//! Best-effort on-disk cache for probe results.
//!
//! Probing costs a subprocess per interpreter, so results are shared across
//! runs as JSON files under the user cache directory. Entries are keyed by
//! canonical executable path and invalidated when the binary's mtime or size
//! changes. Readers and writers coordinate through cooperative file locks;
//! every failure degrades to "not cached".

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, Write};
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use camino::Utf8Path;
use fs4::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vpy_domain::Interpreter;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    mtime_ns: u128,
    size: u64,
    interpreter: Interpreter,
}

fn disabled() -> bool {
    std::env::var_os("VPY_NO_CACHE").is_some()
}

fn cache_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("VPY_CACHE_DIR") {
        return Some(PathBuf::from(dir));
    }
    dirs_next::cache_dir().map(|dir| dir.join("vpy").join("probes"))
}

fn entry_path(executable: &Utf8Path) -> Option<PathBuf> {
    let dir = cache_dir()?;
    let mut hasher = DefaultHasher::new();
    executable.as_str().hash(&mut hasher);
    let stem = executable.file_name().unwrap_or("python");
    Some(dir.join(format!("{stem}-{:016x}.json", hasher.finish())))
}

fn fingerprint(executable: &Utf8Path) -> Option<(u128, u64)> {
    let metadata = fs::metadata(executable).ok()?;
    let mtime_ns = metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_nanos();
    Some((mtime_ns, metadata.len()))
}

/// Fetch a cached record, if one exists and still matches the binary.
pub fn load(executable: &Utf8Path) -> Option<Interpreter> {
    if disabled() {
        return None;
    }
    let path = entry_path(executable)?;
    let (mtime_ns, size) = fingerprint(executable)?;
    let mut file = File::open(&path).ok()?;
    file.lock_shared().ok()?;
    let mut content = String::new();
    let read = file.read_to_string(&mut content);
    let _ = file.unlock();
    read.ok()?;
    let entry: CacheEntry = serde_json::from_str(&content).ok()?;
    if entry.mtime_ns != mtime_ns || entry.size != size {
        debug!(exe = %executable, "stale probe cache entry");
        return None;
    }
    debug!(exe = %executable, "probe served from disk cache");
    Some(entry.interpreter)
}

/// Persist a probe result. Failures only cost the next run a re-probe.
pub fn store(executable: &Utf8Path, interpreter: &Interpreter) {
    if disabled() {
        return;
    }
    let Some(path) = entry_path(executable) else {
        return;
    };
    let Some((mtime_ns, size)) = fingerprint(executable) else {
        return;
    };
    let entry = CacheEntry {
        mtime_ns,
        size,
        interpreter: interpreter.clone(),
    };
    if let Err(error) = write_entry(&path, &entry) {
        debug!(exe = %executable, %error, "failed to write probe cache entry");
    }
}

fn write_entry(path: &std::path::Path, entry: &CacheEntry) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    file.lock_exclusive()?;
    let result = (|| {
        file.set_len(0)?;
        file.rewind()?;
        file.write_all(serde_json::to_string_pretty(entry)?.as_bytes())?;
        Ok(())
    })();
    let _ = file.unlock();
    result
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::testutil::cpython;

    struct CacheDirGuard;

    impl Drop for CacheDirGuard {
        fn drop(&mut self) {
            std::env::remove_var("VPY_CACHE_DIR");
        }
    }

    #[test]
    #[serial]
    fn round_trips_and_invalidates_on_change() {
        let temp = tempfile::tempdir().unwrap();
        std::env::set_var("VPY_CACHE_DIR", temp.path());
        std::env::remove_var("VPY_NO_CACHE");
        let _guard = CacheDirGuard;

        // use a file we control as the "binary"
        let exe_path = temp.path().join("python3");
        fs::write(&exe_path, b"#!/bin/true").unwrap();
        let exe = Utf8Path::from_path(&exe_path).unwrap();

        let interpreter = cpython(3, 11);
        store(exe, &interpreter);
        let loaded = load(exe).expect("cache hit");
        assert_eq!(loaded.version_info, interpreter.version_info);

        // size change invalidates
        fs::write(&exe_path, b"#!/bin/true\n# changed").unwrap();
        assert!(load(exe).is_none());
    }

    #[test]
    #[serial]
    fn disabled_via_env() {
        let temp = tempfile::tempdir().unwrap();
        std::env::set_var("VPY_CACHE_DIR", temp.path());
        std::env::set_var("VPY_NO_CACHE", "1");
        let _guard = CacheDirGuard;

        let exe_path = temp.path().join("python3");
        fs::write(&exe_path, b"x").unwrap();
        let exe = Utf8Path::from_path(&exe_path).unwrap();
        store(exe, &cpython(3, 11));
        assert!(load(exe).is_none());
        std::env::remove_var("VPY_NO_CACHE");
    }
}
