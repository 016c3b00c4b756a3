//! Replace-on-write persistence helpers
//!
//! Every artifact is written to a temporary file in the destination directory
//! and then renamed over the target, so readers see either the old file or the
//! complete new one, never a partial write.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::errors::{PipelineError, PipelineResult};

/// Atomically replace `path` with the output of `write`
///
/// Parent directories are created as needed.
pub fn write_atomic<F>(path: &Path, write: F) -> PipelineResult<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let tmp = stage(path, write)?;
    tmp.persist(path)
        .map_err(|e| PipelineError::storage(path, e.error))?;
    Ok(())
}

/// Like [`write_atomic`], but never replaces an existing file
///
/// Returns `Ok(false)` and leaves `path` untouched if it already exists.
pub fn write_new<F>(path: &Path, write: F) -> PipelineResult<bool>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let tmp = stage(path, write)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(PipelineError::storage(path, e.error)),
    }
}

/// Write and sync a temporary file next to `path`
fn stage<F>(path: &Path, write: F) -> PipelineResult<NamedTempFile>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| PipelineError::storage(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| PipelineError::storage(parent, e))?;
    write(tmp.as_file_mut()).map_err(|e| PipelineError::storage(path, e))?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| PipelineError::storage(path, e))?;
    Ok(tmp)
}

/// Atomically write `value` as pretty-printed JSON
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> PipelineResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, |out| out.write_all(&bytes))
}

/// Read a JSON document from `path`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> PipelineResult<T> {
    let bytes = fs::read(path).map_err(|e| PipelineError::storage(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn json_round_trip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("artifact.json");

        let mut value = BTreeMap::new();
        value.insert("answer".to_string(), 42u32);
        write_json_atomic(&path, &value).unwrap();

        let back: BTreeMap<String, u32> = read_json(&path).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");

        write_atomic(&path, |out| out.write_all(b"first")).unwrap();
        write_atomic(&path, |out| out.write_all(b"second")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        // No temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn write_new_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");

        assert!(write_new(&path, |out| out.write_all(b"first")).unwrap());
        assert!(!write_new(&path, |out| out.write_all(b"second")).unwrap());

        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: PipelineResult<u32> = read_json(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(PipelineError::Storage { .. })));
    }
}
