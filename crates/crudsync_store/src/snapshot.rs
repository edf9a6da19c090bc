//! JSON snapshots of a [`CrudState`].
//!
//! Snapshots are written to a sibling temporary file first and renamed into
//! place, so a crash never leaves a half-written snapshot behind.

use crate::error::StoreResult;
use crate::state::CrudState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `state` to `path` as pretty-printed JSON.
pub fn save_snapshot<O, I, Q>(path: &Path, state: &CrudState<O, I, Q>) -> StoreResult<()>
where
    O: Serialize,
    I: Serialize,
    Q: Serialize,
{
    let bytes = serde_json::to_vec_pretty(state)?;

    let tmp_path = temp_path(path);
    let written = write_file(&tmp_path, &bytes).and_then(|()| fs::rename(&tmp_path, path));
    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    Ok(written?)
}

/// Sibling of `path` with `.tmp` appended to the full file name.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Reads a snapshot previously written by [`save_snapshot`].
pub fn load_snapshot<O, I, Q>(path: &Path) -> StoreResult<CrudState<O, I, Q>>
where
    O: DeserializeOwned,
    I: DeserializeOwned,
    Q: DeserializeOwned,
{
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::status::{EntityStatusPatch, PostStatus, QueryResult};
    use tempfile::tempdir;

    type TestState = CrudState<String, String, Vec<String>>;

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = TestState::new();
        state.set_query("all", vec!["a".into()]);
        state.set_results("all", QueryResult::loaded(vec!["1".into()]));
        state.set_entities(vec![("1".to_string(), "one".to_string())]);
        state.set_status("1", &EntityStatusPatch::new().modified(true));
        state.set_post_status(
            "",
            PostStatus::failed("offline", Some(503), "draft".into(), Some(42)),
        );

        save_snapshot(&path, &state).unwrap();
        assert!(!temp_path(&path).exists());

        let restored: TestState = load_snapshot(&path).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn missing_snapshot_is_io_error() {
        let dir = tempdir().unwrap();
        let result: StoreResult<TestState> = load_snapshot(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn corrupt_snapshot_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{ not json").unwrap();

        let result: StoreResult<TestState> = load_snapshot(&path);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn partial_snapshot_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, br#"{"entities":{"1":"one"}}"#).unwrap();

        let restored: TestState = load_snapshot(&path).unwrap();
        assert_eq!(restored.entity("1").map(String::as_str), Some("one"));
        assert!(restored.all_queries().is_empty());
    }

    #[test]
    fn temp_file_keeps_full_file_name() {
        let dir = tempdir().unwrap();
        let json = temp_path(&dir.path().join("state.json"));
        let yaml = temp_path(&dir.path().join("state.yaml"));

        assert_ne!(json, yaml);
        assert_eq!(json.file_name().unwrap(), "state.json.tmp");
    }

    #[test]
    fn failed_save_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let result = save_snapshot(&path, &TestState::new());

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(!temp_path(&path).exists());
        assert!(path.join("keep").exists());
    }
}
