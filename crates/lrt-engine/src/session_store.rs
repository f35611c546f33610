//! On-disk session scratchpad: `raw.json`, `inc_w_si.json`, `inc_wo_si.json`,
//! `exc.json`, `metadata.json`, `affected_laws.json`, one directory per
//! session. Every write goes through a temp-file-then-rename so a concurrent
//! reader never observes a partially-written file.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::EngineResult;

pub const RAW_FILE: &str = "raw.json";
pub const GROUP1_FILE: &str = "inc_w_si.json";
pub const GROUP2_FILE: &str = "inc_wo_si.json";
pub const GROUP3_FILE: &str = "exc.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const AFFECTED_LAWS_FILE: &str = "affected_laws.json";

/// Every scratchpad file name a session directory may contain, in the
/// fixed display order `session show` walks them in.
pub const SCRATCHPAD_FILES: &[&str] = &[
    RAW_FILE,
    GROUP1_FILE,
    GROUP2_FILE,
    GROUP3_FILE,
    METADATA_FILE,
    AFFECTED_LAWS_FILE,
];

pub struct SessionStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn write_atomic(&self, path: &Path, value: &Value) -> EngineResult<()> {
        tokio::fs::create_dir_all(path.parent().unwrap()).await?;
        let tmp_path = path.with_extension("tmp");
        let text = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&tmp_path, text).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    async fn read_or_default(&self, path: &Path, default: Value) -> EngineResult<Value> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_to_array(&self, session_id: &str, file_name: &str, record: Value) -> EngineResult<()> {
        let guard = self.lock_for(session_id).await;
        let _permit = guard.lock().await;
        let path = self.session_dir(session_id).join(file_name);
        let existing = self.read_or_default(&path, Value::Array(Vec::new())).await?;
        let mut array = match existing {
            Value::Array(a) => a,
            _ => Vec::new(),
        };
        array.push(record);
        self.write_atomic(&path, &Value::Array(array)).await
    }

    pub async fn append_raw(&self, session_id: &str, record: Value) -> EngineResult<()> {
        self.append_to_array(session_id, RAW_FILE, record).await
    }

    pub async fn append_group1(&self, session_id: &str, record: Value) -> EngineResult<()> {
        self.append_to_array(session_id, GROUP1_FILE, record).await
    }

    pub async fn append_group2(&self, session_id: &str, record: Value) -> EngineResult<()> {
        self.append_to_array(session_id, GROUP2_FILE, record).await
    }

    /// `exc.json` is keyed by a stringified 1-based index rather than a
    /// plain array, so group3 gets its own append shape.
    pub async fn append_group3(&self, session_id: &str, record: Value) -> EngineResult<()> {
        let guard = self.lock_for(session_id).await;
        let _permit = guard.lock().await;
        let path = self.session_dir(session_id).join(GROUP3_FILE);
        let existing = self
            .read_or_default(&path, Value::Object(serde_json::Map::new()))
            .await?;
        let mut map = match existing {
            Value::Object(m) => m,
            _ => serde_json::Map::new(),
        };
        let next_index = map.len() + 1;
        map.insert(next_index.to_string(), record);
        self.write_atomic(&path, &Value::Object(map)).await
    }

    pub async fn write_metadata(&self, session_id: &str, metadata: Value) -> EngineResult<()> {
        let guard = self.lock_for(session_id).await;
        let _permit = guard.lock().await;
        let path = self.session_dir(session_id).join(METADATA_FILE);
        self.write_atomic(&path, &metadata).await
    }

    /// Superseded by `CascadeTracker`; kept as an append-only legacy log.
    pub async fn record_legacy_affected(&self, session_id: &str, record: Value) -> EngineResult<()> {
        self.append_to_array(session_id, AFFECTED_LAWS_FILE, record).await
    }

    /// Overwrites the legacy affected-laws log wholesale. Used by a cascade
    /// sweep to write its entries back with `status: processed` once handled.
    pub async fn overwrite_legacy_affected(&self, session_id: &str, records: Value) -> EngineResult<()> {
        let guard = self.lock_for(session_id).await;
        let _permit = guard.lock().await;
        let path = self.session_dir(session_id).join(AFFECTED_LAWS_FILE);
        self.write_atomic(&path, &records).await
    }

    pub async fn read_back(&self, session_id: &str, file_name: &str) -> EngineResult<Value> {
        let path = self.session_dir(session_id).join(file_name);
        self.read_or_default(&path, Value::Null).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn append_raw_accumulates_into_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.append_raw("2024-01-01_2024-01-02", json!({"name": "a"})).await.unwrap();
        store.append_raw("2024-01-01_2024-01-02", json!({"name": "b"})).await.unwrap();

        let back = store.read_back("2024-01-01_2024-01-02", RAW_FILE).await.unwrap();
        assert_eq!(back.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn append_group3_indexes_by_stringified_one_based_position() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.append_group3("s1", json!({"name": "x"})).await.unwrap();
        store.append_group3("s1", json!({"name": "y"})).await.unwrap();

        let back = store.read_back("s1", GROUP3_FILE).await.unwrap();
        let map = back.as_object().unwrap();
        assert_eq!(map["1"]["name"], "x");
        assert_eq!(map["2"]["name"], "y");
    }

    #[tokio::test]
    async fn write_metadata_overwrites_rather_than_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.write_metadata("s1", json!({"count": 1})).await.unwrap();
        store.write_metadata("s1", json!({"count": 2})).await.unwrap();

        let back = store.read_back("s1", METADATA_FILE).await.unwrap();
        assert_eq!(back["count"], 2);
    }

    #[tokio::test]
    async fn overwrite_legacy_affected_replaces_rather_than_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .record_legacy_affected("s1", json!({"affected_law": "a"}))
            .await
            .unwrap();
        store
            .overwrite_legacy_affected("s1", json!([{"affected_law": "b"}]))
            .await
            .unwrap();

        let back = store.read_back("s1", AFFECTED_LAWS_FILE).await.unwrap();
        let array = back.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["affected_law"], "b");
    }

    #[tokio::test]
    async fn read_back_missing_file_returns_null() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let back = store.read_back("missing", RAW_FILE).await.unwrap();
        assert!(back.is_null());
    }
}
