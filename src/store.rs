use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

pub const KEY_STUDENTS: &str = "students";
pub const KEY_RECORDS: &str = "records";
pub const KEY_CLASSES: &str = "classes";
pub const KEY_FILES: &str = "uploaded_files";
pub const KEY_TEACHER_NAME: &str = "teacher_name";

/// Durable string-keyed blob storage. Every collection is one JSON blob that
/// is rewritten whole on each mutation.
pub trait BlobStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Decode a blob. A missing or corrupt blob yields `None` so the caller can
/// fall back to its seed; corruption is logged, never surfaced.
pub fn load_json<T: DeserializeOwned>(store: &dyn BlobStore, key: &str) -> Option<T> {
    let raw = match store.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "blob read failed, using seed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "blob is corrupt, using seed");
            None
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &mut dyn BlobStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.save(key, &raw)
}

#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(|s| s.as_str())
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
