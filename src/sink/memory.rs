use super::{ObjectSink, PutOptions, validate_key};
use crate::error::PublishError;
use std::sync::Mutex;

/// One recorded put
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Keeps every put in memory, in order
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: Mutex<Vec<StoredObject>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every put so far, oldest first
    pub fn writes(&self) -> Vec<StoredObject> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Keys written so far, oldest first, duplicates included
    pub fn keys(&self) -> Vec<String> {
        self.writes().into_iter().map(|w| w.key).collect()
    }

    /// Latest body stored under `key`
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.writes()
            .into_iter()
            .rev()
            .find(|w| w.key == key)
            .map(|w| w.body)
    }
}

impl ObjectSink for MemorySink {
    fn put(&self, key: &str, body: &[u8], options: &PutOptions) -> Result<(), PublishError> {
        validate_key(key)?;
        let mut writes = self.writes.lock().map_err(|e| PublishError::WriteFailed {
            key: key.to_string(),
            reason: format!("sink lock poisoned: {e}"),
        })?;
        writes.push(StoredObject {
            key: key.to_string(),
            body: body.to_vec(),
            content_type: options.content_type.to_string(),
        });
        Ok(())
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}
