use crate::error::PublishError;
use crate::sink::{ObjectSink, PutOptions};
use crate::types::CommitRecord;
use std::sync::Arc;

/// Serializes commit records and writes them to the durable sink
#[derive(Clone)]
pub struct Publisher {
    sink: Arc<dyn ObjectSink>,
    options: PutOptions,
}

impl Publisher {
    pub fn new(sink: Arc<dyn ObjectSink>) -> Self {
        Self {
            sink,
            options: PutOptions::json_record(),
        }
    }

    /// Key a record is stored under: `{repo}/{branch}/{hash}.json`
    pub fn object_key(record: &CommitRecord) -> String {
        format!("{}/{}/{}.json", record.repo, record.branch, record.hash)
    }

    /// Write `record`, overwriting any previous copy, and return its key
    pub fn publish(&self, record: &CommitRecord) -> Result<String, PublishError> {
        let key = Self::object_key(record);
        let body = serde_json::to_vec(record).map_err(|source| PublishError::Serialize {
            key: key.clone(),
            source,
        })?;

        tracing::info!("Uploading {} ({} bytes)", key, body.len());
        self.sink.put(&key, &body, &self.options)?;
        Ok(key)
    }

    /// Location of the underlying sink
    pub fn destination(&self) -> String {
        self.sink.describe()
    }
}
