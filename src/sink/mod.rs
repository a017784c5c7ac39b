// Directory-backed store (a local path or a mounted bucket)
pub mod directory;
pub use directory::DirectorySink;

// In-memory store, keeps every write
pub mod memory;
pub use memory::MemorySink;

use crate::error::PublishError;

/// Access control requested for a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    Private,
}

/// Transport attributes attached to every put
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: &'static str,
    pub content_disposition: &'static str,
    pub acl: Acl,
    pub server_side_encryption: Option<&'static str>,
}

impl PutOptions {
    /// Options used for published commit records
    pub fn json_record() -> Self {
        Self {
            content_type: "application/json",
            content_disposition: "attachment",
            acl: Acl::Private,
            server_side_encryption: Some("AES256"),
        }
    }
}

/// Trait for durable object stores
///
/// A put always overwrites whatever is stored under the key.
pub trait ObjectSink: Send + Sync {
    /// Store `body` under `key`
    fn put(&self, key: &str, body: &[u8], options: &PutOptions) -> Result<(), PublishError>;

    /// Human-readable location for log lines
    fn describe(&self) -> String;
}

/// Reject keys that could escape a key namespace
pub fn validate_key(key: &str) -> Result<(), PublishError> {
    let invalid = |reason: &str| PublishError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("empty key"));
    }
    if key.starts_with('/') {
        return Err(invalid("absolute key"));
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(invalid("empty path segment")),
            "." | ".." => return Err(invalid("relative path segment")),
            _ => {}
        }
    }
    Ok(())
}
