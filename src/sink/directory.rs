use super::{Acl, ObjectSink, PutOptions, validate_key};
use crate::error::PublishError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Stores objects as files below a root directory
///
/// Keys map to relative paths. Each write lands in a temporary sibling first and
/// is renamed into place, so readers only ever see complete payloads.
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Create the sink, creating `root` if needed
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::info!("Publishing records to directory {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path an object key maps to
    pub fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn write_atomic(&self, path: &Path, body: &[u8], acl: Acl) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));

        let result = write_and_rename(&tmp, path, body, acl);
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn write_and_rename(tmp: &Path, path: &Path, body: &[u8], acl: Acl) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(body)?;
    file.sync_all()?;
    drop(file);
    apply_acl(tmp, acl)?;
    fs::rename(tmp, path)
}

#[cfg(unix)]
fn apply_acl(path: &Path, acl: Acl) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = match acl {
        Acl::Private => 0o600,
    };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_acl(_path: &Path, _acl: Acl) -> std::io::Result<()> {
    Ok(())
}

impl ObjectSink for DirectorySink {
    fn put(&self, key: &str, body: &[u8], options: &PutOptions) -> Result<(), PublishError> {
        validate_key(key)?;
        if let Some(sse) = options.server_side_encryption {
            tracing::trace!("Server-side encryption '{}' is left to the volume", sse);
        }

        let path = self.object_path(key);
        self.write_atomic(&path, body, options.acl)
            .map_err(|e| PublishError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn describe(&self) -> String {
        format!("dir://{}", self.root.display())
    }
}
