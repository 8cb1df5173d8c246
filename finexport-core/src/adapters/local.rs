//! Local filesystem object store
//!
//! Writes objects to `<root>/<bucket>/<key>`. Used for `--local-dir` runs and
//! for inspecting output without touching S3.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::ports::{ObjectStore, PutReceipt};

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem path an object would be written to
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(key.trim_start_matches('/'));
        if bucket.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::store_write(format!(
                "Refusing to write outside the export directory: {}/{}",
                bucket, key
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &str {
        "local"
    }

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<PutReceipt> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::store_write(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(&path, body)
            .map_err(|e| Error::store_write(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), bytes = body.len(), "Wrote object");
        Ok(PutReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            bytes_written: body.len(),
        })
    }
}
