//! In-memory object store
//!
//! Keeps every object in a list. Used by `--dry-run` and by tests.

use std::sync::Mutex;

use crate::domain::result::{Error, Result};
use crate::ports::{ObjectStore, PutReceipt};

/// Object held by [`MemoryObjectStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<Vec<StoredObject>>,
    fail_writes: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Snapshot of the stored objects, in write order
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects
            .lock()
            .map(|objects| objects.clone())
            .unwrap_or_default()
    }

    /// Body of the latest object written under `bucket/key`
    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects()
            .into_iter()
            .rev()
            .find(|o| o.bucket == bucket && o.key == key)
            .map(|o| o.body)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<PutReceipt> {
        if self.fail_writes {
            return Err(Error::store_write(format!(
                "write to {}/{} rejected",
                bucket, key
            )));
        }
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| Error::store_write("memory store lock poisoned"))?;
        objects.push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: body.to_vec(),
        });
        Ok(PutReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            bytes_written: body.len(),
        })
    }
}
