//! Object store port
//!
//! Any durable blob store that can write bytes under a bucket/key pair.

use crate::domain::result::Result;

/// Confirmation of a completed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    pub bucket: String,
    pub key: String,
    pub bytes_written: usize,
}

/// Object store trait
///
/// A successful `put` means the object is durable per the store's own
/// consistency model. Failures surface as `StoreWrite`; there is no retry.
pub trait ObjectStore: Send + Sync {
    /// Store name (e.g., "s3", "local")
    fn name(&self) -> &str;

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<PutReceipt>;
}
