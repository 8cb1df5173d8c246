//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Plaid HTTP client for DataProvider
//! - S3 (SigV4-signed PUT) for ObjectStore
//! - Local filesystem for ObjectStore
//! - In-memory ObjectStore for dry runs and tests

pub mod local;
pub mod memory;
pub mod plaid;
pub mod s3;

#[cfg(test)]
pub mod plaid_mock;
