//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The export pipeline
//! depends only on these traits, not on concrete implementations.

mod data_provider;
mod object_store;

pub use data_provider::{
    AccessToken, DataProvider, TransactionsPage, DEFAULT_PAGE_SIZE, MAX_STALLED_PAGES,
};
pub use object_store::{ObjectStore, PutReceipt};
