//! Finexport Core - batch export of linked bank data
//!
//! This crate implements the export pipeline following hexagonal architecture:
//!
//! - **domain**: Core entities (institutions, records, request, summary)
//! - **ports**: Trait definitions for external dependencies (DataProvider, ObjectStore)
//! - **services**: Export orchestration and CSV serialization
//! - **adapters**: Concrete implementations (Plaid, S3, local filesystem, memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::PathBuf;
use std::sync::Arc;

use adapters::local::LocalObjectStore;
use adapters::memory::MemoryObjectStore;
use adapters::plaid::PlaidClient;
use adapters::s3::S3ObjectStore;
use config::AppConfig;
use ports::{DataProvider, ObjectStore};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{
    Dataset, ExportRequest, ExportSummary, Institution, InstitutionRegistry, InstitutionSummary,
    Record, UploadResult, Uploads,
};
pub use services::ExportService;

/// Where exported objects are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    S3,
    Local(PathBuf),
    Memory,
}

/// Wiring for one export run
///
/// Builds the Plaid client and the object store from an explicit
/// configuration and hands out an [`ExportService`].
pub struct ExportContext {
    pub config: AppConfig,
    pub export_service: ExportService,
    memory_store: Option<Arc<MemoryObjectStore>>,
}

impl ExportContext {
    pub fn new(
        config: AppConfig,
        registry: InstitutionRegistry,
        target: StoreTarget,
    ) -> Result<Self> {
        let provider: Arc<dyn DataProvider> = Arc::new(PlaidClient::new(&config.plaid)?);

        let mut memory_store = None;
        let store: Arc<dyn ObjectStore> = match target {
            StoreTarget::S3 => Arc::new(S3ObjectStore::new(&config.store)?),
            StoreTarget::Local(root) => Arc::new(LocalObjectStore::new(root)),
            StoreTarget::Memory => {
                let memory = Arc::new(MemoryObjectStore::new());
                memory_store = Some(Arc::clone(&memory));
                memory
            }
        };

        let export_service = ExportService::new(provider, store, registry, &config.store);

        Ok(Self {
            config,
            export_service,
            memory_store,
        })
    }

    /// Objects captured by a [`StoreTarget::Memory`] run
    pub fn captured_objects(&self) -> Vec<adapters::memory::StoredObject> {
        self.memory_store
            .as_ref()
            .map(|m| m.objects())
            .unwrap_or_default()
    }
}
