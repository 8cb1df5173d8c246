//! Core domain entities
//!
//! Institutions, exported records, the invocation payload and the run
//! summary. Pure data with validation - no I/O.

mod institution;
mod record;
mod request;
pub mod result;
mod summary;

pub use institution::{Institution, InstitutionRegistry};
pub use record::{tag_record, Dataset, Record, PROVENANCE_COLUMNS};
pub use request::{ExportRequest, DEFAULT_LOOKBACK_DAYS};
pub use summary::{ExportSummary, InstitutionSummary, UploadResult, Uploads, RESERVED_UPLOAD_KEYS};
