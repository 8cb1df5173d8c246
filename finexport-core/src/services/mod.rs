//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions.

mod export;
mod tabular;

pub use export::{lookback_window, ExportService};
pub use tabular::{stringify, TabularWriter, EMPTY_HEADER, KEY_TIMESTAMP_FORMAT};
