// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod error;
pub mod ingest;
pub mod output;

// ---- Re-exports for stable public API ----
pub use crate::error::CalendarError;
pub use crate::ingest::config::{load_config_default, load_config_from, CalendarConfig};
pub use crate::ingest::types::{CalendarEvent, FeedSource, RawRecord};
pub use crate::ingest::{build_document, run_once};
pub use crate::output::{CalendarDocument, ImpactSummary, OutputSink};
