/// Square metres in one ping.
pub const M2_PER_PING: f64 = 3.305785;

/// Canonical city token for New Taipei.
pub const NEW_TAIPEI: &str = "NewTaipei";

/// Usage category assumed by callers that don't name one.
pub const DEFAULT_USAGE: &str = "住家用";

/// Filter value meaning "do not filter on this field" for district and usage.
pub const ALL: &str = "ALL";

pub const DEFAULT_WINDOW_MONTHS: u32 = 24;
pub const DEFAULT_FALLBACK_MONTHS: u32 = 60;

// Default number of statements parsed concurrently
pub static MAX_PERMITS_THREADS: usize = 16;

// Ingestion logs a progress line after this many statements
pub(crate) const PROGRESS_EVERY: usize = 5;

pub mod batch;
pub mod configuration;
pub mod core;
pub mod error;

pub use crate::core::dump::ingest::{ingest, IngestOutcome, IngestReport, Ingestor};
pub use crate::core::dump::loader::load_dump;
pub use crate::core::table::{QueryFilter, Table};
pub use crate::core::valuation::{ValuationRequest, ValuationResult};
pub use crate::error::{IngestError, QueryError};
