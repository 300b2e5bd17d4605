pub mod scalar;
pub mod record;

/// Turning dump text into aligned records
pub mod dump;

pub mod canonical;
pub mod features;
pub mod table;
pub mod stats;
pub mod valuation;
pub mod audit;
