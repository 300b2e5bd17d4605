use chrono::NaiveDate;
use thiserror::Error;

use crate::core::valuation::BaselineType;

/// Failures surfaced to callers of the query operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("no region {city}-{district} ({usage})")]
    NoRegion {
        city: String,
        district: String,
        usage: String,
    },

    #[error("no data for given filters")]
    NoData,

    #[error("no data between {from} and {to}")]
    NoDataInWindow { from: NaiveDate, to: NaiveDate },

    #[error("no {0} baseline")]
    NoBaseline(BaselineType),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl QueryError {
    /// True for both the plain and the windowed "no data" outcome.
    pub fn is_no_data(&self) -> bool {
        matches!(self, QueryError::NoData | QueryError::NoDataInWindow { .. })
    }
}

/// Failures of a whole ingestion run. Individual bad rows never end up here.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: no INSERT statement found")]
    MalformedDocument,
}
