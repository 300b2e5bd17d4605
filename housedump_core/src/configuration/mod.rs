use log::LevelFilter;

use crate::{
    DEFAULT_FALLBACK_MONTHS, DEFAULT_USAGE, DEFAULT_WINDOW_MONTHS, MAX_PERMITS_THREADS,
};

#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub sql_path: Option<String>,
    pub table: Option<String>,
    pub usage: Option<String>,
    pub window_months: Option<u32>,
    pub fallback_months: Option<u32>,
    pub concurrent_threads: Option<usize>,
    pub log_level: Option<LevelFilter>,
}

impl Configuration {
    pub fn usage(&self) -> &str {
        self.usage.as_deref().unwrap_or(DEFAULT_USAGE)
    }

    pub fn window_months(&self) -> u32 {
        self.window_months.unwrap_or(DEFAULT_WINDOW_MONTHS)
    }

    pub fn fallback_months(&self) -> u32 {
        self.fallback_months.unwrap_or(DEFAULT_FALLBACK_MONTHS)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level.unwrap_or(LevelFilter::Info)
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            table: self.table.clone(),
            workers: self.concurrent_threads.unwrap_or(MAX_PERMITS_THREADS).max(1),
        }
    }
}

/// The part of the configuration ingestion cares about.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Only statements inserting into this table are read. `None` accepts every table.
    pub table: Option<String>,
    /// Upper bound on statements parsed at the same time by the parallel path.
    pub workers: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            table: None,
            workers: MAX_PERMITS_THREADS,
        }
    }
}

impl IngestOptions {
    pub fn accepts_table(&self, table: &str) -> bool {
        match &self.table {
            Some(wanted) => wanted.eq_ignore_ascii_case(table),
            None => true,
        }
    }
}
