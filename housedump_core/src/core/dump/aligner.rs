use std::fmt::Display;

use serde::Serialize;

use crate::core::{
    record::{Record, COLUMN_COUNT},
    scalar::Scalar,
};

use super::{
    coercer::ScalarRow,
    extractor::{default_columns, ResolvedColumn},
};

/// Why a tuple did not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `()` or a tuple with only whitespace.
    EmptyTuple,
    /// The statement's column list names no canonical column.
    NoCanonicalColumns,
    /// Every canonical field ended up NULL.
    Unmappable,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyTuple => f.write_str("empty tuple"),
            SkipReason::NoCanonicalColumns => f.write_str("no canonical column in column list"),
            SkipReason::Unmappable => f.write_str("no value maps to a canonical column"),
        }
    }
}

/// How a row's length compared with the column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Exact,
    Padded,
    Truncated,
}

/// Maps rows of one statement onto the canonical fifteen-column record.
pub struct SchemaAligner {
    columns: Vec<ResolvedColumn>,
    maps_any: bool,
}

impl Default for SchemaAligner {
    fn default() -> Self {
        Self::new(default_columns())
    }
}

impl SchemaAligner {
    pub fn new(columns: Vec<ResolvedColumn>) -> Self {
        let maps_any = columns.iter().any(|c| c.canonical.is_some());
        Self { columns, maps_any }
    }

    pub fn columns(&self) -> &[ResolvedColumn] {
        &self.columns
    }

    /// Whether any value of this statement can land in the canonical schema.
    pub fn maps_any(&self) -> bool {
        self.maps_any
    }

    pub fn fit(&self, row_len: usize) -> Fit {
        match row_len.cmp(&self.columns.len()) {
            std::cmp::Ordering::Equal => Fit::Exact,
            std::cmp::Ordering::Less => Fit::Padded,
            std::cmp::Ordering::Greater => Fit::Truncated,
        }
    }

    /// Short rows are padded with NULL, long rows truncated, then values are placed
    /// by column name. When a name repeats, the later value wins.
    pub fn align(&self, row: ScalarRow) -> Result<Record, SkipReason> {
        if row.is_empty() {
            return Err(SkipReason::EmptyTuple);
        }
        if !self.maps_any {
            return Err(SkipReason::NoCanonicalColumns);
        }

        let mut values: [Scalar; COLUMN_COUNT] = Default::default();

        // Columns past the end of the row keep their NULL
        for (column, value) in self.columns.iter().zip(row) {
            if let Some(canonical) = column.canonical {
                values[canonical.index()] = value;
            }
        }

        if values.iter().all(Scalar::is_null) {
            return Err(SkipReason::Unmappable);
        }

        Ok(Record::new(values))
    }
}
