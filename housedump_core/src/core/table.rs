use chrono::NaiveDate;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::ALL;

use super::record::{Column, Record};

/// Which rows a query looks at. Every field is optional; `"ALL"` (or an empty
/// string) for district or usage disables that filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    pub city: Option<String>,
    pub district: Option<String>,
    pub usage: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Inclusive date range.
    pub fn between(self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date(start).end_date(end)
    }

    pub fn matches(&self, record: &Record) -> bool {
        matches_text(record, Column::Usage, self.usage.as_deref(), true)
            && matches_text(record, Column::City, self.city.as_deref(), false)
            && matches_text(record, Column::District, self.district.as_deref(), true)
            && self.matches_date(record.trade_day)
    }

    fn matches_date(&self, day: Option<NaiveDate>) -> bool {
        if self.start_date.is_none() && self.end_date.is_none() {
            return true;
        }
        let Some(day) = day else {
            return false;
        };
        self.start_date.is_none_or(|start| day >= start)
            && self.end_date.is_none_or(|end| day <= end)
    }
}

fn matches_text(record: &Record, column: Column, wanted: Option<&str>, all_wildcard: bool) -> bool {
    match wanted {
        None | Some("") => true,
        Some(ALL) if all_wildcard => true,
        Some(wanted) => record.text(column) == Some(wanted),
    }
}

/// The enriched, immutable record store.
#[derive(Debug, Clone, Default)]
pub struct Table {
    records: Vec<Record>,
    skipped: usize,
}

impl From<Vec<Record>> for Table {
    fn from(records: Vec<Record>) -> Self {
        Table::new(records, 0)
    }
}

impl Table {
    /// `skipped` is the number of tuples ingestion could not turn into records.
    pub fn new(records: Vec<Record>, skipped: usize) -> Self {
        Self { records, skipped }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Earliest and latest parsed trade date.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self.records.iter().filter_map(|r| r.trade_day).minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(day) => Some((day, day)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }

    pub fn filter<'a>(&'a self, filter: &'a QueryFilter) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| filter.matches(r))
    }

    /// Rows matching `filter`, in ingestion order.
    pub fn view(&self, filter: &QueryFilter) -> TableView<'_> {
        TableView {
            rows: self.records.iter().filter(|r| filter.matches(r)).collect(),
        }
    }
}

/// Borrowed subset of a [`Table`].
#[derive(Debug, Clone)]
pub struct TableView<'a> {
    rows: Vec<&'a Record>,
}

impl<'a> TableView<'a> {
    pub fn rows(&self) -> &[&'a Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().copied()
    }

    /// Rows with a parsed trade date, paired with it.
    pub fn dated(&self) -> impl Iterator<Item = (NaiveDate, &'a Record)> + '_ {
        self.iter().filter_map(|r| r.trade_day.map(|day| (day, r)))
    }
}
