use ahash::AHashMap;
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::error::QueryError;

use super::{
    record::Record,
    table::{QueryFilter, Table, TableView},
};

/// One (city, district) pair present in the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub city: String,
    pub district: String,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    /// First day of the month.
    pub month: NaiveDate,
    pub avg_raw: Option<f64>,
    pub avg_adj: Option<f64>,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyStats {
    pub year: i32,
    pub avg_raw: Option<f64>,
    pub avg_adj: Option<f64>,
    pub n: usize,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

// Per bucket: mean raw price, mean adjusted price, number of raw prices.
struct Bucket<K> {
    key: K,
    avg_raw: Option<f64>,
    avg_adj: Option<f64>,
    n: usize,
}

fn bucketize<K, F>(view: &TableView<'_>, key: F) -> Result<Vec<Bucket<K>>, QueryError>
where
    K: Ord + Copy,
    F: Fn(NaiveDate) -> K,
{
    if view.is_empty() {
        return Err(QueryError::NoData);
    }

    let dated: Vec<(K, &Record)> = view
        .dated()
        .map(|(day, record)| (key(day), record))
        .sorted_by_key(|(k, _)| *k)
        .collect();

    if dated.is_empty() {
        return Err(QueryError::NoData);
    }

    let undated = view.len() - dated.len();
    if undated > 0 {
        debug!("{} rows without a trade date left out of the buckets", undated);
    }

    let buckets = dated
        .into_iter()
        .chunk_by(|(k, _)| *k)
        .into_iter()
        .map(|(key, rows)| {
            let mut raw = Mean::default();
            let mut adj = Mean::default();
            for (_, record) in rows {
                raw.push(record.price_per_ping());
                adj.push(record.adj_price_per_ping);
            }
            Bucket {
                key,
                avg_raw: raw.value(),
                avg_adj: adj.value(),
                n: raw.count,
            }
        })
        .collect();

    Ok(buckets)
}

pub fn month_start(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

impl Table {
    /// Regions with at least one matching row, busiest first.
    pub fn list_regions(&self, filter: &QueryFilter) -> Vec<RegionSummary> {
        let mut regions: AHashMap<(&str, &str), RegionSummary> = AHashMap::new();

        for record in self.filter(filter) {
            let (Some(city), Some(district)) = (record.city(), record.district()) else {
                continue;
            };
            let summary = regions
                .entry((city, district))
                .or_insert_with(|| RegionSummary {
                    city: city.to_string(),
                    district: district.to_string(),
                    min_date: None,
                    max_date: None,
                    n: 0,
                });
            summary.n += 1;
            if let Some(day) = record.trade_day {
                summary.min_date = Some(summary.min_date.map_or(day, |d| d.min(day)));
                summary.max_date = Some(summary.max_date.map_or(day, |d| d.max(day)));
            }
        }

        regions
            .into_values()
            .sorted_by(|a, b| {
                b.n.cmp(&a.n)
                    .then_with(|| a.city.cmp(&b.city))
                    .then_with(|| a.district.cmp(&b.district))
            })
            .collect()
    }

    pub fn monthly_stats(&self, filter: &QueryFilter) -> Result<Vec<MonthlyStats>, QueryError> {
        let view = self.view(filter);
        let buckets = bucketize(&view, month_start)?;
        Ok(buckets
            .into_iter()
            .map(|b| MonthlyStats {
                month: b.key,
                avg_raw: b.avg_raw,
                avg_adj: b.avg_adj,
                n: b.n,
            })
            .collect())
    }

    pub fn yearly_stats(&self, filter: &QueryFilter) -> Result<Vec<YearlyStats>, QueryError> {
        let view = self.view(filter);
        let buckets = bucketize(&view, |day| day.year())?;
        Ok(buckets
            .into_iter()
            .map(|b| YearlyStats {
                year: b.key,
                avg_raw: b.avg_raw,
                avg_adj: b.avg_adj,
                n: b.n,
            })
            .collect())
    }
}
