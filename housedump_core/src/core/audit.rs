use ahash::{AHashMap, AHashSet};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use super::{
    canonical::geo::NEW_TAIPEI_DISTRICTS,
    record::Column,
    scalar::Scalar,
    table::{QueryFilter, Table},
};

/// Overview of what a table holds for one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub rows: usize,
    pub skipped: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub districts_in_city: usize,
    pub district_list: Vec<String>,
    /// Canonical New Taipei districts with no row in the city.
    pub missing_districts: Vec<String>,
}

/// How one raw district spelling was normalized, and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictPair {
    pub district_raw: Option<String>,
    pub district: Option<String>,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictAudit {
    pub unique_pairs: usize,
    pub top: Vec<DistrictPair>,
}

fn label(value: &Scalar) -> Option<String> {
    match value {
        Scalar::Null => None,
        Scalar::Number(n) => Some(n.to_string()),
        Scalar::Text(text) => Some(text.clone()),
    }
}

impl Table {
    pub fn health(&self, city: &str) -> HealthReport {
        let filter = QueryFilter::new().city(city);
        let districts: AHashSet<&str> = self
            .filter(&filter)
            .filter_map(|record| record.district())
            .collect();

        let missing_districts = NEW_TAIPEI_DISTRICTS
            .iter()
            .filter(|district| !districts.contains(*district))
            .map(|district| district.to_string())
            .collect();

        HealthReport {
            rows: self.len(),
            skipped: self.skipped(),
            date_range: self.date_range(),
            districts_in_city: districts.len(),
            district_list: districts.into_iter().sorted().map(str::to_string).collect(),
            missing_districts,
        }
    }

    /// `(district_raw, district)` pairs, most frequent first, at most `limit` of them.
    pub fn district_audit(&self, limit: usize) -> DistrictAudit {
        let mut pairs: AHashMap<(Option<String>, Option<String>), usize> = AHashMap::new();
        for record in self.records() {
            let key = (label(&record.district_raw), label(record.get(Column::District)));
            *pairs.entry(key).or_default() += 1;
        }

        let unique_pairs = pairs.len();
        let top = pairs
            .into_iter()
            .sorted_by(|(ka, na), (kb, nb)| nb.cmp(na).then_with(|| ka.cmp(kb)))
            .take(limit)
            .map(|((district_raw, district), n)| DistrictPair {
                district_raw,
                district,
                n,
            })
            .collect();

        DistrictAudit { unique_pairs, top }
    }
}
