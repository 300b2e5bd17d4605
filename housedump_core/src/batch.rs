use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::{
    configuration::Configuration,
    core::{
        stats::{MonthlyStats, YearlyStats},
        table::{QueryFilter, Table},
        valuation::{ValuationRequest, ValuationResult},
    },
    error::QueryError,
};

/// A batch file: lists of queries run against one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchRequest {
    pub monthly: Vec<QueryFilter>,
    pub yearly: Vec<QueryFilter>,
    pub valuation: Vec<BatchValuation>,
}

fn default_true() -> bool {
    true
}

/// A valuation as written in a batch file. Fields left out take the
/// configured defaults, see [`BatchRequest::with_defaults`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchValuation {
    pub city: String,
    pub district: String,
    pub area_m2: f64,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub age_years: Option<f64>,
    #[serde(default = "default_true")]
    pub use_adjusted_baseline: bool,
    #[serde(default)]
    pub window_months: Option<u32>,
    #[serde(default)]
    pub fallback_months: Option<u32>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl BatchValuation {
    /// The request to run. Anything still unset falls back to the crate defaults.
    pub fn request(&self) -> ValuationRequest {
        let defaults = ValuationRequest::new(self.city.as_str(), self.district.as_str(), self.area_m2);
        ValuationRequest {
            usage: self.usage.clone().unwrap_or_else(|| defaults.usage.clone()),
            age_years: self.age_years,
            use_adjusted_baseline: self.use_adjusted_baseline,
            window_months: self.window_months.unwrap_or(defaults.window_months),
            fallback_months: self.fallback_months.unwrap_or(defaults.fallback_months),
            as_of: self.as_of,
            ..defaults
        }
    }
}

impl From<ValuationRequest> for BatchValuation {
    fn from(request: ValuationRequest) -> Self {
        Self {
            city: request.city,
            district: request.district,
            area_m2: request.area_m2,
            usage: Some(request.usage),
            age_years: request.age_years,
            use_adjusted_baseline: request.use_adjusted_baseline,
            window_months: Some(request.window_months),
            fallback_months: Some(request.fallback_months),
            as_of: request.as_of,
        }
    }
}

impl BatchRequest {
    /// Fills in usage, window and fallback months on every query that doesn't name its own.
    pub fn with_defaults(mut self, config: &Configuration) -> Self {
        for filter in self.monthly.iter_mut().chain(self.yearly.iter_mut()) {
            filter.usage.get_or_insert_with(|| config.usage().to_string());
        }
        for valuation in self.valuation.iter_mut() {
            valuation.usage.get_or_insert_with(|| config.usage().to_string());
            valuation.window_months.get_or_insert(config.window_months());
            valuation.fallback_months.get_or_insert(config.fallback_months());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.monthly.len() + self.yearly.len() + self.valuation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One query and either its result or the reason it failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry<Q, R> {
    pub query: Q,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<Q, R> BatchEntry<Q, R> {
    fn new(query: Q, outcome: Result<R, QueryError>) -> Self {
        match outcome {
            Ok(result) => Self {
                query,
                result: Some(result),
                error: None,
            },
            Err(e) => Self {
                query,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub monthly: Vec<BatchEntry<QueryFilter, Vec<MonthlyStats>>>,
    pub yearly: Vec<BatchEntry<QueryFilter, Vec<YearlyStats>>>,
    pub valuation: Vec<BatchEntry<ValuationRequest, ValuationResult>>,
}

// Runs `query` for every item on the blocking pool. One entry per query, in input order.
async fn run_all<Q, R, F>(table: &Arc<Table>, queries: Vec<Q>, query: F) -> Vec<BatchEntry<Q, R>>
where
    Q: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(&Table, &Q) -> Result<R, QueryError> + Copy + Send + 'static,
{
    let tasks = queries.iter().cloned().map(|q| {
        let table = Arc::clone(table);
        task::spawn_blocking(move || query(&table, &q))
    });

    join_all(tasks)
        .await
        .into_iter()
        .zip(queries)
        .map(|(joined, q)| match joined {
            Ok(outcome) => BatchEntry::new(q, outcome),
            Err(e) => {
                error!("Batch query task failed: {}", e);
                BatchEntry {
                    query: q,
                    result: None,
                    error: Some(format!("query task failed: {}", e)),
                }
            }
        })
        .collect()
}

/// Runs every query of `request`. Failing queries are reported per entry.
pub async fn run_batch(table: Arc<Table>, request: BatchRequest) -> BatchReport {
    info!("Running batch of {} queries", request.len());

    let valuations = request.valuation.iter().map(BatchValuation::request).collect();

    let monthly = run_all(&table, request.monthly, |t, f| t.monthly_stats(f)).await;
    let yearly = run_all(&table, request.yearly, |t, f| t.yearly_stats(f)).await;
    let valuation = run_all(&table, valuations, |t, r| t.valuation(r)).await;

    BatchReport {
        monthly,
        yearly,
        valuation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_panicking_query_keeps_its_entry() {
        let table = Arc::new(Table::default());
        let entries = run_all(&table, vec![1u32, 2, 3], |_, q: &u32| {
            if *q == 2 {
                panic!("query {} blew up", q);
            }
            Ok(*q * 10)
        })
        .await;

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].result, Some(10));
        assert_eq!(entries[1].query, 2);
        assert!(!entries[1].is_ok());
        assert!(entries[1].error.as_deref().unwrap().starts_with("query task failed"));
        assert_eq!(entries[2].result, Some(30));
    }

    #[test]
    fn test_valuation_defaults_from_configuration() {
        let request: BatchRequest = serde_json::from_str(
            r#"{"valuation": [
                {"city": "NewTaipei", "district": "板橋區", "area_m2": 33},
                {"city": "NewTaipei", "district": "板橋區", "area_m2": 33,
                 "usage": "住家用", "window_months": 6}
            ]}"#,
        )
        .unwrap();
        let config = Configuration {
            usage: Some("辦公用".to_string()),
            window_months: Some(12),
            fallback_months: Some(0),
            ..Configuration::default()
        };

        let filled: Vec<ValuationRequest> = request
            .with_defaults(&config)
            .valuation
            .iter()
            .map(BatchValuation::request)
            .collect();

        assert_eq!(filled[0].usage, "辦公用");
        assert_eq!(filled[0].window_months, 12);
        assert_eq!(filled[0].fallback_months, 0);
        assert_eq!(filled[1].usage, "住家用");
        assert_eq!(filled[1].window_months, 6);
        assert!(filled[1].use_adjusted_baseline);
    }

    #[test]
    fn test_unfilled_valuation_uses_crate_defaults() {
        let valuation = BatchValuation::from(ValuationRequest::new("NewTaipei", "板橋區", 33.0));
        assert_eq!(valuation.request(), ValuationRequest::new("NewTaipei", "板橋區", 33.0));

        let bare = BatchValuation {
            usage: None,
            window_months: None,
            fallback_months: None,
            ..valuation
        };
        assert_eq!(bare.request(), ValuationRequest::new("NewTaipei", "板橋區", 33.0));
    }
}
