use std::fmt::Display;

use chrono::{Months, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_FALLBACK_MONTHS, DEFAULT_USAGE, DEFAULT_WINDOW_MONTHS, M2_PER_PING,
    error::QueryError,
};

use super::{
    features::risk_from_age,
    table::{QueryFilter, Table},
};

/// Where the reference price per ping comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineType {
    /// Median of risk-adjusted prices; the building's own age is not applied again.
    AdjustedMedian,
    /// Median of raw prices, discounted by the risk of the caller's building age.
    RawMedian,
}

impl Display for BaselineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaselineType::AdjustedMedian => f.write_str("adjusted_median"),
            BaselineType::RawMedian => f.write_str("raw_median"),
        }
    }
}

fn default_usage() -> String {
    DEFAULT_USAGE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_window_months() -> u32 {
    DEFAULT_WINDOW_MONTHS
}

fn default_fallback_months() -> u32 {
    DEFAULT_FALLBACK_MONTHS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub city: String,
    pub district: String,
    pub area_m2: f64,
    #[serde(default = "default_usage")]
    pub usage: String,
    #[serde(default)]
    pub age_years: Option<f64>,
    #[serde(default = "default_true")]
    pub use_adjusted_baseline: bool,
    #[serde(default = "default_window_months")]
    pub window_months: u32,
    #[serde(default = "default_fallback_months")]
    pub fallback_months: u32,
    /// Value the property as of this date; later transactions are ignored.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl ValuationRequest {
    pub fn new(city: impl Into<String>, district: impl Into<String>, area_m2: f64) -> Self {
        Self {
            city: city.into(),
            district: district.into(),
            area_m2,
            usage: default_usage(),
            age_years: None,
            use_adjusted_baseline: true,
            window_months: DEFAULT_WINDOW_MONTHS,
            fallback_months: DEFAULT_FALLBACK_MONTHS,
            as_of: None,
        }
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn age_years(mut self, age_years: f64) -> Self {
        self.age_years = Some(age_years);
        self
    }

    /// Use the raw median, discounted by the risk of `age_years`.
    pub fn raw_baseline(mut self) -> Self {
        self.use_adjusted_baseline = false;
        self
    }

    pub fn window_months(mut self, months: u32) -> Self {
        self.window_months = months;
        self
    }

    pub fn fallback_months(mut self, months: u32) -> Self {
        self.fallback_months = months;
        self
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    fn validate(&self) -> Result<(), QueryError> {
        if !self.area_m2.is_finite() || self.area_m2 <= 0.0 {
            return Err(QueryError::InvalidRequest(format!(
                "area_m2 must be a positive number, got {}",
                self.area_m2
            )));
        }
        match self.age_years {
            Some(age) if !age.is_finite() => Err(QueryError::InvalidRequest(format!(
                "age_years must be a finite number, got {}",
                age
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResult {
    pub city: String,
    pub district: String,
    pub usage: String,
    pub area_m2: f64,
    pub area_ping: f64,
    pub baseline_type: BaselineType,
    pub baseline_pp_ping: f64,
    pub applied_risk_factor: Option<f64>,
    pub est_total: f64,
    pub est_range_lo: f64,
    pub est_range_hi: f64,
    pub cut_from: NaiveDate,
    pub cut_to: NaiveDate,
    pub sample_size: usize,
    pub used_fallback: bool,
}

impl ValuationResult {
    /// Copy rounded for display: areas to 2 decimals, money to whole units, risk to 3 decimals.
    pub fn rounded(&self) -> ValuationResult {
        ValuationResult {
            area_m2: round_to(self.area_m2, 2),
            area_ping: round_to(self.area_ping, 2),
            baseline_pp_ping: self.baseline_pp_ping.round(),
            applied_risk_factor: self.applied_risk_factor.map(|r| round_to(r, 3)),
            est_total: self.est_total.round(),
            est_range_lo: self.est_range_lo.round(),
            est_range_hi: self.est_range_hi.round(),
            ..self.clone()
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Median of `values`; the mean of the two middle values for an even count.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// `date` moved back by whole calendar months, the day clamped to the month's end.
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

pub const BAND_LOW: f64 = 0.9;
pub const BAND_HIGH: f64 = 1.1;

impl Table {
    /// Estimates a property's total price from recent transactions in its region.
    ///
    /// The sample is every dated transaction in the last `window_months` before the
    /// region's latest one. When that is empty the window widens to
    /// `fallback_months` (if non-zero) before giving up.
    pub fn valuation(&self, request: &ValuationRequest) -> Result<ValuationResult, QueryError> {
        request.validate()?;

        let filter = QueryFilter::new()
            .city(request.city.as_str())
            .district(request.district.as_str())
            .usage(request.usage.as_str());
        let region = self.view(&filter);

        if region.is_empty() {
            return Err(QueryError::NoRegion {
                city: request.city.clone(),
                district: request.district.clone(),
                usage: request.usage.clone(),
            });
        }

        let dated: Vec<_> = region
            .dated()
            .filter(|(day, _)| request.as_of.is_none_or(|as_of| *day <= as_of))
            .collect();

        let latest = match request.as_of {
            Some(as_of) if !dated.is_empty() => as_of,
            _ => dated.iter().map(|(day, _)| *day).max().ok_or(QueryError::NoData)?,
        };

        let sample_since = |cut: NaiveDate| {
            dated
                .iter()
                .filter(|(day, _)| *day >= cut)
                .map(|(_, record)| *record)
                .collect::<Vec<_>>()
        };

        let mut cut = months_before(latest, request.window_months);
        let mut sample = sample_since(cut);
        let mut used_fallback = false;

        if sample.is_empty() && request.fallback_months > 0 {
            cut = months_before(latest, request.fallback_months);
            sample = sample_since(cut);
            used_fallback = true;
            debug!(
                "Valuation window of {} months empty, widened to {} months",
                request.window_months, request.fallback_months
            );
        }

        if sample.is_empty() {
            return Err(QueryError::NoDataInWindow {
                from: cut,
                to: latest,
            });
        }

        let area_ping = request.area_m2 / M2_PER_PING;

        let (baseline_type, baseline_pp_ping, applied_risk_factor, est_total) =
            if request.use_adjusted_baseline {
                let mut prices: Vec<f64> =
                    sample.iter().filter_map(|r| r.adj_price_per_ping).collect();
                let reference = median(&mut prices)
                    .ok_or(QueryError::NoBaseline(BaselineType::AdjustedMedian))?;
                (BaselineType::AdjustedMedian, reference, None, reference * area_ping)
            } else {
                let mut prices: Vec<f64> =
                    sample.iter().filter_map(|r| r.price_per_ping()).collect();
                let reference =
                    median(&mut prices).ok_or(QueryError::NoBaseline(BaselineType::RawMedian))?;
                let risk = risk_from_age(request.age_years);
                (
                    BaselineType::RawMedian,
                    reference,
                    Some(risk),
                    reference * (1.0 - risk) * area_ping,
                )
            };

        Ok(ValuationResult {
            city: request.city.clone(),
            district: request.district.clone(),
            usage: request.usage.clone(),
            area_m2: request.area_m2,
            area_ping,
            baseline_type,
            baseline_pp_ping,
            applied_risk_factor,
            est_total,
            est_range_lo: est_total * BAND_LOW,
            est_range_hi: est_total * BAND_HIGH,
            cut_from: cut,
            cut_to: latest,
            sample_size: sample.len(),
            used_fallback,
        })
    }
}
