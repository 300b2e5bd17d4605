use chrono::{NaiveDate, NaiveDateTime};

use super::{
    record::{Column, Record},
    scalar::Scalar,
};

pub const RISK_MIDPOINT_AGE: f64 = 30.0;
pub const RISK_STEEPNESS: f64 = 0.12;
pub const RISK_FLOOR: f64 = 0.03;
pub const RISK_CEILING: f64 = 0.98;
/// Risk assumed when a building's age is unknown.
pub const RISK_UNKNOWN_AGE: f64 = 0.5;

// Years in the Minguo calendar start at 1912.
const ROC_YEAR_OFFSET: i32 = 1911;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Logistic depreciation risk for a building of `age` years.
pub fn risk_from_age(age: Option<f64>) -> f64 {
    match age {
        Some(age) if age.is_finite() => {
            let risk = 1.0 / (1.0 + (-RISK_STEEPNESS * (age - RISK_MIDPOINT_AGE)).exp());
            risk.clamp(RISK_FLOOR, RISK_CEILING)
        }
        _ => RISK_UNKNOWN_AGE,
    }
}

/// Reads a trade date from text (`2020-03-15`, `2020/03/15`, `20200315`, with or
/// without a time part) or from a seven digit Minguo date such as `1090315`.
pub fn parse_trade_date(value: &Scalar) -> Option<NaiveDate> {
    match value {
        Scalar::Null => None,
        Scalar::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 && *n >= 0.0 {
                parse_date_text(&format!("{}", *n as u64))
            } else {
                None
            }
        }
        Scalar::Text(text) => parse_date_text(text.trim()),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if text.len() == 7 && text.bytes().all(|b| b.is_ascii_digit()) {
        return parse_roc_date(text);
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|datetime| datetime.date())
        })
}

// yyymmdd, e.g. 1090315 -> 2020-03-15
fn parse_roc_date(digits: &str) -> Option<NaiveDate> {
    let year: i32 = digits[..3].parse().ok()?;
    let month: u32 = digits[3..5].parse().ok()?;
    let day: u32 = digits[5..7].parse().ok()?;
    NaiveDate::from_ymd_opt(year + ROC_YEAR_OFFSET, month, day)
}

/// Parses the trade date, back-fills a missing risk factor from the building age
/// and computes the risk-adjusted price per ping.
pub fn derive(record: &mut Record) {
    record.trade_day = parse_trade_date(record.get(Column::TradeDate));

    let risk = match record.risk_factor() {
        Some(risk) => risk,
        None => {
            let risk = risk_from_age(record.number(Column::AgeYears));
            record.set(Column::RiskFactor, Scalar::Number(risk));
            risk
        }
    };

    record.adj_price_per_ping = record.price_per_ping().map(|price| price * (1.0 - risk));
}

pub fn derive_all(records: &mut [Record]) {
    records.iter_mut().for_each(derive);
}
