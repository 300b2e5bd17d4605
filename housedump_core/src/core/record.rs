use chrono::NaiveDate;

use super::scalar::Scalar;

pub const COLUMN_COUNT: usize = 15;

/// The canonical columns of a house transaction record, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    TradeDate,
    Year,
    Quarter,
    City,
    District,
    AgeYears,
    AreaM2,
    AreaPing,
    PriceTotal,
    PricePerPing,
    UnitPriceM2,
    Usage,
    TotalFloors,
    Floor,
    RiskFactor,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::TradeDate,
        Column::Year,
        Column::Quarter,
        Column::City,
        Column::District,
        Column::AgeYears,
        Column::AreaM2,
        Column::AreaPing,
        Column::PriceTotal,
        Column::PricePerPing,
        Column::UnitPriceM2,
        Column::Usage,
        Column::TotalFloors,
        Column::Floor,
        Column::RiskFactor,
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Column::TradeDate => "trade_date",
            Column::Year => "year",
            Column::Quarter => "quarter",
            Column::City => "city",
            Column::District => "district",
            Column::AgeYears => "age_years",
            Column::AreaM2 => "area_m2",
            Column::AreaPing => "area_ping",
            Column::PriceTotal => "price_total",
            Column::PricePerPing => "price_per_ping",
            Column::UnitPriceM2 => "unit_price_m2",
            Column::Usage => "usage",
            Column::TotalFloors => "total_floors",
            Column::Floor => "floor",
            Column::RiskFactor => "risk_factor",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// One row of the table: the fifteen canonical values plus what enrichment adds.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: [Scalar; COLUMN_COUNT],
    /// District text as it came out of the dump, before canonicalization.
    pub district_raw: Scalar,
    /// `trade_date` parsed to a calendar date.
    pub trade_day: Option<NaiveDate>,
    pub adj_price_per_ping: Option<f64>,
}

impl Default for Record {
    fn default() -> Self {
        Record::new(Default::default())
    }
}

impl Record {
    pub fn new(values: [Scalar; COLUMN_COUNT]) -> Self {
        let district_raw = values[Column::District.index()].clone();
        Self {
            values,
            district_raw,
            trade_day: None,
            adj_price_per_ping: None,
        }
    }

    #[inline(always)]
    pub fn get(&self, column: Column) -> &Scalar {
        &self.values[column.index()]
    }

    #[inline(always)]
    pub fn set(&mut self, column: Column, value: Scalar) {
        self.values[column.index()] = value;
    }

    pub fn values(&self) -> &[Scalar; COLUMN_COUNT] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, &Scalar)> {
        Column::ALL.into_iter().zip(self.values.iter())
    }

    pub fn text(&self, column: Column) -> Option<&str> {
        self.get(column).as_text()
    }

    pub fn number(&self, column: Column) -> Option<f64> {
        self.get(column).as_f64()
    }

    pub fn city(&self) -> Option<&str> {
        self.text(Column::City)
    }

    pub fn district(&self) -> Option<&str> {
        self.text(Column::District)
    }

    pub fn usage(&self) -> Option<&str> {
        self.text(Column::Usage)
    }

    pub fn price_per_ping(&self) -> Option<f64> {
        self.number(Column::PricePerPing)
    }

    pub fn risk_factor(&self) -> Option<f64> {
        self.number(Column::RiskFactor)
    }
}
