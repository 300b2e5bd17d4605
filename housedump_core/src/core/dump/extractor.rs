use std::ops::Range;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::record::Column;

use super::{coercer::split_fields, scan::find_terminator};

// INSERT INTO [`db`.]`table` [(col, ...)] VALUES
static INSERT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)\bINSERT\s+INTO\s+((?:`[^`]+`|[\w$]+)(?:\s*\.\s*(?:`[^`]+`|[\w$]+))?)\s*(?:\(([^()]*)\))?\s*VALUES",
    )
    .expect("insert header pattern must compile")
});

// Header spellings seen in house transaction exports.
static COLUMN_ALIASES: Lazy<AHashMap<&'static str, Column>> = Lazy::new(|| {
    use Column::*;
    [
        ("date", TradeDate),
        ("tradedate", TradeDate),
        ("trade_day", TradeDate),
        ("yr", Year),
        ("yyyy", Year),
        ("q", Quarter),
        ("quart", Quarter),
        ("cty", City),
        ("cityname", City),
        ("city_name", City),
        ("dist", District),
        ("districtname", District),
        ("district_name", District),
        ("town", District),
        ("region", District),
        ("area_name", District),
        ("age", AgeYears),
        ("ageyear", AgeYears),
        ("age_year", AgeYears),
        ("aream2", AreaM2),
        ("m2", AreaM2),
        ("areaping", AreaPing),
        ("ping", AreaPing),
        ("totalprice", PriceTotal),
        ("total_price", PriceTotal),
        ("pp_ping", PricePerPing),
        ("priceperping", PricePerPing),
        ("unitprice", UnitPriceM2),
        ("unitpricem2", UnitPriceM2),
        ("unit_price", UnitPriceM2),
        ("use", Usage),
        ("purpose", Usage),
        ("floors", TotalFloors),
        ("totalfloor", TotalFloors),
        ("totalfloors", TotalFloors),
        ("floorno", Floor),
        ("floor_num", Floor),
        ("risk", RiskFactor),
        ("riskfactor", RiskFactor),
    ]
    .into_iter()
    .collect()
});

/// A column name from an explicit column list, after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub name: String,
    pub canonical: Option<Column>,
}

impl ResolvedColumn {
    pub fn from_raw(raw: &str) -> Self {
        let name = normalize_column_name(raw);
        let canonical = resolve_column(&name);
        Self { name, canonical }
    }

    pub fn canonical(column: Column) -> Self {
        Self {
            name: column.name().to_string(),
            canonical: Some(column),
        }
    }
}

/// Lowercases a header and removes quoting, whitespace and separator noise.
pub fn normalize_column_name(raw: &str) -> String {
    let stripped: String = raw
        .trim()
        .trim_matches(|c| c == '`' || c == '"')
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '-' { '_' } else { c.to_ascii_lowercase() })
        .collect();

    let mut name = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        if ch == '_' && name.ends_with('_') {
            continue;
        }
        name.push(ch);
    }
    name
}

/// Canonical column for an already normalized header, through the alias table.
pub fn resolve_column(normalized: &str) -> Option<Column> {
    Column::from_name(normalized).or_else(|| COLUMN_ALIASES.get(normalized).copied())
}

/// One `INSERT ... VALUES ...;` statement located in a dump.
#[derive(Debug, Clone)]
pub struct Statement {
    /// Position of the statement in the document, starting at 0.
    pub ordinal: usize,
    pub table: String,
    pub columns: Vec<ResolvedColumn>,
    pub explicit_columns: bool,
    /// Byte range of the tuple blob, from after `VALUES` up to and including the `;`.
    pub body: Range<usize>,
}

impl Statement {
    pub fn body<'a>(&self, document: &'a str) -> &'a str {
        &document[self.body.clone()]
    }
}

/// Iterates over the INSERT statements of a dump, in document order.
pub struct StatementExtractor<'a> {
    document: &'a str,
    position: usize,
    ordinal: usize,
}

impl<'a> StatementExtractor<'a> {
    pub fn new(document: &'a str) -> Self {
        Self {
            document,
            position: 0,
            ordinal: 0,
        }
    }

    // A body normally runs to its `;`. When the text is broken (an unclosed quote
    // swallowing the rest of the file) it is cut at the next INSERT header instead.
    fn body_end(&self, body_start: usize) -> usize {
        let rest = &self.document[body_start..];
        if let Some(pos) = find_terminator(rest) {
            return body_start + pos + 1;
        }
        INSERT_HEADER
            .find(rest)
            .map(|m| body_start + m.start())
            .unwrap_or(self.document.len())
    }
}

impl<'a> Iterator for StatementExtractor<'a> {
    type Item = Statement;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.document.len() {
            return None;
        }

        let captures = INSERT_HEADER.captures(&self.document[self.position..])?;
        let header = captures.get(0)?;
        let body_start = self.position + header.end();
        let body_end = self.body_end(body_start);

        let table = captures
            .get(1)
            .map(|m| table_name(m.as_str()))
            .unwrap_or_default();

        let (columns, explicit_columns) = match captures.get(2) {
            Some(list) => (
                split_fields(list.as_str())
                    .into_iter()
                    .map(ResolvedColumn::from_raw)
                    .collect(),
                true,
            ),
            None => (default_columns(), false),
        };

        let statement = Statement {
            ordinal: self.ordinal,
            table,
            columns,
            explicit_columns,
            body: body_start..body_end,
        };

        self.ordinal += 1;
        self.position = body_end.max(body_start);

        Some(statement)
    }
}

/// The fifteen canonical columns in storage order.
pub fn default_columns() -> Vec<ResolvedColumn> {
    Column::ALL.into_iter().map(ResolvedColumn::canonical).collect()
}

/// Collects every statement of a document.
pub fn extract_statements(document: &str) -> Vec<Statement> {
    StatementExtractor::new(document).collect()
}

// `db`.`houses` -> houses
fn table_name(qualified: &str) -> String {
    qualified
        .rsplit('.')
        .next()
        .unwrap_or(qualified)
        .trim()
        .trim_matches('`')
        .to_string()
}
