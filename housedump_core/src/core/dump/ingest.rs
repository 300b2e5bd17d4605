#[cfg(feature = "enable_parallelism")]
use std::sync::Arc;

#[cfg(feature = "enable_parallelism")]
use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use stopwatch::Stopwatch;
#[cfg(feature = "enable_parallelism")]
use tokio::{sync::Semaphore, task};

use crate::{
    PROGRESS_EVERY,
    configuration::IngestOptions,
    core::{canonical::canonicalize_all, features::derive_all, record::Record, table::Table},
    error::IngestError,
};

use super::{
    aligner::{Fit, SchemaAligner, SkipReason},
    coercer::coerce_tuple,
    extractor::{Statement, StatementExtractor},
    tokenizer::TupleTokenizer,
};

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// INSERT statements that were parsed.
    pub statements: usize,
    /// INSERT statements for another table, left alone.
    pub statements_ignored: usize,
    /// Statements whose parse task died. Their rows are in no other counter.
    pub statements_failed: usize,
    pub tuples: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub rows_padded: usize,
    pub rows_truncated: usize,
    /// Partial tuples dropped at the end of a statement.
    pub dangling_fragments: usize,
    pub skipped_empty: usize,
    pub skipped_no_columns: usize,
    pub skipped_unmappable: usize,
}

impl IngestReport {
    pub fn record_skip(&mut self, reason: SkipReason) {
        self.rows_skipped += 1;
        match reason {
            SkipReason::EmptyTuple => self.skipped_empty += 1,
            SkipReason::NoCanonicalColumns => self.skipped_no_columns += 1,
            SkipReason::Unmappable => self.skipped_unmappable += 1,
        }
    }

    pub fn skipped(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::EmptyTuple => self.skipped_empty,
            SkipReason::NoCanonicalColumns => self.skipped_no_columns,
            SkipReason::Unmappable => self.skipped_unmappable,
        }
    }

    /// Adds another report's counters to this one.
    pub fn absorb(&mut self, other: &IngestReport) {
        self.statements += other.statements;
        self.statements_ignored += other.statements_ignored;
        self.statements_failed += other.statements_failed;
        self.tuples += other.tuples;
        self.rows_loaded += other.rows_loaded;
        self.rows_skipped += other.rows_skipped;
        self.rows_padded += other.rows_padded;
        self.rows_truncated += other.rows_truncated;
        self.dangling_fragments += other.dangling_fragments;
        self.skipped_empty += other.skipped_empty;
        self.skipped_no_columns += other.skipped_no_columns;
        self.skipped_unmappable += other.skipped_unmappable;
    }
}

/// The enriched table together with what happened while building it.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub table: Table,
    pub report: IngestReport,
}

/// Rows recovered from a single statement, before canonicalization.
#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub ordinal: usize,
    pub records: Vec<Record>,
    pub report: IngestReport,
}

/// Tokenizes, coerces and aligns every tuple of one statement.
pub fn parse_statement(document: &str, statement: Statement) -> ParsedStatement {
    let ordinal = statement.ordinal;
    let explicit_columns = statement.explicit_columns;
    let body = statement.body(document);
    let aligner = SchemaAligner::new(statement.columns);

    let mut report = IngestReport {
        statements: 1,
        ..Default::default()
    };
    let mut records = Vec::new();
    let mut tokenizer = TupleTokenizer::new(body);

    for (index, raw) in tokenizer.by_ref().enumerate() {
        report.tuples += 1;
        let row = coerce_tuple(raw);
        let fit = aligner.fit(row.len());

        match aligner.align(row) {
            Ok(record) => {
                match fit {
                    Fit::Padded => report.rows_padded += 1,
                    Fit::Truncated => report.rows_truncated += 1,
                    Fit::Exact => {}
                }
                report.rows_loaded += 1;
                records.push(record);
            }
            Err(reason) => {
                warn!(
                    "Skipping tuple {} of statement {}: {} ({})",
                    index,
                    ordinal,
                    reason,
                    sample(raw)
                );
                report.record_skip(reason);
            }
        }
    }

    if tokenizer.dangling() {
        warn!("Statement {} ends inside an unterminated tuple, fragment dropped", ordinal);
        report.dangling_fragments += 1;
    }

    debug!(
        "Statement {} ({} {} columns): {} tuples, {} loaded, {} skipped",
        ordinal,
        aligner.columns().len(),
        if explicit_columns { "listed" } else { "default" },
        report.tuples,
        report.rows_loaded,
        report.rows_skipped
    );

    ParsedStatement {
        ordinal,
        records,
        report,
    }
}

fn sample(raw: &str) -> String {
    const SAMPLE_CHARS: usize = 60;
    let mut sample: String = raw.chars().take(SAMPLE_CHARS).collect();
    if raw.chars().nth(SAMPLE_CHARS).is_some() {
        sample.push_str("...");
    }
    sample
}

/// Turns a dump document into an enriched [`Table`].
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    options: IngestOptions,
}

impl Ingestor {
    pub fn new(options: IngestOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Parses every statement in document order. Bad rows are counted, never fatal.
    pub fn ingest(&self, document: &str) -> IngestOutcome {
        let stopwatch = Stopwatch::start_new();
        let (statements, mut report) = self.accepted_statements(document);
        let total = statements.len();

        info!("Ingesting {} INSERT statements", total);

        let mut records = Vec::new();
        for (done, statement) in statements.into_iter().enumerate() {
            let parsed = parse_statement(document, statement);
            collect(&mut records, &mut report, parsed, done + 1, total);
        }

        self.finish(records, report, stopwatch)
    }

    /// Like [`Ingestor::ingest`], but a document without a single INSERT statement is an error.
    pub fn ingest_document(&self, document: &str) -> Result<IngestOutcome, IngestError> {
        let outcome = self.ingest(document);
        if outcome.report.statements + outcome.report.statements_ignored == 0 {
            return Err(IngestError::MalformedDocument);
        }
        Ok(outcome)
    }

    /// Parses statements on the blocking pool, at most `workers` at a time.
    /// Rows come out in the same order as with [`Ingestor::ingest`].
    #[cfg(feature = "enable_parallelism")]
    pub async fn ingest_parallel(&self, document: Arc<str>) -> IngestOutcome {
        let stopwatch = Stopwatch::start_new();
        let (statements, mut report) = self.accepted_statements(&document);
        let total = statements.len();

        info!(
            "Ingesting {} INSERT statements with {} workers",
            total, self.options.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));

        let tasks = statements.into_iter().map(|statement| {
            let semaphore = Arc::clone(&semaphore);
            let document = Arc::clone(&document);
            async move {
                let _permit = semaphore.acquire_owned().await.ok();
                task::spawn_blocking(move || parse_statement(&document, statement)).await
            }
        });

        let mut records = Vec::new();
        for (done, result) in join_all(tasks).await.into_iter().enumerate() {
            match result {
                Ok(parsed) => collect(&mut records, &mut report, parsed, done + 1, total),
                Err(e) => record_failed_task(&mut report, &e),
            }
        }

        self.finish(records, report, stopwatch)
    }

    fn accepted_statements(&self, document: &str) -> (Vec<Statement>, IngestReport) {
        let mut report = IngestReport::default();
        let statements = StatementExtractor::new(document)
            .filter(|statement| {
                let accepted = self.options.accepts_table(&statement.table);
                if !accepted {
                    debug!(
                        "Ignoring statement {} for table {}",
                        statement.ordinal, statement.table
                    );
                    report.statements_ignored += 1;
                }
                accepted
            })
            .collect();
        (statements, report)
    }

    fn finish(
        &self,
        mut records: Vec<Record>,
        report: IngestReport,
        stopwatch: Stopwatch,
    ) -> IngestOutcome {
        canonicalize_all(&mut records);
        derive_all(&mut records);

        let table = Table::new(records, report.rows_skipped);

        if report.statements_failed > 0 {
            warn!(
                "{} INSERT statements failed to parse, their rows are missing",
                report.statements_failed
            );
        }

        match table.date_range() {
            Some((from, to)) => info!(
                "Loaded {} rows ({} skipped), trade dates {} to {}, in {}ms",
                report.rows_loaded,
                report.rows_skipped,
                from,
                to,
                stopwatch.elapsed_ms()
            ),
            None => info!(
                "Loaded {} rows ({} skipped), no dated rows, in {}ms",
                report.rows_loaded,
                report.rows_skipped,
                stopwatch.elapsed_ms()
            ),
        }

        IngestOutcome { table, report }
    }
}

fn collect(
    records: &mut Vec<Record>,
    report: &mut IngestReport,
    parsed: ParsedStatement,
    done: usize,
    total: usize,
) {
    report.absorb(&parsed.report);
    records.extend(parsed.records);

    if done % PROGRESS_EVERY == 0 || done == total {
        info!(
            "Processed {}/{} statements, {} rows so far",
            done, total, report.rows_loaded
        );
    }
}

#[cfg(feature = "enable_parallelism")]
fn record_failed_task(report: &mut IngestReport, e: &task::JoinError) {
    log::error!("Statement task failed: {}", e);
    report.statements_failed += 1;
}

/// Ingests a document with default options.
pub fn ingest(document: &str) -> IngestOutcome {
    Ingestor::default().ingest(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{dump::extractor::extract_statements, record::Column};

    #[test]
    fn test_parse_statement_counts() {
        let doc = "INSERT INTO houses (city, district, price_per_ping) VALUES \
                   ('新北市','板橋區',500000),(),('新北市'),('a','b',1,2),(NULL,NULL,NULL),('x',";
        let statement = extract_statements(doc).remove(0);
        let parsed = parse_statement(doc, statement);

        assert_eq!(parsed.report.tuples, 5);
        assert_eq!(parsed.report.rows_loaded, 3);
        assert_eq!(parsed.report.rows_padded, 1);
        assert_eq!(parsed.report.rows_truncated, 1);
        assert_eq!(parsed.report.skipped(SkipReason::EmptyTuple), 1);
        assert_eq!(parsed.report.skipped(SkipReason::Unmappable), 1);
        assert_eq!(parsed.report.dangling_fragments, 1);
        assert_eq!(parsed.records[0].price_per_ping(), Some(500000.0));
    }

    #[test]
    fn test_statement_without_canonical_columns() {
        let doc = "INSERT INTO houses (foo, bar) VALUES (1,2),(3,4);";
        let statement = extract_statements(doc).remove(0);
        let parsed = parse_statement(doc, statement);
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.report.skipped_no_columns, 2);
        assert_eq!(parsed.report.rows_skipped, 2);
    }

    #[test]
    fn test_table_filter_ignores_other_tables() {
        let doc = "INSERT INTO houses VALUES ('2020-01-01',2020,1,'新北市','板橋區',NULL,NULL,NULL,NULL,400000,NULL,'住家用',NULL,NULL,NULL);\n\
                   INSERT INTO shops VALUES ('2020-01-01',2020,1,'新北市','板橋區',NULL,NULL,NULL,NULL,900000,NULL,'住家用',NULL,NULL,NULL);";
        let ingestor = Ingestor::new(IngestOptions {
            table: Some("houses".to_string()),
            workers: 1,
        });
        let outcome = ingestor.ingest(doc);
        assert_eq!(outcome.report.statements, 1);
        assert_eq!(outcome.report.statements_ignored, 1);
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(
            outcome.table.records()[0].number(Column::PricePerPing),
            Some(400000.0)
        );
    }

    #[test]
    fn test_ingest_document_requires_statements() {
        let ingestor = Ingestor::default();
        assert!(matches!(
            ingestor.ingest_document("CREATE TABLE houses (id int);"),
            Err(IngestError::MalformedDocument)
        ));
        assert!(ingestor.ingest_document("INSERT INTO houses VALUES ();").is_ok());
    }

    #[test]
    fn test_report_absorb() {
        let mut total = IngestReport::default();
        let mut part = IngestReport::default();
        part.statements = 1;
        part.rows_loaded = 3;
        part.record_skip(SkipReason::Unmappable);
        total.absorb(&part);
        total.absorb(&part);
        assert_eq!(total.statements, 2);
        assert_eq!(total.rows_loaded, 6);
        assert_eq!(total.rows_skipped, 2);
        assert_eq!(total.skipped_unmappable, 2);
    }

    #[cfg(feature = "enable_parallelism")]
    #[tokio::test]
    async fn test_failed_statement_task_is_counted() {
        let joined = task::spawn_blocking(|| -> ParsedStatement { panic!("parser died") }).await;
        let mut report = IngestReport::default();
        if let Err(e) = joined {
            record_failed_task(&mut report, &e);
        }
        assert_eq!(report.statements_failed, 1);

        let mut total = IngestReport::default();
        total.absorb(&report);
        assert_eq!(total.statements_failed, 1);
    }
}
