/// Character-level scanner shared by the tuple and field splitters
pub mod scan;

/// Tuple Tokenizer
pub mod tokenizer;

/// Value Coercer
pub mod coercer;

/// Statement Extractor
pub mod extractor;

/// Schema Aligner
pub mod aligner;

/// Pipeline driver
pub mod ingest;

/// Reading dump files
pub mod loader;
