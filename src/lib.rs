// Statement Normalizer - Core Library
// Exposes all modules for use in the CLI, the upload server, and tests

pub mod config;
pub mod error;
pub mod extract;
pub mod normalizer;
pub mod parser;
pub mod sections;
pub mod statement;
pub mod transaction;

// Re-export commonly used types
pub use config::NormalizerConfig;
pub use error::{NormalizeError, Result};
pub use extract::{
    amount_clean, currency_detect, date_normalize, has_credit_suffix, location_extract,
    scope_from_keywords,
};
pub use normalizer::{
    detect, output_file_name, parse, standardize, write_transactions, Normalizer, OUTPUT_HEADER,
};
pub use parser::{
    detect_format, format_from_content, format_from_file_name, get_parser, AmountLayout,
    FormatSpec, StatementParser,
};
pub use sections::{
    build_section_map, find_current_section, SectionCursor, SectionMap, SectionMarker,
    SectionScanner, UNKNOWN_CARDHOLDER,
};
pub use statement::{RawRow, StatementBuffer};
pub use transaction::{BankFormat, Currency, NormalizationReport, NormalizedTransaction, Scope};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
