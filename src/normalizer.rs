// Statement Normalizer - Orchestrator
// detect → buffer → section map → parser (or generic chain) → canonical CSV

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::NormalizerConfig;
use crate::error::{NormalizeError, Result};
use crate::parser::{detect_format, format_from_content, format_from_file_name, get_parser};
use crate::sections::{SectionMap, SectionScanner};
use crate::statement::StatementBuffer;
use crate::transaction::{BankFormat, NormalizationReport, NormalizedTransaction};

/// Column header of every standardized file
pub const OUTPUT_HEADER: [&str; 8] = [
    "Date",
    "Transaction Description",
    "Debit",
    "Credit",
    "Currency",
    "CardName",
    "Transaction",
    "Location",
];

/// Normalizer - runs the pipeline with one configuration
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Normalizer { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Detect the format of a file on disk (filename first, then content).
    pub fn detect(&self, path: &Path) -> Result<BankFormat> {
        detect_format(path, &self.config)
    }

    /// Parse a statement file into normalized transactions.
    pub fn parse(&self, path: &Path) -> Result<Vec<NormalizedTransaction>> {
        let buffer = StatementBuffer::load(path)?;
        let format = self.detect_buffered(&buffer);
        self.parse_buffer(&buffer, format)
    }

    /// Parse an already-buffered statement as `format`.
    ///
    /// A named format whose header never appears yields no rows. `Generic`
    /// runs the fallback chain.
    pub fn parse_buffer(
        &self,
        buffer: &StatementBuffer,
        format: BankFormat,
    ) -> Result<Vec<NormalizedTransaction>> {
        let scanner = SectionScanner::new(&self.config)?;
        let sections = scanner.build(buffer);
        debug!(
            "{}: {} rows, {} section markers, format {}",
            buffer.path().display(),
            buffer.rows().len(),
            sections.len(),
            format
        );

        let Some(parser) = get_parser(format) else {
            return self.parse_generic(buffer, &sections, &scanner);
        };

        match parser.parse(buffer, &sections, &scanner) {
            Ok(transactions) => Ok(transactions),
            Err(NormalizeError::FormatMismatch(format)) => {
                warn!(
                    "{}: detected as {} but no {} header row found",
                    buffer.path().display(),
                    format,
                    format
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Try each known layout in order; the first whose header is found wins.
    fn parse_generic(
        &self,
        buffer: &StatementBuffer,
        sections: &SectionMap,
        scanner: &SectionScanner<'_>,
    ) -> Result<Vec<NormalizedTransaction>> {
        for parser in BankFormat::KNOWN.into_iter().filter_map(get_parser) {
            match parser.parse(buffer, sections, scanner) {
                Ok(transactions) => {
                    debug!("{}: read as {}", buffer.path().display(), parser.format());
                    return Ok(transactions);
                }
                Err(e) if e.is_format_mismatch() => {
                    debug!("{}: {}, trying next layout", buffer.path().display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        warn!("{}: no known layout matched", buffer.path().display());
        Ok(Vec::new())
    }

    /// Normalize `input_path` into a canonical CSV at `output_path`; returns the row count.
    pub fn standardize(&self, input_path: &Path, output_path: &Path) -> Result<usize> {
        Ok(self.standardize_report(input_path, output_path)?.rows)
    }

    pub fn standardize_report(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<NormalizationReport> {
        let buffer = StatementBuffer::load(input_path)?;
        let format = self.detect_buffered(&buffer);
        let transactions = self.parse_buffer(&buffer, format)?;

        let file = File::create(output_path).map_err(|e| NormalizeError::io(output_path, e))?;
        let rows = write_transactions(file, &transactions).map_err(|e| match e {
            NormalizeError::Csv(csv_err) if csv_err.is_io_error() => NormalizeError::io(
                output_path,
                std::io::Error::new(std::io::ErrorKind::Other, csv_err.to_string()),
            ),
            other => other,
        })?;
        info!(
            "standardized {} ({}) → {}: {} rows",
            input_path.display(),
            format,
            output_path.display(),
            rows
        );

        Ok(NormalizationReport {
            format,
            input: input_path.to_path_buf(),
            output: output_path.to_path_buf(),
            rows,
        })
    }

    /// Same decision as `detect`, made from the buffered text instead of a second read.
    fn detect_buffered(&self, buffer: &StatementBuffer) -> BankFormat {
        let filename = buffer
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        if let Some(format) = format_from_file_name(filename) {
            return format;
        }

        let text = buffer.text();
        let mut end = self.config.detection_sample_bytes.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format_from_content(&text[..end]).unwrap_or(BankFormat::Generic)
    }
}

/// Write transactions as canonical CSV (header always present).
pub fn write_transactions<W: Write>(writer: W, transactions: &[NormalizedTransaction]) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(OUTPUT_HEADER)?;
    for tx in transactions {
        wtr.serialize(tx)?;
    }
    wtr.flush().map_err(|e| NormalizeError::Csv(e.into()))?;

    Ok(transactions.len())
}

/// Output name for a standardized file: `<Bank><Case N | StatementNNNN>.csv`.
///
/// ```
/// use statement_normalizer::{output_file_name, BankFormat};
/// assert_eq!(output_file_name("Case3_upload.csv", BankFormat::Icici, 0), "IciciCase3.csv");
/// assert_eq!(output_file_name("jan.csv", BankFormat::Hdfc, 1_700_001_234), "HdfcStatement1234.csv");
/// ```
pub fn output_file_name(input_file_name: &str, format: BankFormat, timestamp: i64) -> String {
    let stem = Path::new(input_file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let component = case_label(stem)
        .unwrap_or_else(|| format!("Statement{}", timestamp.rem_euclid(10_000)));

    format!("{}{}.csv", format.label(), component)
}

fn case_label(stem: &str) -> Option<String> {
    stem.match_indices("Case").find_map(|(i, _)| {
        let digits: String = stem[i + 4..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        (!digits.is_empty()).then(|| format!("Case{digits}"))
    })
}

// ============================================================================
// Default-configuration entry points
// ============================================================================

/// Detect the bank format of a file with the default configuration.
pub fn detect(path: &Path) -> Result<BankFormat> {
    Normalizer::default().detect(path)
}

/// Parse a statement with the default configuration.
pub fn parse(path: &Path) -> Result<Vec<NormalizedTransaction>> {
    Normalizer::default().parse(path)
}

/// Standardize a statement with the default configuration; returns the row count.
pub fn standardize(input_path: &Path, output_path: &Path) -> Result<usize> {
    Normalizer::default().standardize(input_path, output_path)
}
