// Statement Normalizer - Parser Framework
// Format detection plus one tabular-scan engine driven by per-bank descriptors

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, trace};

use crate::config::NormalizerConfig;
use crate::error::{NormalizeError, Result};
use crate::extract::{
    amount_clean, currency_detect, date_normalize, has_credit_suffix, location_extract,
    scope_from_keywords,
};
use crate::sections::{SectionCursor, SectionMap, SectionScanner};
use crate::statement::{RawRow, StatementBuffer};
use crate::transaction::{BankFormat, Currency, NormalizedTransaction};

// ============================================================================
// FORMAT DESCRIPTORS
// ============================================================================

/// How a layout encodes the money columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountLayout {
    /// One amount column; a trailing `cr` marks a credit
    Single { amount: usize },
    /// Separate debit and credit columns; `cr` is never consulted
    Split { debit: usize, credit: usize },
}

/// FormatSpec - everything that differs between bank layouts
#[derive(Clone, Copy)]
pub struct FormatSpec {
    pub format: BankFormat,
    header: fn(&RawRow) -> bool,
    /// Data rows with fewer cells are skipped
    pub min_columns: usize,
    pub date_col: usize,
    pub description_col: usize,
    /// Columns that must be non-blank for a row to be read
    pub required: &'static [usize],
    /// Used when the description cell is blank
    pub description_fallback: Option<&'static str>,
    /// Skip data rows whose first cell repeats the "Date" header
    pub skip_repeated_header: bool,
    pub amount: AmountLayout,
}

impl FormatSpec {
    pub fn is_header(&self, row: &RawRow) -> bool {
        (self.header)(row)
    }
}

impl fmt::Debug for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatSpec")
            .field("format", &self.format)
            .field("min_columns", &self.min_columns)
            .field("date_col", &self.date_col)
            .field("description_col", &self.description_col)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

fn hdfc_header(row: &RawRow) -> bool {
    row.len() >= 3 && row.cell(0).contains("Date")
}

fn icici_header(row: &RawRow) -> bool {
    row.len() >= 4 && row.cell(0).contains("Date") && row.joined().contains("Transaction")
}

fn axis_header(row: &RawRow) -> bool {
    row.len() >= 4
        && row.cell(0).contains("Date")
        && row.cell(1).contains("Debit")
        && row.cell(2).contains("Credit")
}

fn idfc_header(row: &RawRow) -> bool {
    row.len() >= 3
        && row.cell(0).contains("Transaction Details")
        && row.cell(1).contains("Date")
        && row.cell(2).contains("Amount")
}

pub static HDFC: FormatSpec = FormatSpec {
    format: BankFormat::Hdfc,
    header: hdfc_header,
    min_columns: 3,
    date_col: 0,
    description_col: 1,
    required: &[0, 1],
    description_fallback: None,
    skip_repeated_header: true,
    amount: AmountLayout::Single { amount: 2 },
};

pub static ICICI: FormatSpec = FormatSpec {
    format: BankFormat::Icici,
    header: icici_header,
    min_columns: 3,
    date_col: 0,
    description_col: 1,
    required: &[0],
    description_fallback: Some("Unknown Transaction"),
    skip_repeated_header: false,
    amount: AmountLayout::Split { debit: 2, credit: 3 },
};

pub static AXIS: FormatSpec = FormatSpec {
    format: BankFormat::Axis,
    header: axis_header,
    min_columns: 4,
    date_col: 0,
    description_col: 3,
    required: &[0, 3],
    description_fallback: None,
    skip_repeated_header: false,
    amount: AmountLayout::Split { debit: 1, credit: 2 },
};

pub static IDFC: FormatSpec = FormatSpec {
    format: BankFormat::Idfc,
    header: idfc_header,
    min_columns: 3,
    date_col: 1,
    description_col: 0,
    required: &[0, 1],
    description_fallback: None,
    skip_repeated_header: false,
    amount: AmountLayout::Single { amount: 2 },
};

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect the bank format of a statement file.
///
/// # Strategy:
/// 1. Filename contains a bank name (any case) → that bank, without opening the file
/// 2. Otherwise sniff the first `detection_sample_bytes` of content for the
///    uppercase bank name
/// 3. Fall back to `Generic`
///
/// # Examples:
/// ```
/// use std::path::Path;
/// use statement_normalizer::{detect_format, BankFormat, NormalizerConfig};
///
/// let format = detect_format(Path::new("foo_HDFC_statement.csv"), &NormalizerConfig::default());
/// assert_eq!(format.unwrap(), BankFormat::Hdfc);
/// ```
pub fn detect_format(file_path: &Path, config: &NormalizerConfig) -> Result<BankFormat> {
    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if let Some(format) = format_from_file_name(filename) {
        return Ok(format);
    }

    let mut sample = Vec::with_capacity(config.detection_sample_bytes);
    File::open(file_path)
        .and_then(|file| {
            file.take(config.detection_sample_bytes as u64)
                .read_to_end(&mut sample)
        })
        .map_err(|e| NormalizeError::io(file_path, e))?;

    Ok(format_from_content(&String::from_utf8_lossy(&sample)).unwrap_or(BankFormat::Generic))
}

/// Bank named in a file name, case-insensitively
pub fn format_from_file_name(filename: &str) -> Option<BankFormat> {
    let filename_lower = filename.to_lowercase();
    BankFormat::KNOWN
        .into_iter()
        .find(|format| filename_lower.contains(format.code()))
}

/// Bank named inside a content sample, as printed in exports (uppercase)
pub fn format_from_content(sample: &str) -> Option<BankFormat> {
    BankFormat::KNOWN
        .into_iter()
        .find(|format| format.marker().is_some_and(|marker| sample.contains(marker)))
}

/// Get the parser for a concrete layout; `Generic` has none of its own.
pub fn get_parser(format: BankFormat) -> Option<StatementParser> {
    let spec = match format {
        BankFormat::Hdfc => &HDFC,
        BankFormat::Icici => &ICICI,
        BankFormat::Axis => &AXIS,
        BankFormat::Idfc => &IDFC,
        BankFormat::Generic => return None,
    };
    Some(StatementParser { spec })
}

// ============================================================================
// TABULAR SCAN ENGINE
// ============================================================================

/// StatementParser - reads the rows of one layout into normalized transactions
#[derive(Debug, Clone, Copy)]
pub struct StatementParser {
    spec: &'static FormatSpec,
}

impl StatementParser {
    pub fn format(&self) -> BankFormat {
        self.spec.format
    }

    pub fn spec(&self) -> &'static FormatSpec {
        self.spec
    }

    /// Index (within `rows`) of the first row matching the header signature
    pub fn find_header(&self, rows: &[RawRow]) -> Option<usize> {
        rows.iter().position(|row| self.spec.is_header(row))
    }

    /// Parse every data row after the header.
    ///
    /// Returns `FormatMismatch` when the header never appears. Rows that are
    /// not transactions (blank, short, name rows, section labels, bad dates)
    /// are skipped silently.
    pub fn parse(
        &self,
        buffer: &StatementBuffer,
        sections: &SectionMap,
        scanner: &SectionScanner<'_>,
    ) -> Result<Vec<NormalizedTransaction>> {
        let rows = buffer.rows();
        let header = self
            .find_header(rows)
            .ok_or(NormalizeError::FormatMismatch(self.spec.format))?;
        debug!(
            "{} header at row {} of {}",
            self.spec.format,
            rows[header].index,
            buffer.path().display()
        );

        let mut cursor = sections.cursor();
        let mut transactions = Vec::new();
        for row in &rows[header + 1..] {
            if !self.is_data_row(row, scanner) {
                trace!("row {}: not a transaction row", row.index);
                continue;
            }
            match self.extract(row, &mut cursor) {
                Some(tx) => transactions.push(tx),
                None => trace!("row {}: dropped, unparseable date", row.index),
            }
        }

        Ok(transactions)
    }

    fn is_data_row(&self, row: &RawRow, scanner: &SectionScanner<'_>) -> bool {
        let spec = self.spec;
        if row.len() < spec.min_columns || row.cell(0).trim().is_empty() {
            return false;
        }
        if spec.skip_repeated_header && row.cell(0).contains("Date") {
            return false;
        }
        if scanner.is_name_row(&row.cells).is_some()
            || row.cells.iter().any(|cell| cell.contains("Transactions"))
        {
            return false;
        }
        spec.required.iter().all(|col| !row.cell(*col).trim().is_empty())
    }

    fn extract(&self, row: &RawRow, cursor: &mut SectionCursor<'_>) -> Option<NormalizedTransaction> {
        let spec = self.spec;

        let description = match row.cell(spec.description_col).trim() {
            "" => spec.description_fallback.unwrap_or(""),
            text => text,
        };

        let (currency, debit, credit) = match spec.amount {
            AmountLayout::Single { amount } => single_amount(description, row.cell(amount).trim()),
            AmountLayout::Split { debit, credit } => {
                split_amounts(description, row.cell(debit).trim(), row.cell(credit).trim())
            }
        };

        let (card_name, scope) = cursor.at(row.index);
        let keyword_scope = scope_from_keywords(description, currency);
        if keyword_scope != scope {
            // the section scope is what gets emitted
            debug!(
                "row {}: section scope {} but description suggests {}",
                row.index, scope, keyword_scope
            );
        }

        let date = date_normalize(row.cell(spec.date_col));
        if date.is_empty() {
            return None;
        }

        Some(NormalizedTransaction {
            date,
            description: description.to_string(),
            debit,
            credit,
            currency,
            card_name: card_name.to_string(),
            scope,
            location: location_extract(description),
        })
    }
}

/// Currency is detected first and its code removed before the `cr` check.
fn single_amount(description: &str, amount_text: &str) -> (Currency, f64, f64) {
    let currency = currency_detect(description, amount_text);
    let amount_text = if currency == Currency::Inr {
        amount_text.to_string()
    } else {
        amount_text.replace(currency.code(), "").trim().to_string()
    };

    let amount = amount_clean(&amount_text);
    if has_credit_suffix(&amount_text) {
        (currency, 0.0, amount)
    } else {
        (currency, amount, 0.0)
    }
}

/// Both columns filled: net onto the larger side; equal amounts stay a full debit.
fn split_amounts(description: &str, debit_text: &str, credit_text: &str) -> (Currency, f64, f64) {
    let currency = currency_detect(description, &format!("{debit_text}{credit_text}"));
    let debit = if debit_text.is_empty() { 0.0 } else { amount_clean(debit_text) };
    let credit = if credit_text.is_empty() { 0.0 } else { amount_clean(credit_text) };

    if debit > 0.0 && credit > 0.0 {
        let net = debit - credit;
        if net > 0.0 {
            (currency, net, 0.0)
        } else if net < 0.0 {
            (currency, 0.0, -net)
        } else {
            (currency, debit, 0.0)
        }
    } else {
        (currency, debit, credit)
    }
}
