// Statement Normalizer - Core Types
// Canonical output schema shared by every bank layout

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// BANK FORMATS
// ============================================================================

/// BankFormat - which statement layout a file follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankFormat {
    Hdfc,
    Icici,
    Axis,
    Idfc,
    Generic,
}

impl BankFormat {
    /// Formats with a concrete layout, in fallback order.
    pub const KNOWN: [BankFormat; 4] = [
        BankFormat::Hdfc,
        BankFormat::Icici,
        BankFormat::Axis,
        BankFormat::Idfc,
    ];

    /// Lowercase code, as reported by `detect`
    pub fn code(&self) -> &'static str {
        match self {
            BankFormat::Hdfc => "hdfc",
            BankFormat::Icici => "icici",
            BankFormat::Axis => "axis",
            BankFormat::Idfc => "idfc",
            BankFormat::Generic => "generic",
        }
    }

    /// Capitalized label used when naming output files
    pub fn label(&self) -> &'static str {
        match self {
            BankFormat::Hdfc => "Hdfc",
            BankFormat::Icici => "Icici",
            BankFormat::Axis => "Axis",
            BankFormat::Idfc => "Idfc",
            BankFormat::Generic => "Generic",
        }
    }

    /// Bank name as it is printed inside statement exports
    pub(crate) fn marker(&self) -> Option<&'static str> {
        match self {
            BankFormat::Hdfc => Some("HDFC"),
            BankFormat::Icici => Some("ICICI"),
            BankFormat::Axis => Some("AXIS"),
            BankFormat::Idfc => Some("IDFC"),
            BankFormat::Generic => None,
        }
    }
}

impl fmt::Display for BankFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// TRANSACTION ATTRIBUTES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Eur,
    Usd,
    Pound,
}

impl Currency {
    /// Code as written in statements and in the output CSV
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Pound => "POUND",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Domestic or international classification of a statement section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    Domestic,
    International,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Domestic => f.write_str("Domestic"),
            Scope::International => f.write_str("International"),
        }
    }
}

// ============================================================================
// NORMALIZED OUTPUT
// ============================================================================

/// One row of the canonical output CSV.
///
/// Field order here is the column order of the output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// DD-MM-YYYY
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Transaction Description")]
    pub description: String,

    #[serde(rename = "Debit")]
    pub debit: f64,

    #[serde(rename = "Credit")]
    pub credit: f64,

    #[serde(rename = "Currency")]
    pub currency: Currency,

    #[serde(rename = "CardName")]
    pub card_name: String,

    #[serde(rename = "Transaction")]
    pub scope: Scope,

    #[serde(rename = "Location")]
    pub location: String,
}

impl NormalizedTransaction {
    pub fn is_credit(&self) -> bool {
        self.credit > 0.0
    }
}

/// Summary of one `standardize` run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub format: BankFormat,
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_codes_and_labels() {
        assert_eq!(BankFormat::Hdfc.code(), "hdfc");
        assert_eq!(BankFormat::Generic.to_string(), "generic");
        assert_eq!(BankFormat::Icici.label(), "Icici");
        assert_eq!(BankFormat::Generic.marker(), None);
    }

    #[test]
    fn test_report_serializes_format_code() {
        let report = NormalizationReport {
            format: BankFormat::Axis,
            input: PathBuf::from("in.csv"),
            output: PathBuf::from("AxisCase1.csv"),
            rows: 4,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["format"], "axis");
        assert_eq!(json["rows"], 4);
    }

    #[test]
    fn test_currency_and_scope_display() {
        assert_eq!(Currency::Pound.to_string(), "POUND");
        assert_eq!(Scope::default(), Scope::Domestic);
        assert_eq!(Scope::International.to_string(), "International");
    }
}
