// Statement Normalizer - Error Types
// File-level failures propagate; format mismatches are recoverable by the generic chain

use std::path::PathBuf;
use thiserror::Error;

use crate::transaction::BankFormat;

/// Errors raised by the normalization core.
///
/// Row-level problems never show up here: bad rows are skipped, bad amounts
/// become 0. Only whole-file conditions are reported.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The format's header signature never appeared in the file.
    #[error("no {0} header row found")]
    FormatMismatch(BankFormat),
}

impl NormalizeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NormalizeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the generic fallback chain may move on to the next format.
    ///
    /// I/O and encoding failures are not format problems and must fail fast.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, NormalizeError::FormatMismatch(_) | NormalizeError::Csv(_))
    }
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
