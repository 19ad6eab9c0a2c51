// Statement Normalizer - Statement Buffer
// One read per file; every pass works off the same rows and byte spans

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{NormalizeError, Result};

const BOM: char = '\u{feff}';

/// RawRow - one CSV record of the source file
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Position among the file's records (blank lines are not records)
    pub index: usize,
    pub cells: Vec<String>,
    /// Byte range of the record's text, line terminator excluded
    pub span: Range<usize>,
}

impl RawRow {
    /// Cell at `col`, or "" when the row is too short
    pub fn cell(&self, col: usize) -> &str {
        self.cells.get(col).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells blank
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }

    /// Cells concatenated without a separator
    pub fn joined(&self) -> String {
        self.cells.concat()
    }
}

/// StatementBuffer - immutable text of a statement plus its indexed rows
#[derive(Debug, Clone)]
pub struct StatementBuffer {
    path: PathBuf,
    text: String,
    rows: Vec<RawRow>,
}

impl StatementBuffer {
    /// Read and index a statement file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| NormalizeError::io(path, e))?;
        let text = String::from_utf8(bytes).map_err(|_| NormalizeError::Encoding {
            path: path.to_path_buf(),
        })?;
        Self::from_text(path, text)
    }

    /// Index already-decoded text. A leading byte-order mark is dropped.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let mut text = text.into();
        if text.starts_with(BOM) {
            text.drain(..BOM.len_utf8());
        }
        let rows = index_rows(&text)?;

        Ok(StatementBuffer {
            path: path.into(),
            text,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }
}

fn index_rows(text: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut starts = Vec::new();
    let mut cells = Vec::new();
    for result in reader.records() {
        let record = result?;
        let start = record.position().map(|p| p.byte() as usize).unwrap_or(0);
        starts.push(start);
        cells.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let rows = cells
        .into_iter()
        .enumerate()
        .map(|(index, cells)| {
            // reader positions can sit on skipped blank lines or a dangling '\n'
            let raw = text.get(starts[index]..).unwrap_or("");
            let start = starts[index] + raw.len() - raw.trim_start_matches(['\r', '\n']).len();
            let next = starts.get(index + 1).copied().unwrap_or(text.len()).max(start);
            let line = text.get(start..next).unwrap_or("");
            let end = start + line.trim_end_matches(['\r', '\n']).len();
            RawRow {
                index,
                cells,
                span: start..end,
            }
        })
        .collect();

    Ok(rows)
}
