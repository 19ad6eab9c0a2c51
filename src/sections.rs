// Statement Normalizer - Section Preprocessor
// Tracks which cardholder and which scope (domestic/international) each row belongs to

use regex::Regex;
use std::ops::Range;

use crate::config::NormalizerConfig;
use crate::error::{NormalizeError, Result};
use crate::statement::StatementBuffer;
use crate::transaction::Scope;

/// CardName used before any section marker
pub const UNKNOWN_CARDHOLDER: &str = "Unknown";

// ============================================================================
// CORE TYPES
// ============================================================================

/// SectionMarker - from `row` on, rows belong to `name` with `scope`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMarker {
    pub row: usize,
    pub name: String,
    pub scope: Scope,
}

/// SectionMap - markers ordered by strictly increasing row index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    markers: Vec<SectionMarker>,
}

impl SectionMap {
    pub fn markers(&self) -> &[SectionMarker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Section in effect at `row` (random access)
    pub fn lookup(&self, row: usize) -> (&str, Scope) {
        let after = self.markers.partition_point(|m| m.row <= row);
        match after.checked_sub(1).map(|i| &self.markers[i]) {
            Some(marker) => (marker.name.as_str(), marker.scope),
            None => (UNKNOWN_CARDHOLDER, Scope::Domestic),
        }
    }

    /// Forward-only reader for callers that visit rows in ascending order
    pub fn cursor(&self) -> SectionCursor<'_> {
        SectionCursor {
            markers: &self.markers,
            next: 0,
            last_row: None,
        }
    }
}

/// Most recent marker at or before `row_index`; ("Unknown", Domestic) before the first one.
pub fn find_current_section(row_index: usize, map: &SectionMap) -> (String, Scope) {
    let (name, scope) = map.lookup(row_index);
    (name.to_string(), scope)
}

/// SectionCursor - amortized O(1) lookups over ascending row indices
#[derive(Debug, Clone)]
pub struct SectionCursor<'a> {
    markers: &'a [SectionMarker],
    next: usize,
    last_row: Option<usize>,
}

impl<'a> SectionCursor<'a> {
    /// Section in effect at `row`. Rows must not go backwards.
    pub fn at(&mut self, row: usize) -> (&'a str, Scope) {
        debug_assert!(
            self.last_row.map_or(true, |last| last <= row),
            "section cursor moved backwards"
        );
        self.last_row = Some(row);

        while self.next < self.markers.len() && self.markers[self.next].row <= row {
            self.next += 1;
        }

        let markers: &'a [SectionMarker] = self.markers;
        match self.next.checked_sub(1).map(|i| &markers[i]) {
            Some(marker) => (marker.name.as_str(), marker.scope),
            None => (UNKNOWN_CARDHOLDER, Scope::Domestic),
        }
    }
}

// ============================================================================
// SCANNER
// ============================================================================

/// SectionScanner - name-row test and the single preprocessing pass
pub struct SectionScanner<'c> {
    config: &'c NormalizerConfig,
    name_pattern: Option<Regex>,
}

impl<'c> SectionScanner<'c> {
    pub fn new(config: &'c NormalizerConfig) -> Result<Self> {
        let name_pattern = if config.known_names.is_empty() {
            None
        } else {
            let alternatives: Vec<String> =
                config.known_names.iter().map(|n| regex::escape(n)).collect();
            let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
            Some(Regex::new(&pattern).map_err(|e| NormalizeError::Config(e.to_string()))?)
        };

        Ok(SectionScanner {
            config,
            name_pattern,
        })
    }

    /// Name of a row that only announces a cardholder.
    ///
    /// One of the first three cells must be a known name; every other cell
    /// must be blank or a section label.
    pub fn is_name_row(&self, cells: &[String]) -> Option<&'c str> {
        let config = self.config;
        cells.iter().take(3).enumerate().find_map(|(i, cell)| {
            let name = config.known_name(cell.trim())?;
            let others_blank = cells.iter().enumerate().filter(|(j, _)| *j != i).all(|(_, other)| {
                let other = other.trim();
                other.is_empty() || config.is_section_label(other)
            });
            others_blank.then_some(name)
        })
    }

    /// Byte offsets of every whole-word occurrence of a known name, ascending.
    pub fn name_offsets<'t>(&self, text: &'t str) -> Vec<(usize, &'t str)> {
        match &self.name_pattern {
            Some(re) => re.find_iter(text).map(|m| (m.start(), m.as_str())).collect(),
            None => Vec::new(),
        }
    }

    /// Build the section map of a buffered statement in one pass over its rows.
    pub fn build(&self, buffer: &StatementBuffer) -> SectionMap {
        let offsets = self.name_offsets(buffer.text());

        let mut markers = Vec::new();
        let mut name = UNKNOWN_CARDHOLDER.to_string();
        let mut scope = Scope::Domestic;

        for row in buffer.rows() {
            if let Some(found) = self.is_name_row(&row.cells) {
                name = found.to_string();
                markers.push(SectionMarker {
                    row: row.index,
                    name: name.clone(),
                    scope,
                });
                continue;
            }

            let mut changed = false;
            if let Some(found) = first_name_within(&offsets, &row.span) {
                name = found.to_string();
                changed = true;
            }

            let text = row.joined().to_lowercase();
            if text.contains("international") {
                scope = Scope::International;
                changed = true;
            } else if text.contains("domestic") {
                scope = Scope::Domestic;
                changed = true;
            }

            if changed {
                markers.push(SectionMarker {
                    row: row.index,
                    name: name.clone(),
                    scope,
                });
            }
        }

        SectionMap { markers }
    }
}

fn first_name_within<'t>(offsets: &[(usize, &'t str)], span: &Range<usize>) -> Option<&'t str> {
    let first = offsets.partition_point(|(pos, _)| *pos < span.start);
    offsets
        .get(first)
        .filter(|(pos, _)| *pos < span.end)
        .map(|(_, name)| *name)
}

/// Build the section map for a buffered statement.
pub fn build_section_map(buffer: &StatementBuffer, config: &NormalizerConfig) -> Result<SectionMap> {
    Ok(SectionScanner::new(config)?.build(buffer))
}
