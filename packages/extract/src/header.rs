//! Table header location.
//!
//! Scans a table top-to-bottom, left-to-right for the fiber slot markers
//! (`SP1`..`SP4`) and the cable column marker, and reports where the data
//! section starts. The first row with any marker wins.

use std::collections::BTreeMap;

use fiber_mandate_extract_models::Table;

use crate::rules::{TableRules, compact_upper};

/// Where the header of a table was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLocation {
    /// Index of the header row, or `None` if the table has no usable
    /// header.
    pub header_row: Option<usize>,
    /// 1-based fiber slot to column index.
    pub slot_columns: BTreeMap<usize, usize>,
    /// Column holding cable identities.
    pub cable_column: Option<usize>,
}

impl HeaderLocation {
    /// Whether the table has a header with at least one mapped column.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.header_row.is_some() && (self.cable_column.is_some() || !self.slot_columns.is_empty())
    }
}

/// Header markers, normalized once per rule set.
#[derive(Debug, Clone)]
pub struct HeaderLocator {
    slot_tokens: Vec<String>,
    cable_markers: Vec<String>,
    cable_exclusions: Vec<String>,
}

impl HeaderLocator {
    /// Normalizes the marker tokens of `rules`.
    #[must_use]
    pub fn new(rules: &TableRules) -> Self {
        let normalize = |tokens: &[String]| -> Vec<String> {
            tokens
                .iter()
                .map(|t| compact_upper(t))
                .filter(|t| !t.is_empty())
                .collect()
        };
        Self {
            slot_tokens: rules.slot_tokens.iter().map(|t| compact_upper(t)).collect(),
            cable_markers: normalize(&rules.cable_markers),
            cable_exclusions: normalize(&rules.cable_exclusions),
        }
    }

    /// 1-based slot whose marker `cell` carries, if any.
    ///
    /// Longer tokens are tried first so that `SP10`-style markers would not
    /// be mistaken for `SP1`.
    fn slot_of(&self, cell: &str) -> Option<usize> {
        let mut candidates: Vec<(usize, &String)> = self
            .slot_tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| !token.is_empty() && cell.contains(token.as_str()))
            .collect();
        candidates.sort_by_key(|(_, token)| std::cmp::Reverse(token.len()));
        candidates.first().map(|(i, _)| i + 1)
    }

    fn is_cable_marker(&self, cell: &str) -> bool {
        self.cable_markers.iter().any(|m| cell.contains(m.as_str()))
            && !self.cable_exclusions.iter().any(|x| cell.contains(x.as_str()))
    }

    /// Locates the header of `table`.
    ///
    /// The header is the first row carrying any slot marker or a cable
    /// marker; rows below it are never considered, even when a data cell
    /// happens to contain a marker. Any configured slot token qualifies a
    /// row, not only the first slot's.
    #[must_use]
    pub fn locate(&self, table: &Table) -> HeaderLocation {
        for (row_index, row) in table.rows.iter().enumerate() {
            let mut slot_columns: BTreeMap<usize, usize> = BTreeMap::new();
            let mut cable_column: Option<usize> = None;

            for (col, cell) in row.iter().enumerate() {
                let Some(cell) = cell.as_deref() else {
                    continue;
                };
                let normalized = compact_upper(cell);
                if normalized.is_empty() {
                    continue;
                }
                if let Some(slot) = self.slot_of(&normalized) {
                    slot_columns.entry(slot).or_insert(col);
                } else if cable_column.is_none() && self.is_cable_marker(&normalized) {
                    cable_column = Some(col);
                }
            }

            if !slot_columns.is_empty() || cable_column.is_some() {
                log::debug!(
                    "Header row {row_index}: slots {slot_columns:?}, cable column {cable_column:?}"
                );
                return HeaderLocation {
                    header_row: Some(row_index),
                    slot_columns,
                    cable_column,
                };
            }
        }

        HeaderLocation::default()
    }
}
