#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for FTTH mandate extraction.
//!
//! A page arrives as plain text plus zero or more [`Table`]s. The extractor
//! turns it into one [`ExtractionResult`] holding the [`MandateData`]
//! fields, the harvested [`CableRecord`]s, and the confidence signal. These
//! types are serialized as-is in the CLI output and the HTTP API.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of fiber slot columns (`SP1`..`SP4`) a mandate can carry.
pub const FIBER_SLOTS: usize = 4;

/// One extracted table: rows of optional cells.
///
/// Rows are not guaranteed to have the same length, so every column access
/// goes through [`Table::cell`], which bounds-checks per row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    /// Rows in top-to-bottom order.
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Creates a table from raw rows.
    #[must_use]
    pub const fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Builds a table from string rows, treating empty strings as absent
    /// cells. Mostly useful for fixtures.
    #[must_use]
    pub fn from_strs(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| {
                            if cell.is_empty() {
                                None
                            } else {
                                Some((*cell).to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        }
    }

    /// Returns the cell at `row`/`col`, or `None` when either index is out
    /// of bounds or the cell is absent.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(Option::as_deref)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Name of an extracted field.
///
/// Serialized in `snake_case` and used in `missing_fields`,
/// `missing_fibers`, and `enriched_fields`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldName {
    /// Work-order identifier (`Disp ID`).
    MandateNumber,
    /// PTO reference, shape `B.###.###.###.X`.
    SocketLabel,
    /// Joined cable identities.
    Cable,
    /// Fiber in splice slot 1.
    #[serde(rename = "fiber_1")]
    #[strum(serialize = "fiber_1")]
    Fiber1,
    /// Fiber in splice slot 2.
    #[serde(rename = "fiber_2")]
    #[strum(serialize = "fiber_2")]
    Fiber2,
    /// Fiber in splice slot 3.
    #[serde(rename = "fiber_3")]
    #[strum(serialize = "fiber_3")]
    Fiber3,
    /// Fiber in splice slot 4.
    #[serde(rename = "fiber_4")]
    #[strum(serialize = "fiber_4")]
    Fiber4,
    /// Contact phone, normalized to `+41…`.
    Phone,
    /// Contact email.
    Email,
    /// Client name following the address label.
    ClientName,
}

impl FieldName {
    /// Fields a secondary source may fill in, in merge order.
    pub const MERGEABLE: &[Self] = &[
        Self::MandateNumber,
        Self::SocketLabel,
        Self::Cable,
        Self::Fiber1,
        Self::Fiber2,
        Self::Fiber3,
        Self::Fiber4,
        Self::Phone,
        Self::Email,
        Self::ClientName,
    ];

    /// The fiber slot fields, slot 1 first.
    pub const FIBERS: [Self; FIBER_SLOTS] = [Self::Fiber1, Self::Fiber2, Self::Fiber3, Self::Fiber4];

    /// Returns the fiber field for a 1-based slot number.
    #[must_use]
    pub const fn fiber(slot: usize) -> Option<Self> {
        match slot {
            1 => Some(Self::Fiber1),
            2 => Some(Self::Fiber2),
            3 => Some(Self::Fiber3),
            4 => Some(Self::Fiber4),
            _ => None,
        }
    }

    /// Whether a differing secondary value for this field is kept as an
    /// alternative for human review.
    #[must_use]
    pub const fn is_identifying(self) -> bool {
        matches!(self, Self::MandateNumber | Self::SocketLabel)
    }
}

/// One harvested table row: a cable identity and its slot values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableRecord {
    /// Cable identity, whitespace-normalized.
    pub cable: Option<String>,
    /// Value under `SP1`.
    pub fiber_1: Option<String>,
    /// Value under `SP2`.
    pub fiber_2: Option<String>,
    /// Value under `SP3`.
    pub fiber_3: Option<String>,
    /// Value under `SP4`.
    pub fiber_4: Option<String>,
}

impl CableRecord {
    /// Returns the value for a 1-based fiber slot.
    #[must_use]
    pub fn fiber(&self, slot: usize) -> Option<&str> {
        match slot {
            1 => self.fiber_1.as_deref(),
            2 => self.fiber_2.as_deref(),
            3 => self.fiber_3.as_deref(),
            4 => self.fiber_4.as_deref(),
            _ => None,
        }
    }

    /// Sets the value for a 1-based fiber slot. Out-of-range slots are
    /// ignored.
    pub fn set_fiber(&mut self, slot: usize, value: Option<String>) {
        match slot {
            1 => self.fiber_1 = value,
            2 => self.fiber_2 = value,
            3 => self.fiber_3 = value,
            4 => self.fiber_4 = value,
            _ => {}
        }
    }

    /// Whether the record carries neither a cable nor any fiber value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cable.is_none() && (1..=FIBER_SLOTS).all(|slot| self.fiber(slot).is_none())
    }
}

/// The extracted field values of one mandate document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MandateData {
    /// Work-order identifier.
    pub mandate_number: Option<String>,
    /// PTO reference.
    pub socket_label: Option<String>,
    /// All cables joined with the rule set's separator.
    pub cable: Option<String>,
    /// Distinct cables in first-seen order.
    pub cables: Vec<String>,
    /// One entry per harvested table row.
    pub cables_by_record: Vec<CableRecord>,
    /// First non-null slot-1 value across records.
    pub fiber_1: Option<String>,
    /// First non-null slot-2 value across records.
    pub fiber_2: Option<String>,
    /// First non-null slot-3 value across records.
    pub fiber_3: Option<String>,
    /// First non-null slot-4 value across records.
    pub fiber_4: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Client name.
    pub client_name: Option<String>,
    /// Differing mandate number proposed by the secondary source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandate_number_alternative: Option<String>,
    /// Differing socket label proposed by the secondary source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_label_alternative: Option<String>,
}

impl MandateData {
    /// Returns the scalar value of `field`.
    #[must_use]
    pub fn get(&self, field: FieldName) -> Option<&str> {
        match field {
            FieldName::MandateNumber => self.mandate_number.as_deref(),
            FieldName::SocketLabel => self.socket_label.as_deref(),
            FieldName::Cable => self.cable.as_deref(),
            FieldName::Fiber1 => self.fiber_1.as_deref(),
            FieldName::Fiber2 => self.fiber_2.as_deref(),
            FieldName::Fiber3 => self.fiber_3.as_deref(),
            FieldName::Fiber4 => self.fiber_4.as_deref(),
            FieldName::Phone => self.phone.as_deref(),
            FieldName::Email => self.email.as_deref(),
            FieldName::ClientName => self.client_name.as_deref(),
        }
    }

    /// Replaces the scalar value of `field`.
    pub fn set(&mut self, field: FieldName, value: Option<String>) {
        let slot = match field {
            FieldName::MandateNumber => &mut self.mandate_number,
            FieldName::SocketLabel => &mut self.socket_label,
            FieldName::Cable => &mut self.cable,
            FieldName::Fiber1 => &mut self.fiber_1,
            FieldName::Fiber2 => &mut self.fiber_2,
            FieldName::Fiber3 => &mut self.fiber_3,
            FieldName::Fiber4 => &mut self.fiber_4,
            FieldName::Phone => &mut self.phone,
            FieldName::Email => &mut self.email,
            FieldName::ClientName => &mut self.client_name,
        };
        *slot = value;
    }

    /// Stores a secondary-source alternative for an identifying field.
    /// Returns `false` for fields that do not keep alternatives.
    pub fn set_alternative(&mut self, field: FieldName, value: String) -> bool {
        match field {
            FieldName::MandateNumber => self.mandate_number_alternative = Some(value),
            FieldName::SocketLabel => self.socket_label_alternative = Some(value),
            _ => return false,
        }
        true
    }
}

/// The per-document extraction result returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Name of the source file, when known.
    pub file_name: Option<String>,
    /// `true` iff every required field is present and no fatal error
    /// occurred.
    pub success: bool,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Whether a human should check this document.
    pub needs_review: bool,
    /// Required fields that were not found, in rule-set order.
    pub missing_fields: Vec<FieldName>,
    /// Fiber slots that were not found.
    pub missing_fibers: Vec<FieldName>,
    /// Fields filled in from the secondary source.
    pub enriched_fields: Vec<FieldName>,
    /// Extracted values.
    pub data: MandateData,
    /// Fatal error message, if the document could not be processed.
    pub error: Option<String>,
}

impl ExtractionResult {
    /// Builds the result for a document that could not be opened.
    ///
    /// No data is trusted from a failed document: every field is empty,
    /// confidence is `0.0`, and the document is flagged for review.
    #[must_use]
    pub fn failure(file_name: Option<String>, error: impl Into<String>) -> Self {
        Self {
            file_name,
            success: false,
            confidence: 0.0,
            needs_review: true,
            missing_fields: Vec::new(),
            missing_fibers: Vec::new(),
            enriched_fields: Vec::new(),
            data: MandateData::default(),
            error: Some(error.into()),
        }
    }

    /// Whether this result represents a fatal per-document error.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_serialize_snake_case() {
        assert_eq!(FieldName::MandateNumber.to_string(), "mandate_number");
        assert_eq!(FieldName::Fiber3.to_string(), "fiber_3");
        assert_eq!(
            serde_json::to_string(&FieldName::Fiber1).unwrap(),
            "\"fiber_1\""
        );
        assert_eq!("client_name".parse::<FieldName>().unwrap(), FieldName::ClientName);
        assert_eq!("fiber_4".parse::<FieldName>().unwrap(), FieldName::Fiber4);
    }

    #[test]
    fn table_cell_access_is_bounds_checked() {
        let table = Table::from_strs(&[&["a", "b", "c"], &["d"]]);
        assert_eq!(table.cell(0, 2), Some("c"));
        assert_eq!(table.cell(1, 2), None);
        assert_eq!(table.cell(5, 0), None);
    }

    #[test]
    fn table_deserializes_from_nested_arrays() {
        let table: Table = serde_json::from_str(r#"[["Câble:", null, "SP1"], ["X"]]"#).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), Some("Câble:"));
        assert_eq!(table.cell(0, 1), None);
    }

    #[test]
    fn cable_record_slots() {
        let mut record = CableRecord::default();
        assert!(record.is_empty());
        record.set_fiber(3, Some("7".to_string()));
        record.set_fiber(9, Some("ignored".to_string()));
        assert_eq!(record.fiber(3), Some("7"));
        assert!(!record.is_empty());
    }

    #[test]
    fn failure_result_trusts_nothing() {
        let result = ExtractionResult::failure(Some("a.pdf".to_string()), "corrupt");
        assert!(!result.success);
        assert!(result.needs_review);
        assert!(result.confidence.abs() < f64::EPSILON);
        assert!(result.is_failure());
        assert_eq!(result.data, MandateData::default());
    }

    #[test]
    fn alternatives_only_for_identifying_fields() {
        let mut data = MandateData::default();
        assert!(data.set_alternative(FieldName::MandateNumber, "1".to_string()));
        assert!(!data.set_alternative(FieldName::Email, "x@y.ch".to_string()));
        assert_eq!(data.mandate_number_alternative.as_deref(), Some("1"));
        assert!(FieldName::SocketLabel.is_identifying());
        assert!(!FieldName::Cable.is_identifying());
    }
}
