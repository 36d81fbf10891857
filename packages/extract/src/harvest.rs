//! Table row harvesting.
//!
//! Walks the rows below a located header and turns each row into a
//! [`CableRecord`]. Harvesting ends at the first row whose cable cell is
//! empty or carries a stop token (the header of the next section).

use fiber_mandate_extract_models::{CableRecord, Table};

use crate::header::{HeaderLocation, HeaderLocator};
use crate::patterns::collapse_whitespace;
use crate::rules::TableRules;

/// Records and cable identities harvested from a page's tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableHarvest {
    /// One record per harvested row, in row order.
    pub records: Vec<CableRecord>,
    /// Cable identities in row order, not yet deduplicated.
    pub cables: Vec<String>,
    /// Whether any table had a usable header.
    pub header_found: bool,
}

impl TableHarvest {
    /// Whether the harvest produced anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.cables.is_empty()
    }
}

/// Harvests rows from tables using one rule set.
#[derive(Debug, Clone)]
pub struct RowHarvester<'a> {
    rules: &'a TableRules,
    stop_tokens: Vec<String>,
}

impl<'a> RowHarvester<'a> {
    /// Creates a harvester for `rules`.
    #[must_use]
    pub fn new(rules: &'a TableRules) -> Self {
        Self {
            rules,
            stop_tokens: rules
                .stop_tokens
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// A stop cell is exactly a stop token, ignoring case and surrounding
    /// whitespace.
    fn is_stop_cell(&self, value: &str) -> bool {
        let lowered = value.trim().to_lowercase();
        self.stop_tokens.iter().any(|t| lowered == *t)
    }

    /// Accepts a cable cell: not purely numeric and at least the minimum
    /// length once whitespace is collapsed.
    fn accept_cable(&self, raw: &str) -> Option<String> {
        let cable = collapse_whitespace(raw);
        if cable.is_empty() || cable.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        (cable.chars().count() >= self.rules.min_cable_len).then_some(cable)
    }

    /// Harvests the rows strictly after the header of `table`.
    #[must_use]
    pub fn harvest(&self, table: &Table, location: &HeaderLocation) -> Vec<CableRecord> {
        let Some(header_row) = location.header_row else {
            return Vec::new();
        };

        let mut records = Vec::new();

        for (row_index, row) in table.rows.iter().enumerate().skip(header_row + 1) {
            if row.is_empty() {
                continue;
            }

            let mut record = CableRecord::default();

            if let Some(col) = location.cable_column {
                let raw = table.cell(row_index, col).map(str::trim).unwrap_or_default();
                if raw.is_empty() || self.is_stop_cell(raw) {
                    log::trace!("Row {row_index}: end of data section ({raw:?})");
                    break;
                }
                record.cable = self.accept_cable(raw);
            }

            for (&slot, &col) in &location.slot_columns {
                if let Some(raw) = table.cell(row_index, col) {
                    record.set_fiber(slot, self.rules.fiber_acceptance.accept(raw));
                }
            }

            if record.is_empty() {
                continue;
            }
            records.push(record);
        }

        records
    }

    /// Harvests the first table of `tables` that yields any record.
    #[must_use]
    pub fn harvest_tables(&self, locator: &HeaderLocator, tables: &[Table]) -> TableHarvest {
        let mut harvest = TableHarvest::default();

        for (index, table) in tables.iter().enumerate() {
            let location = locator.locate(table);
            if !location.is_usable() {
                continue;
            }
            harvest.header_found = true;

            let records = self.harvest(table, &location);
            if records.is_empty() {
                log::debug!("Table {index}: header found but no data rows");
                continue;
            }

            log::debug!("Table {index}: harvested {} record(s)", records.len());
            harvest.cables = records.iter().filter_map(|r| r.cable.clone()).collect();
            harvest.records = records;
            break;
        }

        harvest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    fn harvest_with(rules: &RuleSet, table: &Table) -> Vec<CableRecord> {
        let locator = HeaderLocator::new(&rules.table);
        let harvester = RowHarvester::new(&rules.table);
        harvester.harvest(table, &locator.locate(table))
    }

    fn record(cable: Option<&str>, fibers: [Option<&str>; 4]) -> CableRecord {
        CableRecord {
            cable: cable.map(str::to_owned),
            fiber_1: fibers[0].map(str::to_owned),
            fiber_2: fibers[1].map(str::to_owned),
            fiber_3: fibers[2].map(str::to_owned),
            fiber_4: fibers[3].map(str::to_owned),
        }
    }

    #[test]
    fn harvests_fully_populated_row() {
        let table = Table::from_strs(&[
            &["Câble", "SP1", "SP2", "SP3", "SP4"],
            &["FTTH  32FSP\n0FK 29", "1", "2", "3", "4"],
        ]);
        let records = harvest_with(&RuleSet::strict(), &table);
        assert_eq!(
            records,
            vec![record(
                Some("FTTH 32FSP 0FK 29"),
                [Some("1"), Some("2"), Some("3"), Some("4")]
            )]
        );
    }

    #[test]
    fn stops_at_stop_token_and_empty_cable_cell() {
        let table = Table::from_strs(&[
            &["Câble", "SP1"],
            &["CABLE-A", "1"],
            &["Client", "5"],
            &["CABLE-B", "2"],
        ]);
        let records = harvest_with(&RuleSet::strict(), &table);
        assert_eq!(records.len(), 1);

        let table = Table::from_strs(&[
            &["Câble", "SP1"],
            &["CABLE-A", "1"],
            &["", "7"],
            &["CABLE-B", "2"],
        ]);
        assert_eq!(harvest_with(&RuleSet::strict(), &table).len(), 1);
    }

    #[test]
    fn stop_token_must_fill_the_cell() {
        let table = Table::from_strs(&[
            &["Câble", "SP1"],
            &["CABLE-A", "1"],
            &["Client FTTH 12", "2"],
            &["  INTERLOCUTEUR ", "3"],
            &["CABLE-C", "4"],
        ]);
        let records = harvest_with(&RuleSet::strict(), &table);
        assert_eq!(
            records,
            vec![
                record(Some("CABLE-A"), [Some("1"), None, None, None]),
                record(Some("Client FTTH 12"), [Some("2"), None, None, None]),
            ]
        );
    }

    #[test]
    fn short_row_ends_section_when_cable_cell_missing() {
        let table = Table {
            rows: vec![
                vec![Some("Câble".to_owned()), Some("SP1".to_owned())],
                vec![Some("CABLE-A".to_owned()), Some("1".to_owned())],
                vec![],
                vec![Some("CABLE-B".to_owned())],
                vec![None, Some("3".to_owned())],
                vec![Some("CABLE-C".to_owned())],
            ],
        };
        let records = harvest_with(&RuleSet::strict(), &table);
        assert_eq!(
            records,
            vec![
                record(Some("CABLE-A"), [Some("1"), None, None, None]),
                record(Some("CABLE-B"), [None, None, None, None]),
            ]
        );
    }

    #[test]
    fn numeric_and_short_cables_are_rejected() {
        let table = Table::from_strs(&[
            &["Câble", "SP1"],
            &["12", "4"],
            &["AB", "5"],
            &["ABC", "x"],
        ]);
        let records = harvest_with(&RuleSet::strict(), &table);
        assert_eq!(
            records,
            vec![
                record(None, [Some("4"), None, None, None]),
                record(None, [Some("5"), None, None, None]),
                record(Some("ABC"), [None, None, None, None]),
            ]
        );

        let loose = harvest_with(&RuleSet::loose(), &table);
        assert_eq!(loose[1].cable.as_deref(), Some("AB"));
        assert_eq!(loose[2].fiber_1.as_deref(), Some("x"));
    }

    #[test]
    fn rows_without_values_are_skipped_not_emitted() {
        let table = Table::from_strs(&[&["", "SP1", "SP2"], &["", "a-b", ""], &["", "", "9"]]);
        let records = harvest_with(&RuleSet::strict(), &table);
        assert_eq!(records, vec![record(None, [None, Some("9"), None, None])]);
    }

    #[test]
    fn repeated_cables_keep_separate_records() {
        let table = Table::from_strs(&[
            &["Câble", "SP1", "SP2"],
            &["CABLE-A", "1", ""],
            &["CABLE-A", "", "2"],
        ]);
        let records = harvest_with(&RuleSet::strict(), &table);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn first_table_with_records_wins() {
        let rules = RuleSet::strict();
        let locator = HeaderLocator::new(&rules.table);
        let harvester = RowHarvester::new(&rules.table);
        let tables = vec![
            Table::from_strs(&[&["Nom", "Valeur"]]),
            Table::from_strs(&[&["Câble", "SP1"]]),
            Table::from_strs(&[&["Câble", "SP1"], &["CABLE-A", "1"]]),
            Table::from_strs(&[&["Câble", "SP1"], &["CABLE-B", "2"]]),
        ];
        let harvest = harvester.harvest_tables(&locator, &tables);
        assert!(harvest.header_found);
        assert_eq!(harvest.cables, vec!["CABLE-A".to_owned()]);
        assert_eq!(harvest.records.len(), 1);
    }

    #[test]
    fn no_usable_header_yields_empty_harvest() {
        let rules = RuleSet::strict();
        let locator = HeaderLocator::new(&rules.table);
        let harvester = RowHarvester::new(&rules.table);
        let harvest =
            harvester.harvest_tables(&locator, &[Table::from_strs(&[&["a", "b"], &["c", "d"]])]);
        assert!(!harvest.header_found);
        assert!(harvest.is_empty());
    }
}
