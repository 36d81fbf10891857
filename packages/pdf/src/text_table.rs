//! Table detection in column-aligned PDF text.
//!
//! [`pdf_extract`] yields plain text per page, so a mandate's cable/fiber
//! grid arrives as lines whose cells are separated by runs of spaces. Each
//! block of consecutive non-blank lines that contains at least one
//! multi-cell line becomes a [`Table`]. Cells are split on two or more
//! spaces (or tabs) and assigned to the column whose start position is
//! closest, using the widest line of the block as the column template.

use std::sync::LazyLock;

use fiber_mandate_extract_models::Table;
use regex::Regex;

static CELL_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+|[ \t]{2,}").expect("valid regex"));

/// A cell and the character column it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PositionedCell {
    start: usize,
    text: String,
}

/// Splits one line into cells, keeping each cell's character offset.
fn split_cells(line: &str) -> Vec<PositionedCell> {
    let mut cells = Vec::new();
    let mut push = |from: usize, to: usize| {
        let segment = &line[from..to];
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return;
        }
        let byte_start = from + (segment.len() - segment.trim_start().len());
        cells.push(PositionedCell {
            start: line[..byte_start].chars().count(),
            text: trimmed.to_owned(),
        });
    };

    let mut last = 0;
    for sep in CELL_SEPARATOR_RE.find_iter(line) {
        push(last, sep.start());
        last = sep.end();
    }
    push(last, line.len());

    cells
}

/// Lays out one block of lines as a table, or `None` when no line in the
/// block has more than one cell.
fn block_to_table(lines: &[&str]) -> Option<Table> {
    let rows: Vec<Vec<PositionedCell>> = lines.iter().map(|line| split_cells(line)).collect();

    let template = rows
        .iter()
        .fold(None::<&Vec<PositionedCell>>, |widest, row| match widest {
            Some(w) if w.len() >= row.len() => Some(w),
            _ => Some(row),
        })?;
    if template.len() < 2 {
        return None;
    }
    let anchors: Vec<usize> = template.iter().map(|cell| cell.start).collect();

    let table_rows = rows
        .into_iter()
        .map(|row| {
            let mut cells: Vec<Option<String>> = vec![None; anchors.len()];
            for cell in row {
                let column = anchors
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, anchor)| anchor.abs_diff(cell.start))
                    .map_or(0, |(i, _)| i);
                match cells[column].as_mut() {
                    Some(existing) => {
                        existing.push(' ');
                        existing.push_str(&cell.text);
                    }
                    None => cells[column] = Some(cell.text),
                }
            }
            cells
        })
        .collect();

    Some(Table::new(table_rows))
}

/// Derives tables from the column-aligned blocks of a page's text.
#[must_use]
pub fn tables_from_text(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if let Some(table) = block_to_table(&block) {
                tables.push(table);
            }
            block.clear();
        } else {
            block.push(line);
        }
    }

    log::trace!("Derived {} table(s) from page text", tables.len());

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_runs_of_spaces_only() {
        let cells = split_cells("FTTH 32FSP 0FK 29   12\t15");
        let texts: Vec<&str> = cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["FTTH 32FSP 0FK 29", "12", "15"]);
        assert_eq!(cells[1].start, 20);
    }

    #[test]
    fn positions_count_characters_not_bytes() {
        let cells = split_cells("Câble:  SP1");
        assert_eq!(cells[1].start, 8);
    }

    #[test]
    fn aligned_block_becomes_table() {
        let text = "Disp ID: 24875848\n\n\
                    Câble:              SP1   SP2   SP3   SP4\n\
                    FTTH 32FSP 0FK 29   12    15\n\
                    Client\n";
        let tables = tables_from_text(text);
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, 0), Some("Câble:"));
        assert_eq!(table.cell(0, 4), Some("SP4"));
        assert_eq!(table.cell(1, 0), Some("FTTH 32FSP 0FK 29"));
        assert_eq!(table.cell(1, 1), Some("12"));
        assert_eq!(table.cell(1, 2), Some("15"));
        assert_eq!(table.cell(1, 3), None);
        assert_eq!(table.cell(2, 0), Some("Client"));
    }

    #[test]
    fn single_column_blocks_are_not_tables() {
        assert!(tables_from_text("Adresse: Jean Dupont\nRue de la Gare 15\n").is_empty());
        assert!(tables_from_text("").is_empty());
    }

    #[test]
    fn blank_lines_separate_tables() {
        let text = "A   B\n1   2\n\nC   D\n3   4";
        let tables = tables_from_text(text);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].cell(1, 1), Some("4"));
    }
}
