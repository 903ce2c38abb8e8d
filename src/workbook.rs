//! Local xlsx copy of a shop's final table.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::error::ShopError;
use crate::models::{Cell, Column, Table};

/// Longest string a spreadsheet cell accepts.
const MAX_CELL_CHARS: usize = 32_767;

/// Writes `table` with every column (side-channel ones included) to `path`.
/// NaN and missing values are left blank.
pub fn write_table(table: &Table, sheet_name: &str, path: &Path) -> Result<(), ShopError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header = Format::new().set_bold();
    let columns = Column::all();
    for (col, column) in (0u16..).zip(&columns) {
        worksheet.write_string_with_format(0, col, column.name(), &header)?;
    }

    for (row, record) in (1u32..).zip(table.iter()) {
        for (col, column) in (0u16..).zip(&columns) {
            match record.value(*column) {
                Cell::Number(n) if n.is_finite() => {
                    worksheet.write_number(row, col, n)?;
                }
                Cell::Text(text) => {
                    worksheet.write_string(row, col, truncate(&text))?;
                }
                Cell::Number(_) | Cell::Empty => {}
            }
        }
    }

    workbook.save(path)?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    #[test]
    fn writes_a_zip_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop").join("20240101_test_LIMIT_0_0_0.xlsx");

        let mut row = Record::default();
        row.title = Some("Azul".to_string());
        row.orig_price = 24.99;
        row.raw = Some("x".repeat(MAX_CELL_CHARS + 10));
        let table = Table::new(vec![row, Record::error_row("boom", None)]);

        write_table(&table, "testshop", &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_CELL_CHARS + 1);
        assert_eq!(truncate(&long).chars().count(), MAX_CELL_CHARS);
        assert_eq!(truncate("short"), "short");
    }
}
